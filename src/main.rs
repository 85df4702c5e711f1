use anyhow::Result;
use clap::Parser;

use py_license_inspect::cli::{Cli, Options};
use py_license_inspect::config::load_config;
use py_license_inspect::license::{enumerate_dist_info, find_site_packages_path};
use py_license_inspect::output::{create_warn_string, render_packages, render_summary, save_output};
use py_license_inspect::policy::{PackageOutcome, PackagePipeline};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // pyproject.toml supplies defaults, flags override them
    let config = load_config()?;
    let options = Options::resolve(cli, config)?;

    let site_packages = find_site_packages_path(options.path.clone())?;
    let dists = enumerate_dist_info(&site_packages)?;

    let pipeline = PackagePipeline::new(
        dists,
        options.source,
        &options.criteria,
        options.policy.clone(),
        options.code_page,
    );

    let mut records = Vec::new();
    for outcome in pipeline {
        match outcome {
            PackageOutcome::Pass(record) => records.push(*record),
            PackageOutcome::Violation(_, violation) => {
                // first offender stops the run, nothing rendered
                eprintln!("{}", violation.message());
                std::process::exit(1);
            }
        }
    }

    let output_options = options.output_options();
    let output = if options.summary {
        render_summary(&records, &output_options)
    } else {
        render_packages(&records, &output_options)
    };

    match &options.output_file {
        Some(path) => save_output(path, &output)?,
        None => {
            println!("{}", output);
            let warnings = create_warn_string(&output_options);
            if !warnings.is_empty() {
                eprintln!("{}", warnings);
            }
        }
    }

    Ok(())
}
