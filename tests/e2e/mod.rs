use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use py_license_inspect::cli::Options;
use py_license_inspect::license::{enumerate_dist_info, LicenseSource};
use py_license_inspect::output::{render_packages, render_summary, OrderBy, OutputFormat, OutputOptions};
use py_license_inspect::policy::{
    FilterCriteria, PackageOutcome, PackagePipeline, PolicySet, ViolationKind,
};

fn write_dist(site_packages: &Path, name: &str, version: &str, metadata: &str) {
    let dist_path = site_packages.join(format!("{}-{}.dist-info", name.replace('-', "_"), version));
    fs::create_dir_all(&dist_path).unwrap();
    fs::write(dist_path.join("METADATA"), metadata).unwrap();
}

fn fake_environment() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let site = temp_dir.path();

    write_dist(
        site,
        "requests",
        "2.31.0",
        "Name: requests\n\
         Version: 2.31.0\n\
         Summary: Python HTTP for Humans.\n\
         Home-page: https://requests.readthedocs.io\n\
         Author: Kenneth Reitz\n\
         License: Apache 2.0\n\
         Classifier: License :: OSI Approved :: Apache Software License\n",
    );
    write_dist(
        site,
        "attrs",
        "23.2.0",
        "Name: attrs\n\
         Version: 23.2.0\n\
         Summary: Classes Without Boilerplate\n\
         License: UNKNOWN\n\
         License-Expression: MIT\n\
         Classifier: License :: OSI Approved :: MIT License\n",
    );
    write_dist(
        site,
        "pip",
        "24.0",
        "Name: pip\n\
         Version: 24.0\n\
         License: MIT\n\
         Classifier: License :: OSI Approved :: MIT License\n",
    );

    temp_dir
}

fn default_output_options() -> OutputOptions {
    OutputOptions {
        source: LicenseSource::Mixed,
        format: OutputFormat::Plain,
        order: OrderBy::Name,
        summary: false,
        with_authors: false,
        with_urls: false,
        with_description: false,
        with_license_file: false,
        no_license_path: false,
        with_notice_file: false,
        no_version: false,
    }
}

fn run_pipeline(site: &Path, criteria: &FilterCriteria, policy: PolicySet) -> Vec<PackageOutcome> {
    let dists = enumerate_dist_info(site).unwrap();
    PackagePipeline::new(dists, LicenseSource::Mixed, criteria, policy, None).collect()
}

#[test]
fn test_plain_table_lists_installed_packages() {
    let env = fake_environment();
    let outcomes = run_pipeline(env.path(), &FilterCriteria::default(), PolicySet::default());

    let records: Vec<_> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            PackageOutcome::Pass(record) => Some(*record),
            PackageOutcome::Violation(..) => None,
        })
        .collect();

    let output = render_packages(&records, &default_output_options());
    assert!(output.contains("requests"));
    assert!(output.contains("Apache Software License"));
    assert!(output.contains("attrs"));
    assert!(output.contains("MIT License"));
    // system package filtered by default
    assert!(!output.contains("| pip "));
}

#[test]
fn test_allow_only_halts_on_unlisted_license() {
    let env = fake_environment();

    // fixed approved list that does not contain "MIT License"
    let allow: BTreeSet<String> = [
        "Bsd License",
        "Apache Software License",
        "Mozilla Public License 2.0 (MPL 2.0)",
        "Python Software Foundation License",
        "Public Domain",
        "GNU General Public License (GPL)",
        "GNU Library or Lesser General Public License (LGPL)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let policy = PolicySet {
        allow_only: Some(allow),
        ..Default::default()
    };
    let outcomes = run_pipeline(env.path(), &FilterCriteria::default(), policy);

    let violation_index = outcomes
        .iter()
        .position(|o| matches!(o, PackageOutcome::Violation(..)))
        .expect("expected a violation");

    // the violation is the last thing the pipeline produced
    assert_eq!(violation_index, outcomes.len() - 1);
    match &outcomes[violation_index] {
        PackageOutcome::Violation(record, violation) => {
            assert_eq!(record.name, "attrs");
            assert_eq!(violation.kind, ViolationKind::NotAllowed);
            assert!(violation.message().contains("MIT License"));
            assert!(violation.message().contains("attrs:23.2.0"));
        }
        PackageOutcome::Pass(_) => unreachable!(),
    }
}

#[test]
fn test_fail_on_is_case_insensitive() {
    let env = fake_environment();

    let policy = PolicySet {
        fail_on: Some(BTreeSet::from(["mit license".to_string()])),
        ..Default::default()
    };
    let outcomes = run_pipeline(env.path(), &FilterCriteria::default(), policy);

    let violation = outcomes
        .iter()
        .find_map(|o| match o {
            PackageOutcome::Violation(_, violation) => Some(violation),
            PackageOutcome::Pass(_) => None,
        })
        .expect("expected a violation");

    assert_eq!(violation.kind, ViolationKind::FailOn);
    assert_eq!(
        violation.message(),
        "fail-on license MIT License was found for package attrs:23.2.0",
    );
}

#[test]
fn test_partial_match_fail_on() {
    let env = fake_environment();

    let policy = PolicySet {
        fail_on: Some(BTreeSet::from(["MIT".to_string()])),
        partial_match: true,
        ..Default::default()
    };
    let outcomes = run_pipeline(env.path(), &FilterCriteria::default(), policy);

    assert!(outcomes
        .iter()
        .any(|o| matches!(o, PackageOutcome::Violation(_, v) if v.kind == ViolationKind::FailOn)));
}

#[test]
fn test_ignore_and_only_filters() {
    let env = fake_environment();

    let criteria = FilterCriteria {
        ignore_packages: vec!["Requests".to_string()],
        ..Default::default()
    };
    let outcomes = run_pipeline(env.path(), &criteria, PolicySet::default());
    let names: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            PackageOutcome::Pass(record) => Some(record.name.as_str()),
            PackageOutcome::Violation(..) => None,
        })
        .collect();
    assert_eq!(names, vec!["attrs"]);

    let criteria = FilterCriteria {
        only_packages: vec!["requests:2.31.0".to_string()],
        ..Default::default()
    };
    let outcomes = run_pipeline(env.path(), &criteria, PolicySet::default());
    let names: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            PackageOutcome::Pass(record) => Some(record.name.as_str()),
            PackageOutcome::Violation(..) => None,
        })
        .collect();
    assert_eq!(names, vec!["requests"]);
}

#[test]
fn test_summary_counts_per_license() {
    let env = fake_environment();
    let criteria = FilterCriteria { with_system: true, ..Default::default() };
    let outcomes = run_pipeline(env.path(), &criteria, PolicySet::default());

    let records: Vec<_> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            PackageOutcome::Pass(record) => Some(*record),
            PackageOutcome::Violation(..) => None,
        })
        .collect();

    let mut opts = default_output_options();
    opts.summary = true;
    let output = render_summary(&records, &opts);

    // attrs and pip both resolve to "MIT License"
    assert!(output.contains("| 2"));
    assert!(output.contains("MIT License"));
    assert!(output.contains("| 1"));
    assert!(output.contains("Apache Software License"));
}

#[test]
fn test_resolved_options_drive_the_renderer() {
    use clap::Parser;
    use py_license_inspect::cli::Cli;
    use py_license_inspect::config::Config;

    let cli = Cli::try_parse_from([
        "py-license-inspect",
        "--from=classifier",
        "--format=json",
        "--with-urls",
    ])
    .unwrap();
    let options = Options::resolve(cli, Config::default()).unwrap();

    let env = fake_environment();
    let outcomes = run_pipeline(env.path(), &options.criteria, options.policy.clone());
    let records: Vec<_> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            PackageOutcome::Pass(record) => Some(*record),
            PackageOutcome::Violation(..) => None,
        })
        .collect();

    let output = render_packages(&records, &options.output_options());
    assert!(output.contains("\"URL\": \"https://requests.readthedocs.io\""));
    assert!(output.contains("\"License\": \"Apache Software License\""));
}
