use anyhow::{bail, Result};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::Config;
use crate::license::{CodePage, LicenseSource};
use crate::output::{OrderBy, OutputFormat, OutputOptions};
use crate::policy::{FilterCriteria, PolicySet};

#[derive(Debug, Parser)]
#[command(name = "py-license-inspect")]
#[command(about = "Dump the software license list of Python packages installed in an environment")]
#[command(version)]
pub struct Cli {
    /// Path to site-packages directory or virtual environment
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Where to find license information: "meta", "classifier", "mixed", "all", "expression"
    #[arg(long = "from", value_name = "SOURCE")]
    pub from: Option<String>,

    /// Order by column: "name", "license", "author", "url", "count"
    #[arg(short, long, value_name = "COL")]
    pub order: Option<String>,

    /// Dump as set format style: "plain", "markdown", "json", "csv"
    #[arg(short, long, value_name = "STYLE")]
    pub format: Option<String>,

    /// Dump summary of each license
    #[arg(long)]
    pub summary: bool,

    /// Save license list to file
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Ignore package name (or name:version) in dumped list
    #[arg(short, long = "ignore-packages", num_args = 1.., value_name = "PKG")]
    pub ignore_packages: Vec<String>,

    /// Only include the given packages, by name or name:version
    #[arg(short, long = "packages", num_args = 1.., value_name = "PKG")]
    pub packages: Vec<String>,

    /// Dump with system packages
    #[arg(short = 's', long)]
    pub with_system: bool,

    /// Dump with package authors
    #[arg(short = 'a', long)]
    pub with_authors: bool,

    /// Dump with package urls
    #[arg(short = 'u', long)]
    pub with_urls: bool,

    /// Dump with short package description
    #[arg(short = 'd', long)]
    pub with_description: bool,

    /// Dump with location of license file and contents, most useful with JSON output
    #[arg(short = 'l', long)]
    pub with_license_file: bool,

    /// When specified together with option -l, suppress location of license file output
    #[arg(long)]
    pub no_license_path: bool,

    /// When specified together with option -l, dump with location of notice file and contents
    #[arg(long)]
    pub with_notice_file: bool,

    /// Dump without the Version column
    #[arg(long)]
    pub no_version: bool,

    /// Filter input according to code page
    #[arg(long)]
    pub filter_strings: bool,

    /// Specify code page for filtering
    #[arg(long, value_name = "CODE")]
    pub filter_code_page: Option<String>,

    /// Fail (exit with code 1) on the first occurrence of the licenses of the semicolon-separated list
    #[arg(long, value_name = "LICENSES")]
    pub fail_on: Option<String>,

    /// Fail (exit with code 1) on the first occurrence of licenses not in the semicolon-separated list
    #[arg(long, value_name = "LICENSES")]
    pub allow_only: Option<String>,

    /// Compare fail-on and allow-only licenses by substring instead of equality
    #[arg(long)]
    pub partial_match: bool,
}

/// Fully-resolved invocation options: pyproject defaults merged with
/// command-line flags, labels parsed, combinations validated. Everything
/// downstream of this is past configuration errors.
#[derive(Debug, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
    pub source: LicenseSource,
    pub order: OrderBy,
    pub format: OutputFormat,
    pub summary: bool,
    pub output_file: Option<PathBuf>,
    pub criteria: FilterCriteria,
    pub policy: PolicySet,
    pub with_authors: bool,
    pub with_urls: bool,
    pub with_description: bool,
    pub with_license_file: bool,
    pub no_license_path: bool,
    pub with_notice_file: bool,
    pub no_version: bool,
    /// `Some` only when `--filter-strings` is on.
    pub code_page: Option<CodePage>,
}

impl Options {
    pub fn resolve(cli: Cli, config: Config) -> Result<Options> {
        let source_label = cli.from.or(config.from).unwrap_or_else(|| "mixed".to_string());
        let Some(source) = LicenseSource::from_label(&source_label) else {
            bail!(
                "invalid license source '{}' for '--from', choose from \
                 \"meta\", \"classifier\", \"mixed\", \"all\", \"expression\"",
                source_label
            );
        };

        let order_label = cli.order.or(config.order).unwrap_or_else(|| "name".to_string());
        let Some(order) = OrderBy::from_label(&order_label) else {
            bail!(
                "invalid column '{}' for '--order', choose from \
                 \"name\", \"license\", \"author\", \"url\", \"count\"",
                order_label
            );
        };

        let format_label = cli.format.or(config.format).unwrap_or_else(|| "plain".to_string());
        let Some(format) = OutputFormat::from_label(&format_label) else {
            bail!(
                "invalid style '{}' for '--format', choose from \
                 \"plain\", \"markdown\", \"json\", \"csv\"",
                format_label
            );
        };

        let summary = cli.summary || config.summary.unwrap_or(false);
        let with_system = cli.with_system || config.with_system.unwrap_or(false);
        let with_authors = cli.with_authors || config.with_authors.unwrap_or(false);
        let with_urls = cli.with_urls || config.with_urls.unwrap_or(false);
        let with_description = cli.with_description || config.with_description.unwrap_or(false);
        let with_license_file = cli.with_license_file || config.with_license_file.unwrap_or(false);
        let no_license_path = cli.no_license_path || config.no_license_path.unwrap_or(false);
        let with_notice_file = cli.with_notice_file || config.with_notice_file.unwrap_or(false);
        let no_version = cli.no_version || config.no_version.unwrap_or(false);
        let filter_strings = cli.filter_strings || config.filter_strings.unwrap_or(false);
        let partial_match = cli.partial_match || config.partial_match.unwrap_or(false);

        if !with_license_file && (no_license_path || with_notice_file) {
            bail!(
                "'--no-license-path' and '--with-notice-file' require \
                 the '--with-license-file' option to be set"
            );
        }

        let code_page_label = cli.filter_code_page.or(config.filter_code_page);
        if !filter_strings && code_page_label.is_some() {
            bail!("'--filter-code-page' requires the '--filter-strings' option to be set");
        }
        let code_page = if filter_strings {
            let label = code_page_label.unwrap_or_else(|| "latin1".to_string());
            match CodePage::from_label(&label) {
                Some(code_page) => Some(code_page),
                None => bail!(
                    "invalid code page '{}' given for '--filter-code-page', \
                     supported code pages are \"latin1\", \"ascii\" and \"utf8\"",
                    label
                ),
            }
        } else {
            None
        };

        let fail_on = cli.fail_on.or(config.fail_on).map(|s| split_license_list(&s));
        let allow_only = cli.allow_only.or(config.allow_only).map(|s| split_license_list(&s));
        if partial_match && fail_on.is_none() && allow_only.is_none() {
            bail!("'--partial-match' requires the '--fail-on' or '--allow-only' option to be set");
        }

        let ignore_packages = if cli.ignore_packages.is_empty() {
            config.ignore_packages.unwrap_or_default()
        } else {
            cli.ignore_packages
        };
        let only_packages = if cli.packages.is_empty() {
            config.packages.unwrap_or_default()
        } else {
            cli.packages
        };

        Ok(Options {
            path: cli.path,
            source,
            order,
            format,
            summary,
            output_file: cli.output_file.or(config.output_file),
            criteria: FilterCriteria {
                ignore_packages,
                only_packages,
                with_system,
            },
            policy: PolicySet {
                fail_on,
                allow_only,
                partial_match,
            },
            with_authors,
            with_urls,
            with_description,
            with_license_file,
            no_license_path,
            with_notice_file,
            no_version,
            code_page,
        })
    }

    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            source: self.source,
            format: self.format,
            order: self.order,
            summary: self.summary,
            with_authors: self.with_authors,
            with_urls: self.with_urls,
            with_description: self.with_description,
            with_license_file: self.with_license_file,
            no_license_path: self.no_license_path,
            with_notice_file: self.with_notice_file,
            no_version: self.no_version,
        }
    }
}

/// Split a semicolon-separated license list into a set, dropping empty
/// entries around stray separators.
fn split_license_list(raw: &str) -> BTreeSet<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("py-license-inspect").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_resolve_defaults() {
        let options = Options::resolve(parse(&[]), Config::default()).unwrap();
        assert_eq!(options.source, LicenseSource::Mixed);
        assert_eq!(options.order, OrderBy::Name);
        assert_eq!(options.format, OutputFormat::Plain);
        assert!(!options.summary);
        assert!(options.policy.fail_on.is_none());
        assert!(options.code_page.is_none());
    }

    #[test]
    fn test_source_aliases() {
        let options = Options::resolve(parse(&["--from=C"]), Config::default()).unwrap();
        assert_eq!(options.source, LicenseSource::Classifier);

        let options = Options::resolve(parse(&["--from=mix"]), Config::default()).unwrap();
        assert_eq!(options.source, LicenseSource::Mixed);
    }

    #[test]
    fn test_invalid_labels_rejected() {
        assert!(Options::resolve(parse(&["--from=spdx"]), Config::default()).is_err());
        assert!(Options::resolve(parse(&["--order=size"]), Config::default()).is_err());
        assert!(Options::resolve(parse(&["--format=xml"]), Config::default()).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            from: Some("classifier".to_string()),
            summary: Some(true),
            fail_on: Some("LIC1;LIC2".to_string()),
            ..Default::default()
        };

        let options = Options::resolve(parse(&["--from=meta"]), config).unwrap();
        assert_eq!(options.source, LicenseSource::Meta);
        // values the CLI did not touch still come from the config
        assert!(options.summary);
        let fail_on = options.policy.fail_on.unwrap();
        assert!(fail_on.contains("LIC1"));
        assert!(fail_on.contains("LIC2"));
    }

    #[test]
    fn test_notice_file_requires_license_file() {
        let err = Options::resolve(parse(&["--with-notice-file"]), Config::default()).unwrap_err();
        assert!(err.to_string().contains("--with-license-file"));

        let err = Options::resolve(parse(&["--no-license-path"]), Config::default()).unwrap_err();
        assert!(err.to_string().contains("--with-license-file"));

        assert!(Options::resolve(
            parse(&["--with-license-file", "--with-notice-file"]),
            Config::default(),
        )
        .is_ok());
    }

    #[test]
    fn test_code_page_requires_filter_strings() {
        let err = Options::resolve(parse(&["--filter-code-page=utf8"]), Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("--filter-strings"));

        let options =
            Options::resolve(parse(&["--filter-strings"]), Config::default()).unwrap();
        assert_eq!(options.code_page, Some(CodePage::Latin1));

        let options = Options::resolve(
            parse(&["--filter-strings", "--filter-code-page=ascii"]),
            Config::default(),
        )
        .unwrap();
        assert_eq!(options.code_page, Some(CodePage::Ascii));
    }

    #[test]
    fn test_invalid_code_page_rejected() {
        let err = Options::resolve(
            parse(&["--filter-strings", "--filter-code-page=XX"]),
            Config::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid code page"));
    }

    #[test]
    fn test_partial_match_requires_a_license_list() {
        let err = Options::resolve(parse(&["--partial-match"]), Config::default()).unwrap_err();
        assert!(err.to_string().contains("--fail-on"));

        assert!(Options::resolve(
            parse(&["--partial-match", "--fail-on=MIT"]),
            Config::default(),
        )
        .is_ok());
    }

    #[test]
    fn test_license_list_splitting() {
        let options = Options::resolve(
            parse(&["--allow-only=MIT License; BSD License ;"]),
            Config::default(),
        )
        .unwrap();
        let allow_only = options.policy.allow_only.unwrap();
        assert_eq!(allow_only.len(), 2);
        assert!(allow_only.contains("MIT License"));
        assert!(allow_only.contains("BSD License"));
    }

    #[test]
    fn test_ignore_packages_from_config_unless_given() {
        let config = Config {
            ignore_packages: Some(vec!["from-config".to_string()]),
            ..Default::default()
        };
        let options = Options::resolve(parse(&[]), config.clone()).unwrap();
        assert_eq!(options.criteria.ignore_packages, vec!["from-config"]);

        let options = Options::resolve(parse(&["-i", "from-cli"]), config).unwrap();
        assert_eq!(options.criteria.ignore_packages, vec!["from-cli"]);
    }
}
