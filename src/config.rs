use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults read from the `[tool.py-license-inspect]` section of
/// pyproject.toml. Every field is optional; command-line flags override
/// whatever is set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Where to find license information (meta, classifier, mixed, all, expression)
    pub from: Option<String>,

    /// Order rows by column (name, license, author, url, count)
    pub order: Option<String>,

    /// Output format (plain, markdown, json, csv)
    pub format: Option<String>,

    /// Dump summary of each license
    pub summary: Option<bool>,

    /// Save license list to file
    pub output_file: Option<PathBuf>,

    /// Package names (or name:version) to leave out
    pub ignore_packages: Option<Vec<String>>,

    /// Only include these package names (or name:version)
    pub packages: Option<Vec<String>>,

    pub with_system: Option<bool>,
    pub with_authors: Option<bool>,
    pub with_urls: Option<bool>,
    pub with_description: Option<bool>,
    pub with_license_file: Option<bool>,
    pub no_license_path: Option<bool>,
    pub with_notice_file: Option<bool>,
    pub no_version: Option<bool>,

    pub filter_strings: Option<bool>,
    pub filter_code_page: Option<String>,

    /// Semicolon-separated licenses that fail the run when found
    pub fail_on: Option<String>,

    /// Semicolon-separated licenses outside which the run fails
    pub allow_only: Option<String>,

    pub partial_match: Option<bool>,
}

/// Load configuration from pyproject.toml in the current directory.
pub fn load_config() -> Result<Config> {
    let pyproject_path = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("pyproject.toml");
    load_config_from(&pyproject_path)
}

/// Load configuration from an explicit pyproject.toml path. A missing file
/// or missing tool section is not an error; defaults apply.
pub fn load_config_from(pyproject_path: &Path) -> Result<Config> {
    if !pyproject_path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(pyproject_path)
        .with_context(|| format!("Failed to read pyproject.toml: {}", pyproject_path.display()))?;

    let pyproject: toml::Value = toml::from_str(&content)
        .with_context(|| format!("Failed to parse pyproject.toml: {}", pyproject_path.display()))?;

    if let Some(tool) = pyproject.get("tool") {
        if let Some(section) = tool.get("py-license-inspect") {
            let config: Config = section
                .clone()
                .try_into()
                .context("Failed to parse [tool.py-license-inspect] section")?;
            return Ok(config);
        }
    }

    Ok(Config::default())
}
