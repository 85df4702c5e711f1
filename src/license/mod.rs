use serde::{Deserialize, Serialize};

pub mod extractor;
pub mod normalize;
pub mod selector;

// Re-export from the submodules
pub use extractor::{enumerate_dist_info, extract_record, find_site_packages_path, DistInfo};
pub use normalize::{normalize_pkg_name, normalize_pkg_spec, normalize_version};
pub use selector::{select_license_by_source, LicenseSource};

/// Sentinel used wherever the environment has no answer. Every textual field
/// of a record is either populated or equal to this, never absent.
pub const LICENSE_UNKNOWN: &str = "UNKNOWN";

/// Everything we know about one installed distribution.
///
/// Built once per package per run and immutable afterwards, except for the
/// optional code-page filtering pass applied in place before selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    /// Free-text `License` field from package metadata.
    pub license_meta: String,
    /// SPDX expression from the `License-Expression` metadata field.
    pub license_expression: String,
    /// License names pulled from trove classifiers, in declaration order.
    pub license_classifiers: Vec<String>,
    pub homepage: String,
    pub author: String,
    pub description: String,
    pub license_file: String,
    pub license_text: String,
    pub notice_file: String,
    pub notice_text: String,
}

impl PackageRecord {
    /// Record for a distribution whose metadata is entirely absent.
    pub fn with_identity(name: String, version: String) -> Self {
        let unknown = || LICENSE_UNKNOWN.to_string();
        Self {
            name,
            version,
            license_meta: unknown(),
            license_expression: unknown(),
            license_classifiers: Vec::new(),
            homepage: unknown(),
            author: unknown(),
            description: unknown(),
            license_file: unknown(),
            license_text: unknown(),
            notice_file: unknown(),
            notice_text: unknown(),
        }
    }
}

/// Target code page for `--filter-strings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePage {
    Latin1,
    Ascii,
    Utf8,
}

impl CodePage {
    /// Case-insensitive lookup accepting the spellings users know from
    /// Python's codec registry. Unknown labels are a configuration error at
    /// the call site.
    pub fn from_label(label: &str) -> Option<CodePage> {
        match label.to_lowercase().replace('_', "-").as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" | "l1" => Some(CodePage::Latin1),
            "ascii" | "us-ascii" | "646" => Some(CodePage::Ascii),
            "utf8" | "utf-8" | "u8" => Some(CodePage::Utf8),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CodePage::Latin1 => "latin1",
            CodePage::Ascii => "ascii",
            CodePage::Utf8 => "utf8",
        }
    }

    /// Drop characters the code page cannot represent. Filtering twice gives
    /// the same result as filtering once.
    pub fn filter(&self, s: &str) -> String {
        match self {
            CodePage::Utf8 => s.to_string(),
            CodePage::Latin1 => s.chars().filter(|c| (*c as u32) <= 0xFF).collect(),
            CodePage::Ascii => s.chars().filter(|c| c.is_ascii()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_page_labels() {
        assert_eq!(CodePage::from_label("latin1"), Some(CodePage::Latin1));
        assert_eq!(CodePage::from_label("ISO-8859-1"), Some(CodePage::Latin1));
        assert_eq!(CodePage::from_label("iso8859_1"), Some(CodePage::Latin1));
        assert_eq!(CodePage::from_label("US-ASCII"), Some(CodePage::Ascii));
        assert_eq!(CodePage::from_label("UTF-8"), Some(CodePage::Utf8));
        assert_eq!(CodePage::from_label("XX"), None);
    }

    #[test]
    fn test_code_page_filter() {
        assert_eq!(CodePage::Ascii.filter("café ☕"), "caf ");
        assert_eq!(CodePage::Latin1.filter("café ☕"), "café ");
        assert_eq!(CodePage::Utf8.filter("café ☕"), "café ☕");
    }

    #[test]
    fn test_code_page_filter_idempotent() {
        for page in [CodePage::Latin1, CodePage::Ascii, CodePage::Utf8] {
            let once = page.filter("naïve ☕ text");
            assert_eq!(page.filter(&once), once);
        }
    }

    #[test]
    fn test_record_with_identity_defaults_to_unknown() {
        let record = PackageRecord::with_identity("pkg".to_string(), "1.0".to_string());
        assert_eq!(record.license_meta, LICENSE_UNKNOWN);
        assert_eq!(record.homepage, LICENSE_UNKNOWN);
        assert_eq!(record.notice_text, LICENSE_UNKNOWN);
        assert!(record.license_classifiers.is_empty());
    }
}
