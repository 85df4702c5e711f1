use std::collections::BTreeSet;

use super::LICENSE_UNKNOWN;

/// Where the canonical license for a package is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseSource {
    Meta,
    Classifier,
    Mixed,
    All,
    Expression,
}

impl LicenseSource {
    /// Case-insensitive lookup accepting the short spellings as aliases.
    pub fn from_label(label: &str) -> Option<LicenseSource> {
        match label.to_lowercase().as_str() {
            "meta" | "m" => Some(LicenseSource::Meta),
            "classifier" | "c" => Some(LicenseSource::Classifier),
            "mixed" | "mix" => Some(LicenseSource::Mixed),
            "all" => Some(LicenseSource::All),
            "expression" | "e" => Some(LicenseSource::Expression),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LicenseSource::Meta => "meta",
            LicenseSource::Classifier => "classifier",
            LicenseSource::Mixed => "mixed",
            LicenseSource::All => "all",
            LicenseSource::Expression => "expression",
        }
    }
}

/// Decide the canonical license string(s) for one package.
///
/// Classifier data outranks the free-text metadata field, which outranks the
/// parsed expression. Under `All` the renderer shows the three fields as
/// separate columns and never asks for a row-level selection; when a single
/// set is still needed (policy checks), `All` falls back to the `Mixed`
/// precedence.
pub fn select_license_by_source(
    source: LicenseSource,
    classifiers: &[String],
    license_meta: &str,
    license_expression: &str,
) -> BTreeSet<String> {
    let classifier_str = if classifiers.is_empty() {
        LICENSE_UNKNOWN.to_string()
    } else {
        classifiers.join(", ")
    };

    let selected = match source {
        LicenseSource::Meta => license_meta.to_string(),
        LicenseSource::Classifier => classifier_str,
        LicenseSource::Expression => license_expression.to_string(),
        LicenseSource::Mixed | LicenseSource::All => {
            if !classifiers.is_empty() {
                classifier_str
            } else if license_meta != LICENSE_UNKNOWN {
                license_meta.to_string()
            } else {
                license_expression.to_string()
            }
        }
    };

    BTreeSet::from([selected])
}
