pub mod checker;
pub mod matcher;

// Re-export main types
pub use checker::{
    FilterCriteria, PackageOutcome, PackagePipeline, PolicySet, Violation, ViolationKind,
    SYSTEM_PACKAGES,
};
pub use matcher::{
    case_insensitive_partial_match_set_diff, case_insensitive_partial_match_set_intersect,
    case_insensitive_set_diff, case_insensitive_set_intersect,
};
