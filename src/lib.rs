pub mod cli;
pub mod config;
pub mod license;
pub mod output;
pub mod policy;

// Re-export main types for easy access
pub use license::{CodePage, DistInfo, LicenseSource, PackageRecord, LICENSE_UNKNOWN};
pub use policy::{FilterCriteria, PackageOutcome, PackagePipeline, PolicySet, Violation};
