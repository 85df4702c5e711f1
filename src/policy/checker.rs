use std::collections::BTreeSet;

use crate::license::{
    extract_record, normalize_pkg_name, normalize_pkg_spec, normalize_version,
    select_license_by_source, CodePage, DistInfo, LicenseSource, PackageRecord,
};

use super::matcher::{
    case_insensitive_partial_match_set_diff, case_insensitive_partial_match_set_intersect,
    case_insensitive_set_diff, case_insensitive_set_intersect,
};

/// Packages excluded from output unless `--with-system` is set: the tool
/// itself, the package manager, the table renderer and the packaging
/// bootstrap distributions.
pub const SYSTEM_PACKAGES: [&str; 5] = [
    "py-license-inspect",
    "pip",
    "prettytable",
    "setuptools",
    "wheel",
];

/// Which gate a package fell through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    FailOn,
    NotAllowed,
}

/// 違反の詳細: どのパッケージが、どのライセンスで、どのゲートに落ちたか
#[derive(Debug, Clone)]
pub struct Violation {
    pub package_name: String,
    pub package_version: String,
    pub licenses: BTreeSet<String>,
    pub kind: ViolationKind,
}

impl Violation {
    /// One-line report for the error channel.
    pub fn message(&self) -> String {
        let licenses = self.licenses.iter().cloned().collect::<Vec<_>>().join("; ");
        match self.kind {
            ViolationKind::FailOn => format!(
                "fail-on license {} was found for package {}:{}",
                licenses, self.package_name, self.package_version
            ),
            ViolationKind::NotAllowed => format!(
                "license {} not in allow-only licenses was found for package {}:{}",
                licenses, self.package_name, self.package_version
            ),
        }
    }
}

/// Outcome of one pipeline step: either the record passed every gate, or it
/// is the violation that stops the run. Side effects (stderr, exit code) are
/// the caller's decision.
#[derive(Debug)]
pub enum PackageOutcome {
    Pass(Box<PackageRecord>),
    Violation(Box<PackageRecord>, Violation),
}

/// Which packages to include at all.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// `name` or `name:version` specs to skip.
    pub ignore_packages: Vec<String>,
    /// When non-empty, only these `name` or `name:version` specs are kept.
    pub only_packages: Vec<String>,
    pub with_system: bool,
}

/// License gates applied to every surviving package.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    pub fail_on: Option<BTreeSet<String>>,
    pub allow_only: Option<BTreeSet<String>>,
    pub partial_match: bool,
}

/// Lazy, fail-fast filter over the installed-package collection.
///
/// Packages come out in environment order. The first policy violation is
/// yielded as `PackageOutcome::Violation` and fuses the iterator; records
/// yielded before it are not retracted.
pub struct PackagePipeline {
    dists: std::vec::IntoIter<DistInfo>,
    source: LicenseSource,
    ignore: BTreeSet<String>,
    only: BTreeSet<String>,
    with_system: bool,
    policy: PolicySet,
    code_page: Option<CodePage>,
    halted: bool,
}

impl PackagePipeline {
    pub fn new(
        dists: Vec<DistInfo>,
        source: LicenseSource,
        criteria: &FilterCriteria,
        policy: PolicySet,
        code_page: Option<CodePage>,
    ) -> Self {
        let ignore = criteria.ignore_packages.iter().map(|s| normalize_pkg_spec(s)).collect();
        let only = criteria.only_packages.iter().map(|s| normalize_pkg_spec(s)).collect();

        Self {
            dists: dists.into_iter(),
            source,
            ignore,
            only,
            with_system: criteria.with_system,
            policy,
            code_page,
            halted: false,
        }
    }

    /// The specifier keys a package answers to: bare name, `name:rawVersion`
    /// and `name:normalizedVersion`.
    fn matches_specs(specs: &BTreeSet<String>, dist: &DistInfo) -> bool {
        let name_key = normalize_pkg_name(&dist.name);
        if specs.contains(&name_key) {
            return true;
        }
        specs.contains(&format!("{}:{}", name_key, dist.version))
            || specs.contains(&format!("{}:{}", name_key, normalize_version(&dist.version)))
    }

    fn is_system_package(dist: &DistInfo) -> bool {
        let name_key = normalize_pkg_name(&dist.name);
        SYSTEM_PACKAGES.iter().any(|pkg| normalize_pkg_name(pkg) == name_key)
    }

    /// 許可/禁止ゲートの純粋な判定部分
    fn check_policy(&self, record: &PackageRecord) -> Option<Violation> {
        let license_names = select_license_by_source(
            self.source,
            &record.license_classifiers,
            &record.license_meta,
            &record.license_expression,
        );

        if let Some(fail_on) = &self.policy.fail_on {
            let failed = if self.policy.partial_match {
                case_insensitive_partial_match_set_intersect(&license_names, fail_on)
            } else {
                case_insensitive_set_intersect(&license_names, fail_on)
            };
            if !failed.is_empty() {
                return Some(Violation {
                    package_name: record.name.clone(),
                    package_version: record.version.clone(),
                    licenses: failed,
                    kind: ViolationKind::FailOn,
                });
            }
        }

        if let Some(allow_only) = &self.policy.allow_only {
            let uncommon = if self.policy.partial_match {
                case_insensitive_partial_match_set_diff(&license_names, allow_only)
            } else {
                case_insensitive_set_diff(&license_names, allow_only)
            };
            // violation only when nothing in the selection is allowed
            if uncommon.len() == license_names.len() {
                return Some(Violation {
                    package_name: record.name.clone(),
                    package_version: record.version.clone(),
                    licenses: uncommon,
                    kind: ViolationKind::NotAllowed,
                });
            }
        }

        None
    }
}

impl Iterator for PackagePipeline {
    type Item = PackageOutcome;

    fn next(&mut self) -> Option<PackageOutcome> {
        if self.halted {
            return None;
        }

        for dist in self.dists.by_ref() {
            if Self::matches_specs(&self.ignore, &dist) {
                continue;
            }
            if !self.with_system && Self::is_system_package(&dist) {
                continue;
            }
            if !self.only.is_empty() && !Self::matches_specs(&self.only, &dist) {
                continue;
            }

            let record = extract_record(&dist, self.code_page);

            if let Some(violation) = self.check_policy(&record) {
                self.halted = true;
                return Some(PackageOutcome::Violation(Box::new(record), violation));
            }
            return Some(PackageOutcome::Pass(Box::new(record)));
        }

        None
    }
}
