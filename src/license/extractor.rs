use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{CodePage, PackageRecord, LICENSE_UNKNOWN};

const LICENSE_FILE_PATTERNS: [&str; 3] = ["LICENSE*", "LICENCE*", "COPYING*"];
const NOTICE_FILE_PATTERNS: [&str; 1] = ["NOTICE*"];

/// Handle to one installed distribution: the `.dist-info` directory plus the
/// name and version parsed from its directory name.
#[derive(Debug, Clone)]
pub struct DistInfo {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// Resolve the site-packages directory to scan.
///
/// Accepts a site-packages path directly, a virtual environment root, or
/// nothing (in which case `.venv` in the current directory is tried).
pub fn find_site_packages_path(path: Option<PathBuf>) -> Result<PathBuf> {
    let root = match path {
        Some(path) => {
            if path.file_name().is_some_and(|name| name == "site-packages") {
                return Ok(path);
            }
            if path.join("site-packages").exists() {
                return Ok(path.join("site-packages"));
            }
            path
        }
        None => std::env::current_dir()?.join(".venv"),
    };

    // Unix-like venv layout
    let lib_path = root.join("lib");
    if lib_path.exists() {
        for entry in fs::read_dir(&lib_path)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with("python") {
                let site_packages = entry.path().join("site-packages");
                if site_packages.exists() {
                    return Ok(site_packages);
                }
            }
        }
    }

    // Windows venv layout
    let lib_path = root.join("Lib").join("site-packages");
    if lib_path.exists() {
        return Ok(lib_path);
    }

    // A bare directory of .dist-info entries works too
    if root.exists() {
        return Ok(root);
    }

    anyhow::bail!("Could not find site-packages directory. Please specify with --path")
}

/// List every `.dist-info` distribution under site-packages, in the order the
/// filesystem reports them. Callers that need a stable display order sort the
/// rendered rows instead.
pub fn enumerate_dist_info(site_packages: &Path) -> Result<Vec<DistInfo>> {
    let mut dists = Vec::new();

    for entry in fs::read_dir(site_packages)
        .with_context(|| format!("Failed to read site-packages: {}", site_packages.display()))?
    {
        let entry = entry?;
        let file_name = entry.file_name();
        let name_str = file_name.to_string_lossy();

        if let Some(stem) = name_str.strip_suffix(".dist-info") {
            // {name}-{version}, name part with hyphens flattened to underscores
            let (name, version) = match stem.rfind('-') {
                Some(pos) => (stem[..pos].to_string(), stem[pos + 1..].to_string()),
                None => (stem.to_string(), LICENSE_UNKNOWN.to_string()),
            };
            dists.push(DistInfo { name, version, path: entry.path() });
        }
    }

    Ok(dists)
}

/// Build the full attribute record for one installed distribution.
///
/// Missing metadata is not an error: absent fields come back as `UNKNOWN` and
/// the record is returned regardless.
pub fn extract_record(dist: &DistInfo, code_page: Option<CodePage>) -> PackageRecord {
    let mut record = PackageRecord::with_identity(dist.name.clone(), dist.version.clone());

    let (license_file, license_text) = find_included_file(&dist.path, &LICENSE_FILE_PATTERNS);
    let (notice_file, notice_text) = find_included_file(&dist.path, &NOTICE_FILE_PATTERNS);
    record.license_file = license_file;
    record.license_text = license_text;
    record.notice_file = notice_file;
    record.notice_text = notice_text;

    if let Some(content) = read_metadata(&dist.path) {
        let fields = MetadataFields::parse(&content);

        if let Some(name) = fields.get("Name") {
            record.name = name.to_string();
        }
        if let Some(version) = fields.get("Version") {
            record.version = version.to_string();
        }
        if let Some(license) = fields.get("License") {
            record.license_meta = license.to_string();
        }
        if let Some(expression) = fields.get("License-Expression") {
            record.license_expression = expression.to_string();
        }
        if let Some(author) = fields.get("Author") {
            record.author = author.to_string();
        }
        if let Some(summary) = fields.get("Summary") {
            record.description = summary.to_string();
        }
        if let Some(homepage) = extract_homepage(&fields) {
            record.homepage = homepage;
        }
        record.license_classifiers = find_license_from_classifier(fields.get_all("Classifier"));
    }

    if let Some(code_page) = code_page {
        apply_code_page_filter(&mut record, code_page);
    }

    record
}

/// Pull license names out of trove classifiers, keeping declaration order
/// and duplicates. The bare `OSI Approved` category label is not a license
/// name and is dropped.
pub fn find_license_from_classifier<'a, I>(classifiers: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut licenses = Vec::new();

    for classifier in classifiers {
        if !classifier.starts_with("License") {
            continue;
        }
        let license = classifier.rsplit(" :: ").next().unwrap_or(classifier);
        if license != "OSI Approved" {
            licenses.push(license.to_string());
        }
    }

    licenses
}

fn read_metadata(dist_info_path: &Path) -> Option<String> {
    for file_name in ["METADATA", "PKG-INFO"] {
        let path = dist_info_path.join(file_name);
        if let Ok(bytes) = fs::read(&path) {
            return Some(String::from_utf8_lossy(&bytes).into_owned());
        }
    }
    None
}

/// RFC 822 header block of a METADATA file: `Key: value` lines up to the
/// first blank line, continuation lines folded into the previous value.
struct MetadataFields {
    entries: Vec<(String, String)>,
}

impl MetadataFields {
    fn parse(content: &str) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in content.lines() {
            if line.is_empty() {
                break; // body is the long description, not headers
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(last) = entries.last_mut() {
                    last.1.push('\n');
                    last.1.push_str(line.trim_start());
                }
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                entries.push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        MetadataFields { entries }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// `Home-page` when present, else the `Homepage` entry of `Project-URL`.
fn extract_homepage(fields: &MetadataFields) -> Option<String> {
    if let Some(homepage) = fields.get("Home-page") {
        return Some(homepage.to_string());
    }
    for project_url in fields.get_all("Project-URL") {
        if let Some((label, url)) = project_url.split_once(',') {
            if label.trim().eq_ignore_ascii_case("homepage") {
                return Some(url.trim().to_string());
            }
        }
    }
    None
}

/// Find the first bundled file matching one of `patterns` inside the
/// distribution directory. Patterns are tried in declared order; matches for
/// each pattern are visited lexicographically. Undecodable bytes are replaced
/// rather than failing.
fn find_included_file(dist_info_path: &Path, patterns: &[&str]) -> (String, String) {
    for pattern in patterns {
        let Some(pattern_str) = dist_info_path.join(pattern).to_str().map(String::from) else {
            continue;
        };
        let Ok(paths) = glob::glob(&pattern_str) else {
            continue;
        };
        let mut matches: Vec<PathBuf> = paths.flatten().filter(|p| p.is_file()).collect();
        matches.sort();

        if let Some(found) = matches.into_iter().next() {
            let text = match fs::read(&found) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => LICENSE_UNKNOWN.to_string(),
            };
            return (found.to_string_lossy().into_owned(), text);
        }
    }

    (LICENSE_UNKNOWN.to_string(), LICENSE_UNKNOWN.to_string())
}

/// Round-trip every string field through the target code page, dropping
/// characters it cannot represent.
fn apply_code_page_filter(record: &mut PackageRecord, code_page: CodePage) {
    let fields = [
        &mut record.name,
        &mut record.version,
        &mut record.license_meta,
        &mut record.license_expression,
        &mut record.homepage,
        &mut record.author,
        &mut record.description,
        &mut record.license_file,
        &mut record.license_text,
        &mut record.notice_file,
        &mut record.notice_text,
    ];
    for field in fields {
        *field = code_page.filter(field);
    }
    for classifier in &mut record.license_classifiers {
        *classifier = code_page.filter(classifier);
    }
}
