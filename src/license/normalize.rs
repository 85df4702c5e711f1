/// Tokens that start the pre-release/post-release/dev tail of a version.
const RELEASE_TAIL_TOKENS: [&str; 5] = ["alpha", "beta", "rc", "post", "dev"];

/// Canonicalize a distribution name the way package indexes do: lower-case,
/// with any run of `-`, `_` and `.` folded into a single hyphen.
///
/// `pip_licenses`, `pip.licenses` and `Pip-Licenses` all come out as
/// `pip-licenses`.
pub fn normalize_pkg_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c == '-' || c == '_' || c == '.' {
            pending_separator = true;
        } else {
            if pending_separator {
                out.push('-');
                pending_separator = false;
            }
            out.extend(c.to_lowercase());
        }
    }
    if pending_separator {
        out.push('-');
    }

    out
}

/// Normalize a version string: strip a leading `v`, then drop the `-`/`.`
/// separators from the pre-release tail (`alpha`, `beta`, `rc`, `post`,
/// `dev`). A `+local` segment passes through verbatim.
///
/// `v2.0.0` becomes `2.0.0`; `1.0.0-alpha.1+local` becomes
/// `1.0.0alpha1+local`.
pub fn normalize_version(version: &str) -> String {
    let version = version.strip_prefix('v').unwrap_or(version);
    let mut out = String::with_capacity(version.len());
    let mut in_tail = false;

    for (i, c) in version.char_indices() {
        if c == '+' {
            // local-version segment, preserved as-is
            out.push_str(&version[i..]);
            break;
        }
        if c == '-' || c == '.' {
            if in_tail {
                continue;
            }
            if starts_with_tail_token(&version[i + c.len_utf8()..]) {
                in_tail = true;
                continue;
            }
        }
        out.push(c);
    }

    out
}

fn starts_with_tail_token(s: &str) -> bool {
    RELEASE_TAIL_TOKENS
        .iter()
        .any(|token| s.get(..token.len()).is_some_and(|p| p.eq_ignore_ascii_case(token)))
}

/// Normalize an ignore/select spec of the form `name` or `name:version`.
///
/// Only the name part is canonicalized; the version part is passed through
/// trimmed. Degenerate multi-colon input is truncated at the second colon.
pub fn normalize_pkg_spec(spec: &str) -> String {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or("");
    match parts.next() {
        None => normalize_pkg_name(name.trim()),
        Some(version) => format!("{}:{}", normalize_pkg_name(name.trim()), version.trim()),
    }
}
