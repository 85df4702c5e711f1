use std::collections::BTreeSet;

/// Elements of `a` with no case-insensitive equal in `b`. The result keeps
/// `a`'s original casing and is always a subset of `a`.
pub fn case_insensitive_set_diff(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    let b_lower: BTreeSet<String> = b.iter().map(|s| s.to_lowercase()).collect();
    a.iter()
        .filter(|s| !b_lower.contains(&s.to_lowercase()))
        .cloned()
        .collect()
}

/// Elements of `a` with a case-insensitive equal in `b`.
pub fn case_insensitive_set_intersect(
    a: &BTreeSet<String>,
    b: &BTreeSet<String>,
) -> BTreeSet<String> {
    let b_lower: BTreeSet<String> = b.iter().map(|s| s.to_lowercase()).collect();
    a.iter()
        .filter(|s| b_lower.contains(&s.to_lowercase()))
        .cloned()
        .collect()
}

/// Elements of `a` that no element of `b` partially matches. An `a` element
/// drops out as soon as any `b` element is a case-insensitive substring of it.
pub fn case_insensitive_partial_match_set_diff(
    a: &BTreeSet<String>,
    b: &BTreeSet<String>,
) -> BTreeSet<String> {
    a.iter()
        .filter(|s| {
            let s_lower = s.to_lowercase();
            !b.iter().any(|p| s_lower.contains(&p.to_lowercase()))
        })
        .cloned()
        .collect()
}

/// Elements of `a` that at least one element of `b` partially matches.
pub fn case_insensitive_partial_match_set_intersect(
    a: &BTreeSet<String>,
    b: &BTreeSet<String>,
) -> BTreeSet<String> {
    a.iter()
        .filter(|s| {
            let s_lower = s.to_lowercase();
            b.iter().any(|p| s_lower.contains(&p.to_lowercase()))
        })
        .cloned()
        .collect()
}
