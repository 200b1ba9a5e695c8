//! Path math over `/`-separated object keys.
//!
//! Object stores keep keys in a flat namespace. Everything directory-like in
//! this crate is derived from these functions on every request; there is no
//! tree structure kept anywhere.

use serde::Serialize;

/// Key separator.
pub const SEPARATOR: char = '/';

/// The conceptual root prefix.
pub const ROOT: &str = "/";

/// One step of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreadcrumbSegment {
    /// Path component with a trailing separator, e.g. `photos/`
    pub display_name: String,
    /// Components up to and including this one, joined without a leading separator
    pub cumulative_prefix: String,
}

/// Returns true for the two spellings of the root prefix.
pub fn is_root(prefix: &str) -> bool {
    prefix.is_empty() || prefix == ROOT
}

/// Parent "directory" of a key.
///
/// The result always starts with `/`, whatever the input looked like:
/// `a/b.txt` and `/a/b.txt` both give `/a`. Keys with fewer than two
/// components resolve to the root.
pub fn compute_parent(key: &str) -> String {
    if is_root(key) {
        return ROOT.to_string();
    }

    let parts: Vec<&str> = key.split(SEPARATOR).collect();
    if parts.len() < 2 {
        return ROOT.to_string();
    }

    format!("{}{}", ROOT, parts[..parts.len() - 1].join(ROOT))
}

/// Breadcrumb trail for a prefix.
///
/// Empty components (from `//` or a leading `/`) produce no segment but still
/// take part in the cumulative join, so `a//b` gives `a` then `a//b`.
pub fn compute_breadcrumbs(prefix: &str) -> Vec<BreadcrumbSegment> {
    if is_root(prefix) {
        return Vec::new();
    }

    let parts: Vec<&str> = prefix.split(SEPARATOR).collect();
    parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| BreadcrumbSegment {
            display_name: format!("{}{}", part, SEPARATOR),
            cumulative_prefix: parts[..=i].join(ROOT),
        })
        .collect()
}

/// Form of a query prefix handed to the store: no leading separators, and
/// the root becomes the empty string.
pub fn store_prefix(prefix: &str) -> &str {
    prefix.trim_start_matches(SEPARATOR)
}

/// Last path component of a key relative to `prefix`, keeping a trailing
/// separator for directory-like keys.
pub fn display_name<'a>(key: &'a str, prefix: &str) -> &'a str {
    let relative = key.strip_prefix(store_prefix(prefix)).unwrap_or(key);
    if relative.is_empty() {
        return key;
    }
    let trimmed = relative.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &relative[idx + 1..],
        None => relative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crumb(display_name: &str, cumulative_prefix: &str) -> BreadcrumbSegment {
        BreadcrumbSegment {
            display_name: display_name.to_string(),
            cumulative_prefix: cumulative_prefix.to_string(),
        }
    }

    #[test]
    fn test_parent_of_short_keys_is_root() {
        for key in ["", "/", "file.txt", "dir"] {
            assert_eq!(compute_parent(key), "/", "key {:?}", key);
        }
    }

    #[test]
    fn test_parent_of_nested_key() {
        assert_eq!(compute_parent("a/b"), "/a");
        assert_eq!(compute_parent("photos/2024/cat.png"), "/photos/2024");
    }

    #[test]
    fn test_parent_always_has_leading_separator() {
        // "/a/b" splits into ["", "a", "b"]
        assert_eq!(compute_parent("/a/b"), "//a");
        assert_eq!(compute_parent("a/"), "/a");
    }

    #[test]
    fn test_breadcrumbs_of_root() {
        assert!(compute_breadcrumbs("").is_empty());
        assert!(compute_breadcrumbs("/").is_empty());
    }

    #[test]
    fn test_breadcrumbs_of_nested_prefix() {
        assert_eq!(
            compute_breadcrumbs("a/b/"),
            vec![crumb("a/", "a"), crumb("b/", "a/b")]
        );
    }

    #[test]
    fn test_breadcrumbs_keep_split_index_for_empty_components() {
        assert_eq!(
            compute_breadcrumbs("a//b"),
            vec![crumb("a/", "a"), crumb("b/", "a//b")]
        );
        assert_eq!(
            compute_breadcrumbs("/a/b"),
            vec![crumb("a/", "/a"), crumb("b/", "/a/b")]
        );
    }

    #[test]
    fn test_breadcrumb_count_matches_non_empty_components() {
        for prefix in ["x", "x/", "x/y/z", "//x///y/", "a/b/c/d/"] {
            let expected = prefix.split('/').filter(|p| !p.is_empty()).count();
            assert_eq!(compute_breadcrumbs(prefix).len(), expected, "{:?}", prefix);
        }
    }

    #[test]
    fn test_breadcrumbs_are_idempotent() {
        assert_eq!(compute_breadcrumbs("a/b/c/"), compute_breadcrumbs("a/b/c/"));
    }

    #[test]
    fn test_store_prefix() {
        assert_eq!(store_prefix("/"), "");
        assert_eq!(store_prefix(""), "");
        assert_eq!(store_prefix("/a/b/"), "a/b/");
        assert_eq!(store_prefix("a/"), "a/");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("a/b.txt", "a/"), "b.txt");
        assert_eq!(display_name("a/c/", "a/"), "c/");
        assert_eq!(display_name("e.txt", "/"), "e.txt");
        assert_eq!(display_name("a/", "/"), "a/");
        assert_eq!(display_name("x/y/z.txt", "/"), "z.txt");
    }
}
