//! Page-scope matching: scheme/host-insensitive, trailing-slash-
//! insensitive, fragment-aware normalization of page URLs.

/// Normalized form of a page URL: `path` plus optional `fragment`,
/// both without trailing slashes; query strings are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageKey {
    pub path: String,
    pub fragment: Option<String>,
}

pub fn normalize(url: &str) -> PageKey {
    // Strip scheme and host when present.
    let rest = match url.split_once("://") {
        Some((_, after)) => match after.find('/') {
            Some(idx) => &after[idx..],
            None => "/",
        },
        None => url,
    };
    let (before_frag, fragment) = match rest.split_once('#') {
        Some((p, f)) => (p, Some(f)),
        None => (rest, None),
    };
    let path = before_frag.split('?').next().unwrap_or("");
    PageKey {
        path: trim_slashes(path),
        fragment: fragment.map(trim_slashes).filter(|f| !f.is_empty()),
    }
}

/// Whether an incident recorded on `stored` belongs to the page at
/// `current`. Exact normalized match always qualifies; when either side
/// carries no fragment, matching falls back to the path alone so plain
/// routes and fragment-routed views find each other.
pub fn matches_page(stored: &str, current: &str) -> bool {
    let a = normalize(stored);
    let b = normalize(current);
    if a == b {
        return true;
    }
    a.path == b.path && (a.fragment.is_none() || b.fragment.is_none())
}

fn trim_slashes(s: &str) -> String {
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
