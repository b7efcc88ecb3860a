//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match on segment boundaries: `/toppic` matches `/toppic` and
//!   `/toppic/add`, never `/toppicks`
//! - No regex to guarantee O(n) matching

/// Matches a request path and yields the part after the matched portion.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// The remainder of `path` after the match, or `None` if it does not match.
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str>;

    /// Longer matches win when several routes match.
    fn specificity(&self) -> usize;
}

/// Matches one path exactly.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        (path == self.path).then_some("")
    }

    fn specificity(&self) -> usize {
        self.path.len()
    }
}

/// Matches the request path prefix on a segment boundary.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing `/` is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches('/').to_string();
        Self { prefix }
    }
}

impl Matcher for PathPrefixMatcher {
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    fn specificity(&self) -> usize {
        self.prefix.len()
    }
}
