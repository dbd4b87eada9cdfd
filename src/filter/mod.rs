//! Inclusion filter: decides which paths participate in review.
//!
//! A path is included when it matches at least one include pattern and
//! no exclude pattern. Patterns are globs supporting `*`, `**`, and
//! brace alternation (`{a,b,c}`). A malformed pattern is logged and
//! dropped, which can only make the filter stricter (fail closed).

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

/// Compiled include/exclude glob sets.
///
/// Pure given (path, patterns): matching never touches the filesystem.
#[derive(Debug)]
pub struct InclusionFilter {
    include: GlobSet,
    exclude: GlobSet,
    /// True when every include pattern failed to compile; nothing can
    /// match, so everything is excluded.
    include_empty: bool,
}

impl InclusionFilter {
    /// Compile the filter from include and exclude pattern lists.
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        let (include_set, include_count) = compile(include, "include");
        let (exclude_set, _) = compile(exclude, "exclude");
        Self {
            include: include_set,
            exclude: exclude_set,
            include_empty: include_count == 0,
        }
    }

    /// Returns `true` if `path` should be reviewed.
    pub fn includes(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if self.include_empty {
            return false;
        }
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

/// Compile a pattern list, skipping malformed patterns with a warning.
fn compile(patterns: &[String], label: &str) -> (GlobSet, usize) {
    let mut builder = GlobSetBuilder::new();
    let mut count = 0;
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
                count += 1;
            }
            Err(e) => {
                warn!("ignoring malformed {label} pattern '{pattern}': {e}");
            }
        }
    }
    let set = builder.build().unwrap_or_else(|e| {
        warn!("failed to build {label} glob set: {e}");
        GlobSet::empty()
    });
    (set, count)
}
