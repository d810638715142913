use crate::error::{Error, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// Gitignore-style exclusion list shared by the builder and the diff engine.
///
/// Patterns are evaluated in order and later ones win, so `!pattern`
/// re-includes something an earlier line excluded. Paths are always relative
/// to the snapshot root.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    matcher: Gitignore,
}

impl Default for ExclusionMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

impl ExclusionMatcher {
    /// A matcher that excludes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            matcher: Gitignore::empty(),
        }
    }

    /// Builds a matcher from pattern lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExclusionPattern`] if a pattern is not a valid glob.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_sources(None, patterns)
    }

    /// Builds a matcher from the lines of `file` (if any) followed by `patterns`.
    ///
    /// Blank lines and `#` comments in the file are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExclusionPattern`] if the file cannot be read or a
    /// pattern is not a valid glob.
    pub fn from_sources<I, S>(file: Option<&Path>, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new("/");

        if let Some(file) = file {
            let content = fs::read_to_string(file)
                .map_err(|e| Error::ExclusionPattern(format!("{}: {e}", file.display())))?;
            for line in content.lines() {
                builder
                    .add_line(Some(file.to_path_buf()), line)
                    .map_err(|e| Error::ExclusionPattern(e.to_string()))?;
            }
        }

        for pattern in patterns {
            builder
                .add_line(None, pattern.as_ref())
                .map_err(|e| Error::ExclusionPattern(e.to_string()))?;
        }

        let matcher = builder
            .build()
            .map_err(|e| Error::ExclusionPattern(e.to_string()))?;

        Ok(Self { matcher })
    }

    /// Number of active patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matcher.num_ignores() as usize + self.matcher.num_whitelists() as usize
    }

    /// Whether no pattern was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    /// Whether the entry named by `segments` is excluded.
    ///
    /// An entry below an excluded directory is excluded as well.
    #[must_use]
    pub fn matches(&self, segments: &[&str], is_dir: bool) -> bool {
        if self.is_empty() || segments.is_empty() {
            return false;
        }
        let path: PathBuf = segments.iter().collect();
        self.matcher
            .matched_path_or_any_parents(&path, is_dir)
            .is_ignore()
    }

    /// [`matches`](Self::matches) for a `/`-joined relative path.
    #[must_use]
    pub fn matches_path(&self, path: &str, is_dir: bool) -> bool {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.matches(&segments, is_dir)
    }
}
