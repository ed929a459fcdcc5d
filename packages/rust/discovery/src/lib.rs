//! Glob-based file discovery.
//!
//! Resolves user globs into a deduplicated list of files, dropping anything
//! matched by an exclusion glob and, optionally, files whose content does or
//! does not match given regexes.

mod pattern;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use mdcc_shared::{PatternList, Result};

pub use pattern::{ExcludeSet, compile, has_wildcard, walk_root};

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Inputs for [`find_matching_files`].
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Globs (or literal paths) selecting candidate files.
    pub globs: Vec<String>,
    /// Globs removing candidates; bare names match the file name only.
    pub exclude_globs: Vec<String>,
    /// Every pattern must match somewhere in a kept file.
    pub file_contains: PatternList,
    /// No pattern may match anywhere in a kept file.
    pub file_not_contains: PatternList,
}

impl DiscoveryOptions {
    fn filters_content(&self) -> bool {
        !self.file_contains.is_empty() || !self.file_not_contains.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Resolve globs into files, in first-discovery order.
///
/// Directory walks are sorted by file name so output is deterministic.
/// `.git` directories are never descended into.
#[instrument(skip_all, fields(globs = opts.globs.len()))]
pub fn find_matching_files(opts: &DiscoveryOptions) -> Result<Vec<PathBuf>> {
    let excludes = ExcludeSet::new(&opts.exclude_globs)?;
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files: Vec<PathBuf> = Vec::new();

    for glob in &opts.globs {
        for candidate in expand_glob(glob)? {
            if excludes.is_excluded(&candidate) {
                debug!(path = %candidate.display(), "excluded by glob");
                continue;
            }
            if !seen.insert(candidate.clone()) {
                continue;
            }
            if opts.filters_content() && !content_allowed(&candidate, opts) {
                continue;
            }
            files.push(candidate);
        }
    }

    info!(count = files.len(), "files discovered");
    Ok(files)
}

/// Expand one glob into candidate files (no exclusion or content filtering).
fn expand_glob(glob: &str) -> Result<Vec<PathBuf>> {
    if !has_wildcard(glob) {
        let path = PathBuf::from(glob);
        if path.is_file() {
            return Ok(vec![path]);
        }
        if path.is_dir() {
            return walk_matching(&path, None);
        }
        warn!(path = glob, "no such file");
        return Ok(Vec::new());
    }

    let matcher = compile(glob)?;
    walk_matching(&walk_root(glob), Some(&matcher))
}

fn walk_matching(root: &Path, matcher: Option<&globset::GlobMatcher>) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = strip_dot_prefix(entry.path());
        let is_match = matcher.is_none_or(|m| {
            m.is_match(pattern::normalize(&path.to_string_lossy()))
        });
        if is_match {
            out.push(path);
        }
    }

    Ok(out)
}

fn strip_dot_prefix(path: &Path) -> PathBuf {
    path.strip_prefix(".").unwrap_or(path).to_path_buf()
}

fn content_allowed(path: &Path, opts: &DiscoveryOptions) -> bool {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable file skipped");
            return false;
        }
    };
    let text = String::from_utf8_lossy(&bytes);
    opts.file_contains.all_match(&text) && !opts.file_not_contains.is_match(&text)
}
