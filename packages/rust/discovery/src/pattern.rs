//! Glob helpers: wildcard detection, walk roots, and compiled matchers.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use mdcc_shared::{MdccError, Result};

/// Characters that make a glob segment non-literal.
const WILDCARD_CHARS: &[char] = &['*', '?', '[', '{'];

/// True if `glob` contains any wildcard syntax.
pub fn has_wildcard(glob: &str) -> bool {
    glob.contains(WILDCARD_CHARS)
}

/// Normalize separators and drop a leading `./`.
pub fn normalize(path: &str) -> String {
    let mut value = path.replace('\\', "/");
    while let Some(rest) = value.strip_prefix("./") {
        value = rest.to_string();
    }
    value
}

/// The deepest directory that contains every possible match of `glob`.
///
/// `src/**/*.rs` walks `src`, `*.md` walks `.`, `/abs/dir/*.txt` walks `/abs/dir`.
pub fn walk_root(glob: &str) -> PathBuf {
    let glob = normalize(glob);
    let literal_end = glob.find(WILDCARD_CHARS).unwrap_or(glob.len());
    match glob[..literal_end].rfind('/') {
        Some(0) => PathBuf::from("/"),
        Some(slash) => PathBuf::from(&glob[..slash]),
        None => PathBuf::from("."),
    }
}

fn build_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(&normalize(pattern))
        .literal_separator(true)
        .build()
        .map_err(|e| MdccError::Discovery(format!("invalid glob '{pattern}': {e}")))
}

/// Compile a single glob where `*` stays within one path segment.
pub fn compile(pattern: &str) -> Result<GlobMatcher> {
    Ok(build_glob(pattern)?.compile_matcher())
}

/// Exclusion globs, split by whether they name a path or a bare file name.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    paths: GlobSet,
    names: GlobSet,
}

impl ExcludeSet {
    /// Globs without a `/` are matched against the file name alone.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut paths = GlobSetBuilder::new();
        let mut names = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = build_glob(pattern)?;
            if normalize(pattern).contains('/') {
                paths.add(glob);
            } else {
                names.add(glob);
            }
        }

        let build = |builder: GlobSetBuilder| {
            builder
                .build()
                .map_err(|e| MdccError::Discovery(format!("invalid exclude globs: {e}")))
        };

        Ok(Self {
            paths: build(paths)?,
            names: build(names)?,
        })
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        let normalized = normalize(&path.to_string_lossy());
        if self.paths.is_match(&normalized) {
            return true;
        }
        path.file_name()
            .is_some_and(|name| self.names.is_match(Path::new(name)))
    }
}
