//! Compiled regular-expression lists used for file and line filtering.

use regex::Regex;

use crate::error::{MdccError, Result};

/// An ordered list of compiled regexes with "any of" matching semantics.
///
/// Order never changes the outcome, only how soon [`PatternList::is_match`]
/// can stop.
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Regex>,
}

impl PatternList {
    /// Compile every pattern, failing on the first invalid one.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|source| MdccError::Pattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if at least one pattern matches somewhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    /// True if every pattern matches somewhere in `text` (vacuously true when empty).
    pub fn all_match(&self, text: &str) -> bool {
        self.patterns.iter().all(|re| re.is_match(text))
    }

    /// Source strings of the compiled patterns.
    pub fn as_strs(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }
}

impl From<Vec<Regex>> for PatternList {
    fn from(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }
}
