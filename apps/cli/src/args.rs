//! `@file` / `@@file` argument expansion and `--` group splitting.
//!
//! `@path` becomes the file's content as one argument; `@@path` becomes one
//! argument per non-empty line. Tokens naming a missing file pass through.

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};

/// Expand every argument after the program name.
pub(crate) fn expand_at_args<I>(args: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let mut out: Vec<String> = iter.next().into_iter().collect();

    for arg in iter {
        if let Some(path) = arg.strip_prefix("@@").filter(|p| Path::new(p).is_file()) {
            let content = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read argument file '{path}'"))?;
            out.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from),
            );
        } else if let Some(path) = arg.strip_prefix('@').filter(|p| Path::new(p).is_file()) {
            let content = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read argument file '{path}'"))?;
            out.push(content.trim_end_matches(['\r', '\n']).to_string());
        } else {
            out.push(arg);
        }
    }

    Ok(out)
}

/// Group separator token.
pub(crate) const GROUP_SEPARATOR: &str = "--";

/// Split expanded arguments into groups at each `--`.
///
/// The first group keeps the program name. Empty groups after the first
/// (repeated or trailing separators) are dropped.
pub(crate) fn split_groups(args: Vec<String>) -> Vec<Vec<String>> {
    let mut groups = vec![Vec::new()];
    for arg in args {
        if arg == GROUP_SEPARATOR {
            groups.push(Vec::new());
        } else if let Some(current) = groups.last_mut() {
            current.push(arg);
        }
    }

    let mut iter = groups.into_iter();
    let first = iter.next().unwrap_or_default();
    std::iter::once(first)
        .chain(iter.filter(|group| !group.is_empty()))
        .collect()
}
