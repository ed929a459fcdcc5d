//! Per-file Markdown block formatting.
//!
//! Turns a file's raw bytes into a `## <name>` section with the content
//! embedded in a code fence. Content can be narrowed to matching lines plus
//! context windows, stripped of unwanted lines, and line-numbered.

pub mod fence;
pub mod render;
pub mod window;

use std::path::Path;

use tracing::{debug, instrument, warn};

use mdcc_shared::{MdccError, PatternList, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options controlling how a single file's content is rendered.
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    /// Lines matching any of these anchor a context window.
    pub include: PatternList,
    /// Lines matching any of these are dropped from output.
    pub remove: PatternList,
    /// Context lines kept before each anchor.
    pub lines_before: usize,
    /// Context lines kept after each anchor.
    pub lines_after: usize,
    /// Prefix emitted lines with `N: `.
    pub line_numbers: bool,
}

impl FormatOptions {
    /// True when content goes through line selection rather than verbatim.
    pub fn filters_content(&self) -> bool {
        !self.include.is_empty() || !self.remove.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Heuristic binary check: any NUL byte.
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.contains(&0)
}

/// Header emitted in place of a block when the file could not be read.
pub fn error_block(file_name: &str, error: &MdccError) -> String {
    format!("## {file_name} - Error reading file: {error}\n\n")
}

/// Format already-loaded file bytes into a Markdown block.
///
/// Binary content keeps the header and fences around an empty body.
/// Invalid UTF-8 is an error.
pub fn format_bytes(file_name: &str, bytes: &[u8], opts: &FormatOptions) -> Result<String> {
    if is_binary(bytes) {
        debug!(file = file_name, "binary content, emitting empty body");
        let fence = fence::fence_for(file_name, "");
        return Ok(format!("## {file_name}\n\n{fence}\n\n{fence}\n"));
    }

    let text = std::str::from_utf8(bytes).map_err(|_| MdccError::Decode {
        path: file_name.into(),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let fence = fence::fence_for(file_name, text);

    let body = if opts.filters_content() {
        render::render_filtered(text, opts, &fence)
    } else if opts.line_numbers {
        render::number_lines(text)
    } else {
        text.to_string()
    };

    Ok(format!("## {file_name}\n\n{fence}\n{body}\n{fence}\n"))
}

/// Read `path` and format it, rendering any read or decode failure inline.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn format_file(path: &Path, opts: &FormatOptions) -> String {
    let file_name = path.display().to_string();

    let result = std::fs::read(path)
        .map_err(|e| MdccError::io(path, e))
        .and_then(|bytes| format_bytes(&file_name, &bytes, opts));

    match result {
        Ok(block) => block,
        Err(e) => {
            warn!(error = %e, "failed to read file");
            error_block(&file_name, &e)
        }
    }
}

/// Compile include/remove pattern strings into [`FormatOptions`].
pub fn build_options<S: AsRef<str>>(
    include: &[S],
    remove: &[S],
    lines_before: usize,
    lines_after: usize,
    line_numbers: bool,
) -> Result<FormatOptions> {
    Ok(FormatOptions {
        include: PatternList::compile(include)?,
        remove: PatternList::compile(remove)?,
        lines_before,
        lines_after,
        line_numbers,
    })
}
