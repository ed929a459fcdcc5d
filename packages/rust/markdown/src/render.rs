//! Body rendering: line numbering and filtered, windowed output.

use crate::FormatOptions;
use crate::window::{is_removed, select_lines};

/// Prefix every line with its 1-based number.
pub fn number_lines(content: &str) -> String {
    content
        .split('\n')
        .enumerate()
        .map(|(index, line)| format!("{}: {line}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the selected lines of `content`, inserting a fence break between
/// disjoint context windows.
///
/// Breaks are only considered when a context radius was requested; with
/// `before == after == 0` disjoint matches are emitted back to back.
pub fn render_filtered(content: &str, opts: &FormatOptions, fence: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let selected = select_lines(&lines, &opts.include, opts.lines_before, opts.lines_after);
    if selected.is_empty() {
        return String::new();
    }

    let check_for_breaks = opts.lines_before + opts.lines_after > 0;
    let mut previous: Option<usize> = None;
    let mut output: Vec<String> = Vec::with_capacity(selected.len());

    for index in selected {
        let is_break = previous.is_some_and(|prev| index > prev + 1);
        if check_for_breaks && is_break {
            output.push(format!("{fence}\n\n{fence}"));
        }

        let line = lines[index];
        let removed = is_removed(line, &opts.remove);

        if opts.line_numbers {
            let number = index + 1;
            output.push(if removed {
                format!("{number}:")
            } else {
                format!("{number}: {line}")
            });
        } else if !removed {
            output.push(line.to_string());
        }

        previous = Some(index);
    }

    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdcc_shared::PatternList;

    fn opts(include: &[&str], remove: &[&str], before: usize, after: usize) -> FormatOptions {
        FormatOptions {
            include: PatternList::compile(include).unwrap(),
            remove: PatternList::compile(remove).unwrap(),
            lines_before: before,
            lines_after: after,
            line_numbers: false,
        }
    }

    #[test]
    fn numbers_every_line_including_trailing_empty() {
        assert_eq!(number_lines("a\nb\n"), "1: a\n2: b\n3: ");
    }

    #[test]
    fn context_example() {
        let out = render_filtered("a\nb\nc\nd\ne", &opts(&["c"], &[], 1, 1), "```");
        assert_eq!(out, "b\nc\nd");
    }

    #[test]
    fn gap_inserts_fence_break() {
        let content = (0..14).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let out = render_filtered(&content, &opts(&["^line(2|10)$"], &[], 1, 1), "```");
        assert_eq!(
            out,
            "line1\nline2\nline3\n```\n\n```\nline9\nline10\nline11"
        );
    }

    #[test]
    fn no_break_without_context_radius() {
        let out = render_filtered("x\nhit\ny\nz\nhit", &opts(&["hit"], &[], 0, 0), "```");
        assert_eq!(out, "hit\nhit");
    }

    #[test]
    fn break_uses_given_fence() {
        let out = render_filtered("m\n1\n2\n3\nm", &opts(&["m"], &[], 0, 1), "````");
        assert_eq!(out, "m\n1\n````\n\n````\nm");
    }

    #[test]
    fn removed_lines_numbered_or_dropped() {
        let content = "keep\n// drop\nkeep2";
        let mut o = opts(&[], &[r"^\s*//"], 0, 0);
        assert_eq!(render_filtered(content, &o, "```"), "keep\nkeep2");

        o.line_numbers = true;
        assert_eq!(render_filtered(content, &o, "```"), "1: keep\n2:\n3: keep2");
    }

    #[test]
    fn removed_line_inside_window_keeps_adjacency() {
        // Removed lines still count as emitted indices, so no break appears.
        let content = "a\n// gone\nmatch\nb";
        let out = render_filtered(content, &opts(&["match"], &["^//"], 1, 1), "```");
        assert_eq!(out, "match\nb");
    }

    #[test]
    fn nothing_selected_renders_empty() {
        let out = render_filtered("a\nb", &opts(&["zzz"], &[], 2, 2), "```");
        assert!(out.is_empty());
    }
}
