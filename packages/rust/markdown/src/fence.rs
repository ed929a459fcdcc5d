//! Code fence sizing for embedded file content.

use std::path::Path;

/// Shortest legal backtick fence.
pub const MIN_FENCE_LEN: usize = 3;

/// Length of the longest run of consecutive backticks in `content`.
pub fn longest_backtick_run(content: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in content.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Fence length that cannot be closed early by anything inside `content`.
pub fn required_fence_length(content: &str) -> usize {
    MIN_FENCE_LEN.max(longest_backtick_run(content) + 1)
}

/// Markdown files can themselves contain fences, so only they get a sized fence.
pub fn is_fence_aware(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// The fence string used to wrap `content` from `file_name`.
pub fn fence_for(file_name: &str, content: &str) -> String {
    let len = if is_fence_aware(file_name) {
        required_fence_length(content)
    } else {
        MIN_FENCE_LEN
    };
    "`".repeat(len)
}
