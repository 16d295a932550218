/*!
 * Utility functions for treedoc
 */

/// Replacement for characters a document sink cannot encode
pub const PLACEHOLDER: char = '?';

/// Format a human-readable file size
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// Whether `c` is printable ASCII (space through tilde)
pub fn is_printable_ascii(c: char) -> bool {
    matches!(c, ' '..='~')
}

/// Replace every character outside printable ASCII with `placeholder`
///
/// This is lossy on purpose: non-ASCII text, tabs and control characters all
/// collapse to the placeholder so that every sink can encode the result.
pub fn sanitize_line(line: &str, placeholder: char) -> String {
    line.chars()
        .map(|c| if is_printable_ascii(c) { c } else { placeholder })
        .collect()
}

/// Shorten a name for single-line status output, keeping its tail
pub fn truncate_for_display(name: &str, max_chars: usize) -> String {
    let count = name.chars().count();
    if count <= max_chars {
        return name.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let tail: String = name.chars().skip(count - keep).collect();
    format!("...{}", tail)
}
