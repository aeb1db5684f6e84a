//! Keeps player- and script-supplied text on one log line.

/// Longest preview of a single value that goes into a log line.
pub const MAX_LOG_PREVIEW: usize = 200;

/// Escape backslashes and control characters, and cut the result at
/// [`MAX_LOG_PREVIEW`] characters with an ellipsis.
pub fn escape_log(s: &str) -> String {
    escape_log_limited(s, MAX_LOG_PREVIEW)
}

pub fn escape_log_limited(s: &str, max: usize) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(s.len().min(max) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= max {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
