//! Shared utility functions used across the codebase.

use std::io::{self, Write};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Width of the `=` rules framing console reports.
pub const RULE_WIDTH: usize = 60;

/// Parse a boolean flag value.
///
/// Recognises `1`, `true`, `yes`, `y`, `on` (case-insensitive) as `true`;
/// everything else maps to `false`.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Install the diagnostics subscriber.
///
/// Diagnostics always go to stderr: stdout carries the JSON log lines and the
/// final result that the calling application parses.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crew_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Return at most `max_chars` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Write a horizontal rule made of `ch`.
pub fn write_rule(out: &mut dyn Write, ch: char) -> io::Result<()> {
    writeln!(out, "{}", ch.to_string().repeat(RULE_WIDTH))
}

/// Write `title` framed by two `=` rules.
pub fn write_banner(out: &mut dyn Write, title: &str) -> io::Result<()> {
    write_rule(out, '=')?;
    writeln!(out, "{}", title)?;
    write_rule(out, '=')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("perché sì", 6), "perché");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for yes in ["1", "true", "TRUE", " yes ", "y", "On"] {
            assert!(parse_bool(yes), "{yes}");
        }
        for no in ["0", "false", "", "enabled"] {
            assert!(!parse_bool(no), "{no}");
        }
    }

    #[test]
    fn banner_frames_title() {
        let mut out = Vec::new();
        write_banner(&mut out, "TEST SUMMARY").unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "=".repeat(RULE_WIDTH));
        assert_eq!(lines[1], "TEST SUMMARY");
    }
}
