//! Human-output formatting: ANSI role colors, emoji, box headers, tables.
//!
//! Honors NO_COLOR and NO_EMOJI; width comes from COLUMNS (clamped) with a
//! sane default. JSON output paths must not use these helpers so machine
//! output stays clean.

use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width: width,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Warning,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Warning => "38;5;214",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "warn" => "⚠",
        "info" => "ℹ",
        "movie" => "🎬",
        "masks" => "🎭",
        "ticket" => "🎟",
        "robot" => "🤖",
        "tool" => "🛠",
        _ => "",
    }
}

/// A single-line boxed header with an optional dim subtitle line.
pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let title = title.as_ref();
    let sub = subtitle.as_ref().map(|s| s.as_ref());

    let inner = match sub {
        Some(s) => format!(
            "{}  {}",
            color(Role::Primary, title, style),
            color(Role::Secondary, s, style)
        ),
        None => color(Role::Primary, title, style),
    };

    let content_len = display_width(&inner);
    let max_inner = style.term_width.saturating_sub(4).max(16);
    let width = content_len.min(max_inner);

    let mut lines = Vec::with_capacity(3);
    lines.push(format!("┌{}┐", "─".repeat(width + 2)));
    for row in wrap_text(&inner, width) {
        let pad = width.saturating_sub(display_width(&row));
        lines.push(format!("│ {row}{} │", " ".repeat(pad)));
    }
    lines.push(format!("└{}┘", "─".repeat(width + 2)));
    lines.join("\n")
}

/// Render a plain aligned table with a separator under the header row.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    // Greedy shrink of the widest columns when the row would overflow.
    let mut total: usize = widths.iter().sum::<usize>() + (cols - 1) * 2;
    while total > style.term_width {
        let Some((widest, _)) = widths
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|&(_, w)| w)
            .filter(|&(_, w)| w > 4)
        else {
            break;
        };
        widths[widest] -= 1;
        total -= 1;
    }

    let mut out = String::new();
    for (i, h) in headers.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push_str(&color(Role::Accent, pad_or_truncate(h, widths[i]), style));
    }
    out.push('\n');

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&color(Role::Dim, sep.join("  "), style));

    for row in rows {
        out.push('\n');
        for c in 0..cols {
            if c > 0 {
                out.push_str("  ");
            }
            let raw = row.get(c).map(|s| s.as_str()).unwrap_or("");
            out.push_str(&pad_or_truncate(raw, widths[c]));
        }
    }
    out
}

fn pad_or_truncate(s: &str, width: usize) -> String {
    let len = display_width(s);
    if len <= width {
        return format!("{s}{}", " ".repeat(width - len));
    }
    if width <= 1 {
        return "…".to_string();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    out
}

pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && display_width(&current) + display_width(word) + 1 > max_width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c2 in chars.by_ref() {
                if c2.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_style() -> StyleOptions {
        StyleOptions {
            use_color: false,
            use_emoji: false,
            term_width: 80,
        }
    }

    #[test]
    fn box_header_contains_title() {
        let b = box_header("Movies (2)", Some("target=self"), &plain_style());
        assert!(b.contains("Movies (2)"));
        assert!(b.contains("┌"));
    }

    #[test]
    fn table_aligns_columns() {
        let t = table(
            &["ID", "NAME"],
            &[
                vec!["show001".into(), "Inception".into()],
                vec!["s2".into(), "Jawan".into()],
            ],
            &plain_style(),
        );
        assert!(t.contains("show001"));
        assert!(t.contains("Jawan"));
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn truncation_adds_ellipsis() {
        assert_eq!(pad_or_truncate("abcdef", 4), "abc…");
        assert_eq!(pad_or_truncate("ab", 4), "ab  ");
    }

    #[test]
    fn wrap_text_splits_long_lines() {
        let lines = wrap_text("hello world from formatting", 10);
        assert!(lines.len() >= 2);
    }

    #[test]
    fn strip_ansi_removes_codes() {
        assert_eq!(strip_ansi("\x1b[31mRED\x1b[0m"), "RED");
    }
}
