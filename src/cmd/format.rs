/*!
format.rs

Human-output helpers for `relay` (JSON paths never go through here).

  - StyleOptions::detect()     colour on unless NO_COLOR; width from COLUMNS
  - color(role, text, &style)  ANSI role colouring
  - header(title, sub, &style) one-line boxed header
  - table(headers, rows, &style)
  - truncate_ellipsis(s, n)

Functions return strings; callers decide where to print.
*/

use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let term_width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        Self {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            term_width,
        }
    }

    /// No colour, fixed width. Used by tests and piped output.
    pub fn plain(term_width: usize) -> Self {
        Self {
            use_color: false,
            term_width,
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

/// `┌──┐ │ title  sub │ └──┘` sized to its content (capped by terminal width).
pub fn header(title: impl AsRef<str>, sub: Option<&str>, style: &StyleOptions) -> String {
    let plain = match sub {
        Some(s) => format!("{}  {s}", title.as_ref()),
        None => title.as_ref().to_string(),
    };
    let max_inner = style.term_width.saturating_sub(4).max(10);
    let plain = truncate_ellipsis(&plain, max_inner);
    let inner_width = display_width(&plain);

    let styled = match sub {
        Some(s) if plain.ends_with(s) => {
            let head = &plain[..plain.len() - s.len()];
            format!(
                "{}{}",
                color(Role::Primary, head, style),
                color(Role::Secondary, s, style)
            )
        }
        _ => color(Role::Primary, &plain, style),
    };

    let bar = "─".repeat(inner_width + 2);
    format!("┌{bar}┐\n│ {styled} │\n└{bar}┘")
}

/// Column-aligned table; the widest columns shrink first when the total
/// would exceed the terminal width.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    const GAP: usize = 2;
    const MIN_COL: usize = 3;

    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let total = widths.iter().sum::<usize>() + GAP * (cols - 1);
    if total > style.term_width {
        let mut overflow = total - style.term_width;
        let mut by_width: Vec<usize> = (0..cols).collect();
        by_width.sort_by(|a, b| widths[*b].cmp(&widths[*a]));
        for idx in by_width {
            if overflow == 0 {
                break;
            }
            let spare = widths[idx].saturating_sub(MIN_COL);
            let cut = spare.min(overflow);
            widths[idx] -= cut;
            overflow -= cut;
        }
    }

    let sep = " ".repeat(GAP);
    let mut lines = Vec::with_capacity(rows.len() + 2);

    let head: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| color(Role::Accent, fit(h, widths[i]), style))
        .collect();
    lines.push(head.join(&sep).trim_end().to_string());

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    lines.push(color(Role::Dim, rule.join(&sep), style));

    for row in rows {
        let cells: Vec<String> = (0..cols)
            .map(|c| fit(row.get(c).map(String::as_str).unwrap_or(""), widths[c]))
            .collect();
        lines.push(cells.join(&sep).trim_end().to_string());
    }

    lines.join("\n")
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

fn fit(s: &str, width: usize) -> String {
    let plain = strip_ansi(s);
    let len = plain.chars().count();
    if len > width {
        return truncate_ellipsis(&plain, width);
    }
    format!("{s}{}", " ".repeat(width - len))
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for t in chars.by_ref() {
                if t.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_columns() {
        let style = StyleOptions::plain(80);
        let t = table(
            &["NAME", "CATEGORY"],
            &[
                vec!["cache:flush".into(), "cache".into()],
                vec!["ns:create".into(), "namespace".into()],
            ],
            &style,
        );
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "NAME         CATEGORY");
        assert_eq!(lines[2], "cache:flush  cache");
        assert_eq!(lines[3], "ns:create    namespace");
    }

    #[test]
    fn table_shrinks_wide_columns() {
        let style = StyleOptions::plain(40);
        let long = "x".repeat(80);
        let t = table(&["A", "B"], &[vec!["short".into(), long]], &style);
        assert!(t.lines().all(|l| l.chars().count() <= 40));
        assert!(t.contains('…'));
    }

    #[test]
    fn header_contains_title() {
        let style = StyleOptions::plain(80);
        let h = header("Commands (3)", Some("category=system"), &style);
        assert!(h.contains("Commands (3)  category=system"));
        assert_eq!(h.lines().count(), 3);
    }

    #[test]
    fn truncate() {
        assert_eq!(truncate_ellipsis("abcdef", 4), "abc…");
        assert_eq!(truncate_ellipsis("abc", 4), "abc");
    }

    #[test]
    fn strip_ansi_removes_codes() {
        assert_eq!(strip_ansi("\x1b[31mRED\x1b[0m"), "RED");
    }

    #[test]
    fn color_respects_style() {
        let plain = StyleOptions::plain(80);
        assert_eq!(color(Role::Error, "x", &plain), "x");
        let colored = StyleOptions {
            use_color: true,
            term_width: 80,
        };
        assert!(color(Role::Error, "x", &colored).starts_with("\x1b["));
    }
}
