//! Small text helpers shared across crates.

/// Char-boundary-safe prefix of at most `max` chars.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate and append a marker when the text was actually cut.
pub fn truncate_with_marker(text: &str, max: usize, marker: &str) -> String {
    if text.chars().count() > max {
        format!("{}{}", truncate_chars(text, max), marker)
    } else {
        text.to_string()
    }
}

/// Render an integer with thousands separators ("12,345").
pub fn format_thousands(n: i64) -> String {
    let raw = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    let offset = raw.len() % 3;
    for (i, c) in raw.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_truncate_with_marker() {
        assert_eq!(truncate_with_marker("abcdef", 3, "..."), "abc...");
        assert_eq!(truncate_with_marker("abc", 3, "..."), "abc");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-4200), "-4,200");
        assert_eq!(
            format_thousands(i64::MIN),
            "-9,223,372,036,854,775,808"
        );
    }
}
