//! Small formatting helpers for article and profile views.

/// Formats North American numbers for display; anything else is returned trimmed.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        11 if digits.starts_with('1') => {
            format!("+1 ({}) {}-{}", &digits[1..4], &digits[4..7], &digits[7..])
        }
        _ => raw.trim().to_string(),
    }
}

/// Percentage of the article scrolled past, clamped to `0.0..=100.0`. Non-finite
/// measurements report `0.0`.
pub fn reading_progress(scroll_top: f64, scroll_height: f64, viewport_height: f64) -> f64 {
    if ![scroll_top, scroll_height, viewport_height]
        .iter()
        .all(|v| v.is_finite())
    {
        return 0.0;
    }
    let scrollable = scroll_height - viewport_height;
    if scrollable <= 0.0 {
        return 100.0;
    }
    (scroll_top / scrollable * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
#[path = "tests/display_tests.rs"]
mod tests;
