/// `₱` followed by the value rounded to whole pesos with thousands separators.
pub fn format_peso(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-₱{grouped}")
    } else {
        format!("₱{grouped}")
    }
}

/// Keep at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_peso(0.0), "₱0");
        assert_eq!(format_peso(999.0), "₱999");
        assert_eq!(format_peso(1000.0), "₱1,000");
        assert_eq!(format_peso(1_234_567.4), "₱1,234,567");
        assert_eq!(format_peso(-2500.0), "-₱2,500");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("₱1,234,567,890", 6), "₱1,234");
        assert_eq!(truncate_chars("short", 15), "short");
    }
}
