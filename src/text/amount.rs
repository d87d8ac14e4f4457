//! Spanish-format amount parsing

/// Currency words stripped from the end of an amount before parsing
const CURRENCY_SUFFIXES: &[&str] = &["euros", "euro", "eur", "€"];

/// Parse a Spanish-formatted amount (`1.234.567,89 euros`) into a float
///
/// `.` is a thousands separator and `,` the decimal separator. Returns `None`
/// when the cleaned string is not a plain number: callers treat a missing
/// amount as unknown, never as zero.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut text = raw.trim().to_string();

    loop {
        let lower = text.to_lowercase();
        let stripped = CURRENCY_SUFFIXES
            .iter()
            .find(|suffix| lower.ends_with(*suffix))
            .and_then(|suffix| text.get(..text.len().saturating_sub(suffix.len())))
            .map(|head| head.trim_end().to_string());
        match stripped {
            Some(shorter) => text = shorter,
            None => break,
        }
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let digits = cleaned.trim_start_matches(['-', '+']);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spanish_amounts() {
        assert_eq!(parse_amount("1.234.567,89"), Some(1234567.89));
        assert_eq!(parse_amount("5.785,12 euros"), Some(5785.12));
        assert_eq!(parse_amount("3.000,00 Euros"), Some(3000.0));
        assert_eq!(parse_amount("200000"), Some(200000.0));
        assert_eq!(parse_amount(" 12,5 € "), Some(12.5));
    }

    #[test]
    fn test_non_numeric_amounts_fail() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("euros"), None);
        assert_eq!(parse_amount("no consta"), None);
        assert_eq!(parse_amount("1e5"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("1,2,3"), None);
    }
}
