//! Row-level classification helpers.
//!
//! These are deliberately booleans and Options, not errors: junk cells are
//! expected in the source data and get filtered, while anything that should
//! abort a run travels through the stage error path instead.

/// A usable name is non-empty after trimming and free of control characters.
pub fn is_valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && !trimmed.chars().any(|c| c.is_control())
}

/// Source-assigned identifier. None when the cell is absent or junk.
pub fn parse_id(field: Option<&str>) -> Option<i64> {
    field.and_then(|s| s.trim().parse::<i64>().ok())
}

pub fn parse_year(field: Option<&str>) -> Option<i32> {
    field.and_then(|s| s.trim().parse::<i32>().ok())
}

/// Lenient float for optional dimension cells. Accepts a comma decimal
/// separator, which some exports use.
pub fn parse_float(field: Option<&str>) -> Option<f64> {
    field.and_then(|s| {
        let normalized = s.trim().replace(',', ".");
        normalized.parse::<f64>().ok()
    })
}

pub fn parse_int(field: Option<&str>) -> Option<i64> {
    field.and_then(|s| s.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("Audi"));
        assert!(is_valid_name("  Mercedes-Benz  "));
        assert!(is_valid_name("ВАЗ (Lada)"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("   "));
        assert!(!is_valid_name("Au\x00di"));
        assert!(!is_valid_name("bad\tname"));
        assert!(!is_valid_name("two\nlines"));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some("42")), Some(42));
        assert_eq!(parse_id(Some(" 42 ")), Some(42));
        assert_eq!(parse_id(Some("abc")), None);
        assert_eq!(parse_id(Some("")), None);
        assert_eq!(parse_id(None), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float(Some("5.5")), Some(5.5));
        assert_eq!(parse_float(Some("5,5")), Some(5.5));
        assert_eq!(parse_float(Some("112")), Some(112.0));
        assert_eq!(parse_float(Some("n/a")), None);
        assert_eq!(parse_float(None), None);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(Some("2021")), Some(2021));
        assert_eq!(parse_year(Some("21st")), None);
    }
}
