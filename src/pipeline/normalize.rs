//! Cleaning of locale-inconsistent numeric and date cells.
//!
//! Every function here is lossy on purpose: a cell that cannot be read
//! becomes zero (or a null date) instead of an error or a dropped row. The
//! source tables are never modified; each call returns a fresh column.

use chrono::{NaiveDate, NaiveDateTime};

use crate::loader::RawTable;

/// How commas inside a numeric cell are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumericRule {
    /// `"1,5"` means 1.5.
    pub decimal_comma: bool,
    /// `"1,234"` means 1234.
    pub thousands_comma: bool,
}

impl NumericRule {
    /// Point decimals, commas left alone (and therefore unparseable).
    pub const PLAIN: Self = Self {
        decimal_comma: false,
        thousands_comma: false,
    };
    pub const DECIMAL_COMMA: Self = Self {
        decimal_comma: true,
        thousands_comma: false,
    };
    pub const THOUSANDS_COMMA: Self = Self {
        decimal_comma: false,
        thousands_comma: true,
    };
}

/// Parses one cell into a finite float, falling back to 0.0.
///
/// The decimal-comma rewrite runs before the thousands-comma strip, so a rule
/// with both flags set behaves as decimal-comma.
pub fn clean_number(raw: &str, rule: NumericRule) -> f64 {
    let mut text = raw.trim().to_string();
    if rule.decimal_comma {
        text = text.replace(',', ".");
    }
    if rule.thousands_comma {
        text = text.replace(',', "");
    }
    if text == "nan" {
        return 0.0;
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Like [`clean_number`], truncated toward zero.
pub fn clean_integer(raw: &str, rule: NumericRule) -> i64 {
    clean_number(raw, rule).trunc() as i64
}

/// Cleans column `name` of `table`. An absent column yields all zeros.
pub fn numeric_column(table: &RawTable, name: &str, rule: NumericRule) -> Vec<f64> {
    match table.column(name) {
        Some(cells) => cells.into_iter().map(|c| clean_number(c, rule)).collect(),
        None => vec![0.0; table.len()],
    }
}

/// Integer variant of [`numeric_column`].
pub fn integer_column(table: &RawTable, name: &str, rule: NumericRule) -> Vec<i64> {
    match table.column(name) {
        Some(cells) => cells.into_iter().map(|c| clean_integer(c, rule)).collect(),
        None => vec![0; table.len()],
    }
}

/// Reads a coordinate-like cell, keeping "missing" distinct from zero.
pub fn optional_number(raw: &str, rule: NumericRule) -> Option<f64> {
    let text = raw.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        return None;
    }
    let text = if rule.decimal_comma {
        text.replace(',', ".")
    } else {
        text.to_string()
    };
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a date cell; unreadable values become `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parses column `name` as dates. An absent column yields all `None`.
pub fn date_column(table: &RawTable, name: &str) -> Vec<Option<NaiveDate>> {
    match table.column(name) {
        Some(cells) => cells.into_iter().map(parse_date).collect(),
        None => vec![None; table.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_comma() {
        assert_eq!(clean_number("1,5", NumericRule::DECIMAL_COMMA), 1.5);
        assert_eq!(clean_number(" 0,25 ", NumericRule::DECIMAL_COMMA), 0.25);
    }

    #[test]
    fn test_thousands_comma() {
        assert_eq!(clean_number("1,234", NumericRule::THOUSANDS_COMMA), 1234.0);
        assert_eq!(clean_number("12,345,678.5", NumericRule::THOUSANDS_COMMA), 12345678.5);
    }

    #[test]
    fn test_nan_literal_is_zero() {
        assert_eq!(clean_number("nan", NumericRule::PLAIN), 0.0);
        assert_eq!(clean_number("NaN", NumericRule::PLAIN), 0.0);
        assert_eq!(clean_integer("nan", NumericRule::PLAIN), 0);
    }

    #[test]
    fn test_unparseable_is_zero() {
        assert_eq!(clean_number("", NumericRule::PLAIN), 0.0);
        assert_eq!(clean_number("n/a", NumericRule::PLAIN), 0.0);
        assert_eq!(clean_number("KM Traveled", NumericRule::PLAIN), 0.0);
        // A plain rule does not understand commas at all.
        assert_eq!(clean_number("1,5", NumericRule::PLAIN), 0.0);
    }

    #[test]
    fn test_non_finite_is_zero() {
        assert_eq!(clean_number("inf", NumericRule::PLAIN), 0.0);
        assert_eq!(clean_number("-infinity", NumericRule::PLAIN), 0.0);
        assert_eq!(clean_number("1e400", NumericRule::PLAIN), 0.0);
    }

    #[test]
    fn test_integer_truncates() {
        assert_eq!(clean_integer("12.9", NumericRule::PLAIN), 12);
        assert_eq!(clean_integer("-3.7", NumericRule::PLAIN), -3);
        assert_eq!(clean_integer("450", NumericRule::PLAIN), 450);
    }

    #[test]
    fn test_missing_column_is_all_zero() {
        let table = RawTable::from_strs(&["Fuel"], &[&["10"], &["20"], &["x"]]);
        assert_eq!(
            numeric_column(&table, "Liters", NumericRule::PLAIN),
            vec![0.0, 0.0, 0.0]
        );
        assert_eq!(integer_column(&table, "KM Traveled", NumericRule::PLAIN), vec![0, 0, 0]);
        assert_eq!(
            numeric_column(&table, "Fuel", NumericRule::PLAIN),
            vec![10.0, 20.0, 0.0]
        );
    }

    #[test]
    fn test_column_cleaning_is_pure() {
        let table = RawTable::from_strs(&["Net Revenue"], &[&["1,5"], &["nan"]]);
        let before = table.clone();
        let first = numeric_column(&table, "Net Revenue", NumericRule::DECIMAL_COMMA);
        let second = numeric_column(&table, "Net Revenue", NumericRule::DECIMAL_COMMA);
        assert_eq!(first, vec![1.5, 0.0]);
        assert_eq!(first, second);
        assert_eq!(table, before);
    }

    #[test]
    fn test_output_is_always_finite() {
        let cells = ["1", "-2.5", "nan", "inf", "NaN", "1,2,3", "", "abc", "1e309", "0x10"];
        for rule in [
            NumericRule::PLAIN,
            NumericRule::DECIMAL_COMMA,
            NumericRule::THOUSANDS_COMMA,
        ] {
            for cell in cells {
                assert!(clean_number(cell, rule).is_finite(), "{cell:?}");
            }
        }
    }

    #[test]
    fn test_optional_number() {
        assert_eq!(optional_number("-23,55", NumericRule::DECIMAL_COMMA), Some(-23.55));
        assert_eq!(optional_number("18.52", NumericRule::PLAIN), Some(18.52));
        assert_eq!(optional_number("", NumericRule::PLAIN), None);
        assert_eq!(optional_number("nan", NumericRule::PLAIN), None);
        assert_eq!(optional_number("north", NumericRule::PLAIN), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 7, 14);
        assert_eq!(parse_date("2023-07-14"), expected);
        assert_eq!(parse_date("14/07/2023"), expected);
        assert_eq!(parse_date("2023-07-14 08:30:00"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }
}
