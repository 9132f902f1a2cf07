use crate::model::CellValue;

/// Prefix of the synthetic label given to header cells with no text.
pub const UNNAMED_PLACEHOLDER: &str = "Unnamed:";

/// Outcome of coercing one cell's text.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Value(T),
    Blank,
    /// Non-blank text that did not parse; carries the trimmed text.
    Unparseable(String),
}

impl<T: Into<CellValue>> Parsed<T> {
    /// Typed cell for the report, falling back to the raw text.
    pub fn into_cell(self) -> CellValue {
        match self {
            Parsed::Value(v) => v.into(),
            Parsed::Blank => CellValue::Empty,
            Parsed::Unparseable(raw) => CellValue::Text(raw),
        }
    }
}

pub fn is_placeholder(s: &str) -> bool {
    s.trim().starts_with(UNNAMED_PLACEHOLDER)
}

/// Trimmed cell text, or `None` for blank and placeholder cells.
pub fn meaningful(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.is_empty() || is_placeholder(s) {
        None
    } else {
        Some(s)
    }
}

/// Parse an integer column value.
///
/// Handles formats like:
/// - "10" -> Value(10)
/// - "5012345678900" -> Value(5012345678900)
/// - "10.0" or "1e3" -> Value(10), Value(1000) (decimals are truncated)
/// - "N/A" -> Unparseable("N/A")
pub fn parse_integer(s: &str) -> Parsed<i64> {
    let Some(s) = meaningful(s) else {
        return Parsed::Blank;
    };

    if let Ok(i) = s.parse::<i64>() {
        return Parsed::Value(i);
    }

    match parse_finite(s) {
        Some(f) if f.abs() < i64::MAX as f64 => Parsed::Value(f.trunc() as i64),
        _ => Parsed::Unparseable(s.to_string()),
    }
}

/// Parse a floating-point column value such as a unit price.
pub fn parse_float(s: &str) -> Parsed<f64> {
    let Some(s) = meaningful(s) else {
        return Parsed::Blank;
    };

    match parse_finite(s) {
        Some(f) => Parsed::Value(f),
        None => Parsed::Unparseable(s.to_string()),
    }
}

/// Plain text column value.
pub fn parse_text(s: &str) -> CellValue {
    meaningful(s).map(CellValue::from).unwrap_or_default()
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}
