use arrow::datatypes::DataType;

use crate::table::date_parser::{parse_datetime, DateOrder};
use crate::table::TIMESTAMP_TYPE;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a cell as a number. NaN is treated as missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    clean_str(raw).parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Infer Arrow dtype from a single non-empty cell.
pub fn infer_arrow_dtype_from_str(s: &str) -> DataType {
    let cleaned = clean_str(s);
    if cleaned.parse::<f64>().is_ok() {
        DataType::Float64
    } else if parse_datetime(&cleaned, DateOrder::MonthFirst).is_some() {
        TIMESTAMP_TYPE
    } else {
        DataType::Utf8
    }
}

/// Drop NaN and infinities, keeping a value only when it is a usable number.
pub fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
