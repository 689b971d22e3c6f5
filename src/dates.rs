// Date normalization for the account_last_payment_date column

use thiserror::Error;

/// A non-empty date string that does not split into month/day/year.
///
/// This is recoverable by policy: callers log it and persist the field as
/// null instead of failing the record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date format: {input}")]
pub struct DateFormatError {
    pub input: String,
}

/// Normalize a free-width `M/D/YYYY` date into zero-padded `MM/DD/YYYY`.
///
/// Empty or missing input is not an error, the field is simply absent.
/// Anything non-empty must split into exactly three slash-separated
/// components.
pub fn normalize_date(raw: Option<&str>) -> Result<Option<String>, DateFormatError> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(None),
    };

    let parts: Vec<&str> = raw.split('/').collect();
    match parts.as_slice() {
        [month, day, year] => Ok(Some(format!("{:0>2}/{:0>2}/{}", month, day, year))),
        _ => Err(DateFormatError {
            input: raw.to_string(),
        }),
    }
}
