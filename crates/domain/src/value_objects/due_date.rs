use crate::errors::DomainError;
use chrono::NaiveDate;

/// Converts a `yyyy-mm-dd` date into Unix seconds at midnight UTC.
///
/// An empty string means "no due date" and yields `0`.
///
/// # Errors
/// Returns [`DomainError::InvalidDueDate`] if the date does not parse or lies
/// before the Unix epoch.
pub fn due_date_from_iso(date: &str) -> Result<u64, DomainError> {
    let date = date.trim();
    if date.is_empty() {
        return Ok(0);
    }

    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| DomainError::InvalidDueDate(date.to_string()))?;
    let secs = parsed
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| DomainError::InvalidDueDate(date.to_string()))?;

    u64::try_from(secs).map_err(|_| DomainError::InvalidDueDate(date.to_string()))
}
