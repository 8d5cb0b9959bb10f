use thiserror::Error;

/// Errors raised while building domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The address is not `0x` followed by 40 hex digits.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// The date is not in `yyyy-mm-dd` form.
    #[error("invalid due date {0:?}, expected yyyy-mm-dd")]
    InvalidDueDate(String),
}

/// A raw task record that cannot be turned into a [`crate::Task`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// The `id` field is missing or does not coerce to a non-negative integer.
    #[error("task #{index}: id {value} is not a non-negative integer")]
    InvalidId {
        /// Position of the record in the returned list.
        index: usize,
        /// The offending value, rendered as JSON.
        value: String,
    },
    /// Any other field holds a value of the wrong type.
    #[error("task #{index}: field `{field}` has unexpected value {value}")]
    InvalidField {
        /// Position of the record in the returned list.
        index: usize,
        /// Field name.
        field: &'static str,
        /// The offending value, rendered as JSON.
        value: String,
    },
}
