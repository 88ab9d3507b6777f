//! Error types for pattern registration and control construction
//!
//! Only malformed configuration is an error. Dropped events, rejected
//! pick-up updates and ignored button triggers are normal operation and
//! never surface here.

use thiserror::Error;

/// A dispatcher pattern that does not fit the event schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPatternError {
    /// Field name is not part of any event type
    #[error("unknown event field '{0}'")]
    UnknownField(String),

    /// Event type name is not one of control_change, note_on, note_off
    #[error("unknown event type '{0}'")]
    UnknownType(String),

    /// Field exists in the schema but not for the type the pattern selects
    #[error("field '{field}' is not valid for event type '{event_type}'")]
    FieldNotInType {
        field: &'static str,
        event_type: &'static str,
    },

    /// Value has the wrong kind for the field (e.g. a number for `type`)
    #[error("field '{field}' expects {expected}")]
    WrongKind {
        field: &'static str,
        expected: &'static str,
    },

    /// Numeric value outside the field's range
    #[error("field '{field}' value {value} out of range 0..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        max: u8,
    },
}

/// Malformed continuous control bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRangeError {
    #[error("min_value {min} must be lower than max_value {max}")]
    EmptyRange { min: i32, max: i32 },

    #[error("initial value {value} outside {min}..={max}")]
    InitialOutOfRange { value: i32, min: i32, max: i32 },

    #[error("pick-up range must not be negative")]
    NegativePickUpRange,
}
