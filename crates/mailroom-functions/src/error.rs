//! Error types for the stateless routines
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use thiserror::Error;

/// Result type alias for function calls
pub type Result<T> = std::result::Result<T, FunctionError>;

/// Function error types
#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("Invalid argument: {name} = {value}, expected {min}..={max}")]
    InvalidArgument {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Argument sink failed: {0}")]
    Sink(#[from] std::io::Error),
}

impl FunctionError {
    /// Check a value against an inclusive range
    pub fn check_range(name: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
        debug_assert!(min <= max);
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(Self::InvalidArgument {
                name,
                value,
                min,
                max,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range_bounds_inclusive() {
        assert!(FunctionError::check_range("x", 20, 20, 40).is_ok());
        assert!(FunctionError::check_range("x", 40, 20, 40).is_ok());
        assert!(FunctionError::check_range("x", 41, 20, 40).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = FunctionError::check_range("hours_per_week", 19, 20, 40).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: hours_per_week = 19, expected 20..=40"
        );
    }
}
