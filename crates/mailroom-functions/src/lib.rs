//! Mailroom Functions
//!
//! Stateless routines that live next to the message board: a leave-day
//! calculator whose every call is recorded to an [`ArgumentSink`], and a few
//! small list utilities.
//!
//! # TigerStyle
//!
//! - Argument ranges are explicit constants
//! - Invalid arguments are errors, never clamped

pub mod error;
pub mod lists;
pub mod working_time;

pub use error::{FunctionError, Result};
pub use lists::{odd_sum_pairs, sort, union};
pub use working_time::{
    available_days_off, ArgumentRecord, ArgumentSink, CsvSink, RecordingSink,
};
