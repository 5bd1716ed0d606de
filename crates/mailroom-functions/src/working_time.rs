//! Leave-day calculator
//!
//! TigerStyle: Every call is recorded, including rejected ones.

use crate::error::{FunctionError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::debug;

// =============================================================================
// Limits
// =============================================================================

pub const HOURS_PER_WEEK_MIN: i32 = 20;
pub const HOURS_PER_WEEK_MAX: i32 = 40;
pub const WORKED_DAYS_COUNT_MAX: i32 = 200;
pub const OVERTIME_HOURS_MAX: i32 = 22;

/// Hours in a full-time week; `hours_per_week / 40` is the employment level
const FULL_TIME_HOURS_PER_WEEK: f64 = 40.0;
const HOURS_PER_DAY: f64 = 8.0;
const DAYS_PER_WEEK: f64 = 5.0;
const OVERTIME_FACTOR: f64 = 1.5;

// =============================================================================
// Argument Sinks
// =============================================================================

/// One calculator call: its arguments and, if valid, its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentRecord {
    pub hours_per_week: i32,
    pub worked_days: i32,
    pub overtime_hours: i32,
    pub result: Option<f64>,
}

impl ArgumentRecord {
    /// `hours,days,overtime,result`, with `-1` as the result of a rejected call
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.hours_per_week,
            self.worked_days,
            self.overtime_hours,
            self.result.unwrap_or(-1.0)
        )
    }
}

/// Destination for calculator call records
pub trait ArgumentSink {
    fn record(&mut self, record: ArgumentRecord) -> std::io::Result<()>;
}

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Vec<ArgumentRecord>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ArgumentRecord] {
        &self.records
    }
}

impl ArgumentSink for RecordingSink {
    fn record(&mut self, record: ArgumentRecord) -> std::io::Result<()> {
        self.records.push(record);
        Ok(())
    }
}

/// Writes one CSV line per record
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: W,
    lines_written: u64,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines_written: 0,
        }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ArgumentSink for CsvSink<W> {
    fn record(&mut self, record: ArgumentRecord) -> std::io::Result<()> {
        writeln!(self.writer, "{}", record.to_csv_line())?;
        self.writer.flush()?;
        self.lines_written += 1;
        Ok(())
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// Days off earned from worked days and overtime
///
/// `((worked_days * 8 * hours_per_week / 40) / 5 + overtime_hours * 1.5) / 8`
///
/// Valid ranges: hours 20..=40, days 0..=200, overtime 0..=22. The call is
/// recorded to `sink` before the result or the error is returned.
pub fn available_days_off(
    hours_per_week: i32,
    worked_days: i32,
    overtime_hours: i32,
    sink: &mut dyn ArgumentSink,
) -> Result<f64> {
    let checked = FunctionError::check_range(
        "hours_per_week",
        hours_per_week.into(),
        HOURS_PER_WEEK_MIN.into(),
        HOURS_PER_WEEK_MAX.into(),
    )
    .and_then(|()| {
        FunctionError::check_range(
            "worked_days",
            worked_days.into(),
            0,
            WORKED_DAYS_COUNT_MAX.into(),
        )
    })
    .and_then(|()| {
        FunctionError::check_range(
            "overtime_hours",
            overtime_hours.into(),
            0,
            OVERTIME_HOURS_MAX.into(),
        )
    });

    let result = checked.as_ref().ok().map(|_| {
        let employment_level = f64::from(hours_per_week) / FULL_TIME_HOURS_PER_WEEK;
        let worked_hours = f64::from(worked_days) * HOURS_PER_DAY * employment_level;
        let vacation_hours = worked_hours / DAYS_PER_WEEK;
        let overtime_credit = f64::from(overtime_hours) * OVERTIME_FACTOR;
        (vacation_hours + overtime_credit) / HOURS_PER_DAY
    });

    sink.record(ArgumentRecord {
        hours_per_week,
        worked_days,
        overtime_hours,
        result,
    })?;

    checked?;
    let days = result.unwrap_or_default();
    debug_assert!(days >= 0.0);
    debug!(hours_per_week, worked_days, overtime_hours, days, "Days off computed");
    Ok(days)
}
