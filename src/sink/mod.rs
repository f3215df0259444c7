//! Destinations for completed activity reports.

mod csv;
mod jsonl;
mod metrics;

pub use self::csv::CsvSink;
pub use self::jsonl::JsonlSink;
pub use self::metrics::{ActivityMetrics, MetricsSink};

use anyhow::Result;

use crate::reporter::Report;

/// Consumer of the reports produced by the poll loop.
pub trait ReportSink {
    fn record(&mut self, report: &Report) -> Result<()>;

    /// Called once when the poll loop stops.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
