//! CSV rows on a writer, one per report.

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use std::io::Write;

use super::ReportSink;
use crate::reporter::Report;

/// Writes `timestamp,elapsed,title[,app[,context[,detail]]]` rows.
///
/// Optional fields are only written while the preceding one is non-empty, so
/// rows have varying length.
pub struct CsvSink<W: Write> {
    writer: ::csv::Writer<W>,
}

impl CsvSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        let writer = ::csv::WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_writer(inner);
        Self { writer }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))
    }
}

fn row(report: &Report) -> Vec<String> {
    let mut row = vec![
        report
            .timestamp
            .with_timezone(&Local)
            .to_rfc3339_opts(SecondsFormat::Secs, false),
        format!("{:.0}", report.elapsed.as_secs_f64()),
        report.title.clone(),
    ];

    for field in [&report.app, &report.context, &report.detail] {
        if field.is_empty() {
            break;
        }
        row.push(field.clone());
    }
    row
}

impl<W: Write> ReportSink for CsvSink<W> {
    fn record(&mut self, report: &Report) -> Result<()> {
        self.writer
            .write_record(row(report))
            .context("Unable to write CSV")?;
        self.writer.flush().context("Unable to flush CSV")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush().context("Unable to flush CSV")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn report(title: &str, app: &str, context: &str, detail: &str, millis: u64) -> Report {
        Report {
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            elapsed: Duration::from_millis(millis),
            title: title.to_string(),
            app: app.to_string(),
            context: context.to_string(),
            detail: detail.to_string(),
        }
    }

    fn written(reports: &[Report]) -> Vec<Vec<String>> {
        let mut sink = CsvSink::new(Vec::new());
        for r in reports {
            sink.record(r).unwrap();
        }
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        out.lines()
            .map(|line| {
                ::csv::ReaderBuilder::new()
                    .has_headers(false)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .unwrap()
                    .unwrap()
                    .iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_rows_stop_at_first_empty_field() {
        let rows = written(&[
            report("idle", "", "", "", 125_400),
            report("New Tab - Chromium", "browser", "", "", 3_000),
            report("bash - xterm", "terminal", "", "bash", 3_000),
            report("~: bash - xterm", "terminal", "~", "bash", 900_000),
        ]);

        let tails: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| r[1..].iter().map(String::as_str).collect())
            .collect();
        assert_eq!(tails[0], vec!["125", "idle"]);
        assert_eq!(tails[1], vec!["3", "New Tab - Chromium", "browser"]);
        assert_eq!(tails[2], vec!["3", "bash - xterm", "terminal"]);
        assert_eq!(tails[3], vec!["900", "~: bash - xterm", "terminal", "~", "bash"]);
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let rows = written(&[report("idle", "", "", "", 1_000)]);
        let parsed = chrono::DateTime::parse_from_rfc3339(&rows[0][0]).unwrap();
        assert_eq!(parsed.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_titles_with_commas_are_quoted() {
        let rows = written(&[report("a, b - gedit", "", "", "", 1_000)]);
        assert_eq!(rows[0][2], "a, b - gedit");
    }
}
