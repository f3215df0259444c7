//! JSONL writer for activity reports, rotated daily.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use super::ReportSink;
use crate::reporter::Report;

/// Lines written to the log.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum LogEvent<'a> {
    SessionStart {
        timestamp: DateTime<Utc>,
        version: &'a str,
    },
    SessionEnd {
        timestamp: DateTime<Utc>,
        segments_written: u64,
    },
    Segment(&'a Report),
}

/// Appends reports to `<logs_dir>/YYYY-MM-DD.jsonl` (local date).
pub struct JsonlSink {
    logs_dir: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    segments_written: u64,
}

impl JsonlSink {
    /// Create the sink, creating `logs_dir` if needed.
    pub fn new(logs_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))?;

        Ok(Self {
            logs_dir,
            current_file: None,
            current_date: None,
            segments_written: 0,
        })
    }

    /// Get or create the log file for today.
    fn get_writer(&mut self) -> Result<&mut BufWriter<File>> {
        let today = Local::now().format("%Y-%m-%d").to_string();

        if self.current_date.as_ref() != Some(&today) {
            let log_path = self.logs_dir.join(format!("{}.jsonl", today));

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Failed to open log file: {:?}", log_path))?;

            self.current_file = Some(BufWriter::new(file));
            self.current_date = Some(today);

            debug!("Opened log file: {:?}", log_path);
        }

        self.current_file
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No log file available"))
    }

    fn write_line(&mut self, event: &LogEvent<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let writer = self.get_writer()?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    /// Log session start event.
    pub fn log_session_start(&mut self, version: &str) -> Result<()> {
        info!("Session started, writing reports to {:?}", self.logs_dir);
        self.write_line(&LogEvent::SessionStart {
            timestamp: Utc::now(),
            version,
        })
    }
}

impl ReportSink for JsonlSink {
    fn record(&mut self, report: &Report) -> Result<()> {
        self.write_line(&LogEvent::Segment(report))?;
        self.segments_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let segments_written = self.segments_written;
        info!("Session ended, {} segments written", segments_written);
        self.write_line(&LogEvent::SessionEnd {
            timestamp: Utc::now(),
            segments_written,
        })
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Some(ref mut writer) = self.current_file {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::tempdir;

    fn read_lines(dir: &std::path::Path) -> Vec<Value> {
        let mut lines = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap() {
            let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            for line in content.lines() {
                lines.push(serde_json::from_str(line).unwrap());
            }
        }
        lines
    }

    #[test]
    fn test_writes_session_and_segment_lines() {
        let dir = tempdir().unwrap();
        let logs_dir = dir.path().join("logs");
        let mut sink = JsonlSink::new(logs_dir.clone()).unwrap();

        sink.log_session_start("0.1.0").unwrap();
        sink.record(&Report {
            timestamp: Utc::now(),
            elapsed: Duration::from_millis(2500),
            title: "main.rs - spent - Visual Studio Code".to_string(),
            app: "editor".to_string(),
            context: "spent".to_string(),
            detail: "main.rs".to_string(),
        })
        .unwrap();
        sink.close().unwrap();

        let lines = read_lines(&logs_dir);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "session_start");
        assert_eq!(lines[0]["version"], "0.1.0");
        assert_eq!(lines[1]["event"], "segment");
        assert_eq!(lines[1]["elapsed_seconds"], 2.5);
        assert_eq!(lines[1]["app"], "editor");
        assert_eq!(lines[1]["context"], "spent");
        assert_eq!(lines[2]["event"], "session_end");
        assert_eq!(lines[2]["segments_written"], 1);
    }
}
