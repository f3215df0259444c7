//! Segment accounting: turns per-tick title observations into timed reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::trace;

use crate::classify::classify;

/// A completed activity segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// When the segment ended.
    pub timestamp: DateTime<Utc>,
    /// How long the segment lasted.
    #[serde(serialize_with = "serialize_seconds", rename = "elapsed_seconds")]
    pub elapsed: Duration,
    /// Raw window title (or idle sentinel) the segment is attributed to.
    pub title: String,
    /// Application tag, empty when the title was not recognised.
    pub app: String,
    /// Application context (host, workspace, directory).
    pub context: String,
    /// Application detail (path, file, command).
    pub detail: String,
}

impl Report {
    fn new(timestamp: DateTime<Utc>, title: String, elapsed: Duration) -> Self {
        let fields = classify(&title);
        Self {
            timestamp,
            elapsed,
            title,
            app: fields.app,
            context: fields.context,
            detail: fields.detail,
        }
    }
}

fn serialize_seconds<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[derive(Debug, Clone)]
struct OpenSegment {
    title: String,
    start: DateTime<Utc>,
}

/// Produces activity reports from observations of the focused window title.
///
/// The reporter has no timer of its own: a segment is only flushed when
/// [`Reporter::observe`] is called. Segments stay bounded by the flush
/// interval only if the caller polls at least that often, see
/// [`Reporter::covers_poll_interval`].
#[derive(Debug, Clone)]
pub struct Reporter {
    current: Option<OpenSegment>,
    flush_interval: Duration,
}

impl Reporter {
    /// Create a reporter that flushes unchanged segments every `flush_interval`.
    pub fn new(flush_interval: Duration) -> Self {
        Self {
            current: None,
            flush_interval,
        }
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Whether polling every `poll_interval` keeps segments within the flush interval.
    pub fn covers_poll_interval(&self, poll_interval: Duration) -> bool {
        poll_interval <= self.flush_interval
    }

    /// Title and start time of the segment still in progress.
    pub fn open_segment(&self) -> Option<(&str, DateTime<Utc>)> {
        self.current.as_ref().map(|s| (s.title.as_str(), s.start))
    }

    /// Record the title observed at `now`.
    ///
    /// Returns the segment that just ended, if the title changed or the
    /// open segment reached the flush interval. A segment with an empty
    /// title (nothing focused) ends silently.
    pub fn observe(&mut self, title: &str, now: DateTime<Utc>) -> Option<Report> {
        let Some(open) = self.current.as_mut() else {
            trace!(title, "opening first segment");
            self.current = Some(OpenSegment {
                title: title.to_string(),
                start: now,
            });
            return None;
        };

        let elapsed = elapsed_between(open.start, now);
        if open.title == title && elapsed < self.flush_interval {
            return None;
        }

        let ended = std::mem::replace(&mut open.title, title.to_string());
        open.start = now;
        if ended.is_empty() {
            return None;
        }
        trace!(title = %ended, ?elapsed, "segment flushed");
        Some(Report::new(now, ended, elapsed))
    }

    /// Close the open segment at `now`, leaving no segment in progress.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Option<Report> {
        let open = self.current.take().filter(|s| !s.title.is_empty())?;
        let elapsed = elapsed_between(open.start, now);
        Some(Report::new(now, open.title, elapsed))
    }
}

/// Elapsed time between two instants; a clock that went backwards counts as zero.
fn elapsed_between(start: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - start).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FLUSH: Duration = Duration::from_secs(60);

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_first_observation_never_reports() {
        for title in ["", "idle", "main.rs - spent - Visual Studio Code"] {
            let mut reporter = Reporter::new(FLUSH);
            assert!(reporter.observe(title, t(0)).is_none());
            assert_eq!(reporter.open_segment(), Some((title, t(0))));
        }
    }

    #[test]
    fn test_unchanged_title_within_interval_is_debounced() {
        let mut reporter = Reporter::new(FLUSH);
        reporter.observe("X", t(0));
        assert!(reporter.observe("X", t(59)).is_none());
        assert_eq!(reporter.open_segment(), Some(("X", t(0))));
    }

    #[test]
    fn test_title_change_flushes_previous_segment() {
        for d in [0, 5, 59] {
            let mut reporter = Reporter::new(FLUSH);
            reporter.observe("X", t(0));
            let report = reporter.observe("Y", t(d)).expect("title change reports");
            assert_eq!(report.title, "X");
            assert_eq!(report.elapsed, Duration::from_secs(d as u64));
            assert_eq!(report.timestamp, t(d));
            assert_eq!(reporter.open_segment(), Some(("Y", t(d))));
        }
    }

    #[test]
    fn test_periodic_flush_at_interval() {
        let mut reporter = Reporter::new(FLUSH);
        reporter.observe("X", t(0));

        let report = reporter.observe("X", t(60)).expect("flush at interval");
        assert_eq!(report.title, "X");
        assert_eq!(report.elapsed, FLUSH);

        assert!(reporter.observe("X", t(61)).is_none());
        assert_eq!(reporter.open_segment(), Some(("X", t(60))));
    }

    #[test]
    fn test_report_is_classified() {
        let mut reporter = Reporter::new(FLUSH);
        reporter.observe("~: bash - xterm", t(0));
        let report = reporter.observe("idle", t(10)).unwrap();
        assert_eq!(report.app, "terminal");
        assert_eq!(report.context, "~");
        assert_eq!(report.detail, "bash");
    }

    #[test]
    fn test_segments_cover_elapsed_time_without_gaps() {
        let mut reporter = Reporter::new(Duration::from_secs(15));
        let ticks = [
            (0, "a"),
            (5, "a"),
            (10, "b"),
            (15, "b"),
            (20, "b"),
            (25, "b"),
            (30, "idle"),
            (35, "idle"),
            (40, "a"),
            (45, "a"),
        ];

        let mut reported = Duration::ZERO;
        let mut count = 0;
        for (secs, title) in ticks {
            if let Some(report) = reporter.observe(title, t(secs)) {
                assert!(report.elapsed <= Duration::from_secs(15));
                reported += report.elapsed;
                count += 1;
            }
        }

        let (_, tail_start) = reporter.open_segment().unwrap();
        let tail = elapsed_between(tail_start, t(45));
        assert_eq!(reported + tail, Duration::from_secs(45));
        // a, b (flushed at 25), b, idle
        assert_eq!(count, 4);
    }

    #[test]
    fn test_backwards_clock_counts_as_zero() {
        let mut reporter = Reporter::new(FLUSH);
        reporter.observe("X", t(10));
        assert!(reporter.observe("X", t(0)).is_none());
        let report = reporter.observe("Y", t(5)).unwrap();
        assert_eq!(report.elapsed, Duration::ZERO);
    }

    #[test]
    fn test_finish_returns_tail_and_resets() {
        let mut reporter = Reporter::new(FLUSH);
        assert!(reporter.finish(t(0)).is_none());

        reporter.observe("X", t(0));
        let report = reporter.finish(t(30)).unwrap();
        assert_eq!(report.title, "X");
        assert_eq!(report.elapsed, Duration::from_secs(30));
        assert!(reporter.open_segment().is_none());
        assert!(reporter.observe("X", t(31)).is_none());
    }

    #[test]
    fn test_empty_title_segments_are_not_reported() {
        let mut reporter = Reporter::new(FLUSH);
        reporter.observe("", t(0));
        assert!(reporter.observe("X", t(10)).is_none());
        assert_eq!(reporter.open_segment(), Some(("X", t(10))));

        let mut reporter = Reporter::new(FLUSH);
        reporter.observe("A", t(0));
        let report = reporter.observe("", t(5)).unwrap();
        assert_eq!(report.title, "A");
        assert!(reporter.observe("", t(70)).is_none());
        assert!(reporter.observe("B", t(80)).is_none());
        assert_eq!(reporter.open_segment(), Some(("B", t(80))));

        reporter.observe("", t(90));
        assert!(reporter.finish(t(100)).is_none());
        assert!(reporter.open_segment().is_none());
    }

    #[test]
    fn test_covers_poll_interval() {
        let reporter = Reporter::new(Duration::from_secs(1));
        assert!(reporter.covers_poll_interval(Duration::from_secs(1)));
        assert!(!reporter.covers_poll_interval(Duration::from_secs(5)));
        assert_eq!(reporter.flush_interval(), Duration::from_secs(1));
    }
}
