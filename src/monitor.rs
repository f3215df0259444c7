//! The poll loop: sample, resolve idleness, account segments, fan out reports.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::reporter::{Report, Reporter};
use crate::sample::{IdlePolicy, Sampler};
use crate::sink::ReportSink;

/// Owns the [`Reporter`] and drives it from a [`Sampler`].
pub struct Monitor<S> {
    sampler: S,
    policy: IdlePolicy,
    reporter: Reporter,
    sinks: Vec<Box<dyn ReportSink>>,
}

impl<S: Sampler> Monitor<S> {
    pub fn new(sampler: S, policy: IdlePolicy, reporter: Reporter) -> Self {
        Self {
            sampler,
            policy,
            reporter,
            sinks: Vec::new(),
        }
    }

    /// Add a sink; every report is delivered to all sinks in order.
    pub fn with_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Sample once and account the observation at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Option<Report>> {
        let sample = self
            .sampler
            .sample()
            .context("Failed to sample desktop state")?;
        let title = self.policy.resolve(sample);

        let report = self.reporter.observe(&title, now);
        if let Some(report) = &report {
            self.dispatch(report)?;
        }
        Ok(report)
    }

    /// Close the open segment at `now` and close every sink.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<Option<Report>> {
        let report = self.reporter.finish(now);
        if let Some(report) = &report {
            self.dispatch(report)?;
        }
        for sink in &mut self.sinks {
            sink.close()?;
        }
        Ok(report)
    }

    fn dispatch(&mut self, report: &Report) -> Result<()> {
        debug!(
            title = %report.title,
            app = %report.app,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Segment complete"
        );
        for sink in &mut self.sinks {
            sink.record(report)?;
        }
        Ok(())
    }

    /// Tick every `poll_interval` until `shutdown` resolves or a tick fails,
    /// then flush the open segment and close the sinks.
    pub async fn run(&mut self, poll_interval: Duration, shutdown: impl Future<Output = ()>) -> Result<()> {
        if !self.reporter.covers_poll_interval(poll_interval) {
            warn!(
                "Poll interval {:?} exceeds flush interval {:?}; segments may run longer than the flush interval",
                poll_interval,
                self.reporter.flush_interval()
            );
        }

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Entering poll loop (every {:?})", poll_interval);

        let polled = loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()) {
                        break Err(e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
            }
        };

        // The open segment and the sinks are closed even when a tick failed;
        // the tick's error takes precedence.
        let finished = self.finish(Utc::now());
        polled?;
        finished?;
        Ok(())
    }
}
