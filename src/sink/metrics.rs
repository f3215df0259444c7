//! Accumulated idle and active time as Prometheus counters.

use anyhow::{Context, Result};
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::sync::Arc;

use super::ReportSink;
use crate::reporter::Report;
use crate::sample::IdlePolicy;

/// Counter set shared between the poll loop and the HTTP endpoint.
pub struct ActivityMetrics {
    registry: Registry,
    idle_seconds: Counter,
    active_seconds: CounterVec,
}

impl ActivityMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let idle_seconds = Counter::with_opts(Opts::new(
            "idle_seconds_total",
            "Seconds idle, i.e. screensaver active or no keyboard/mouse input for longer than the idle cutoff.",
        ))?;
        let active_seconds = CounterVec::new(
            Opts::new(
                "active_seconds_total",
                "Seconds active, by application and application context.",
            ),
            &["app", "appcontext"],
        )?;

        registry
            .register(Box::new(idle_seconds.clone()))
            .context("Failed to register idle counter")?;
        registry
            .register(Box::new(active_seconds.clone()))
            .context("Failed to register active counter")?;

        Ok(Self {
            registry,
            idle_seconds,
            active_seconds,
        })
    }

    pub fn add_idle(&self, seconds: f64) {
        self.idle_seconds.inc_by(seconds);
    }

    pub fn add_active(&self, app: &str, context: &str, seconds: f64) {
        self.active_seconds
            .with_label_values(&[app, context])
            .inc_by(seconds);
    }

    /// Content type of [`ActivityMetrics::render`] output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Encode all counters in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .context("Failed to encode metrics")?;
        String::from_utf8(buffer).context("Metrics output is not UTF-8")
    }
}

/// Feeds reports into an [`ActivityMetrics`] counter set.
///
/// Idle reports count as idle time; reports with a recognised application
/// count as active time; anything else is dropped.
pub struct MetricsSink {
    metrics: Arc<ActivityMetrics>,
    policy: IdlePolicy,
}

impl MetricsSink {
    pub fn new(metrics: Arc<ActivityMetrics>, policy: IdlePolicy) -> Self {
        Self { metrics, policy }
    }
}

impl ReportSink for MetricsSink {
    fn record(&mut self, report: &Report) -> Result<()> {
        let seconds = report.elapsed.as_secs_f64();
        if self.policy.is_idle_title(&report.title) {
            self.metrics.add_idle(seconds);
        } else if !report.app.is_empty() {
            self.metrics.add_active(&report.app, &report.context, seconds);
        }
        Ok(())
    }
}
