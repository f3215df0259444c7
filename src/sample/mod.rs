//! Desktop sampling with platform-specific implementations.

#[cfg(target_os = "linux")]
mod linux;

use std::time::Duration;

use crate::error::Result;

/// One snapshot of the user's desktop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    /// Time since the last keyboard or mouse input.
    pub idle: Duration,
    /// Title of the focused window, empty when nothing has focus.
    pub title: String,
    /// Whether the screensaver is currently shown.
    pub screensaver_active: bool,
}

/// Source of desktop samples.
pub trait Sampler {
    fn sample(&self) -> Result<Sample>;
}

/// Decides what title a sample is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdlePolicy {
    /// The user is idle once input has been absent for longer than this.
    pub cutoff: Duration,
    /// Title reported for idle or locked periods.
    pub sentinel: String,
}

impl IdlePolicy {
    pub fn new(cutoff: Duration, sentinel: impl Into<String>) -> Self {
        Self {
            cutoff,
            sentinel: sentinel.into(),
        }
    }

    /// The classification input for `sample`.
    pub fn resolve(&self, sample: Sample) -> String {
        if sample.screensaver_active || sample.idle > self.cutoff {
            self.sentinel.clone()
        } else {
            sample.title
        }
    }

    pub fn is_idle_title(&self, title: &str) -> bool {
        title == self.sentinel
    }
}

#[cfg(target_os = "linux")]
pub use linux::X11Sampler as NativeSampler;

/// Sampler for platforms without a desktop backend.
#[cfg(not(target_os = "linux"))]
pub struct NativeSampler;

#[cfg(not(target_os = "linux"))]
impl NativeSampler {
    pub fn new() -> Result<Self> {
        Err(crate::error::SampleError::Unsupported(std::env::consts::OS))
    }
}

#[cfg(not(target_os = "linux"))]
impl Sampler for NativeSampler {
    fn sample(&self) -> Result<Sample> {
        Err(crate::error::SampleError::Unsupported(std::env::consts::OS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(idle_secs: u64, title: &str, screensaver_active: bool) -> Sample {
        Sample {
            idle: Duration::from_secs(idle_secs),
            title: title.to_string(),
            screensaver_active,
        }
    }

    #[test]
    fn test_active_user_keeps_title() {
        let policy = IdlePolicy::new(Duration::from_secs(180), "idle");
        assert_eq!(policy.resolve(sample(3, "~: vim - xterm", false)), "~: vim - xterm");
        assert_eq!(policy.resolve(sample(180, "~: vim - xterm", false)), "~: vim - xterm");
    }

    #[test]
    fn test_idle_past_cutoff_uses_sentinel() {
        let policy = IdlePolicy::new(Duration::from_secs(180), "idle");
        assert_eq!(policy.resolve(sample(181, "~: vim - xterm", false)), "idle");
    }

    #[test]
    fn test_screensaver_uses_sentinel() {
        let policy = IdlePolicy::new(Duration::from_secs(180), "away");
        assert_eq!(policy.resolve(sample(0, "~: vim - xterm", true)), "away");
        assert!(policy.is_idle_title("away"));
        assert!(!policy.is_idle_title("idle"));
    }
}
