//! Error types for desktop sampling.

use thiserror::Error;

/// Failures while sampling the desktop state.
#[derive(Error, Debug)]
pub enum SampleError {
    #[cfg(target_os = "linux")]
    #[error("failed to connect to X11 display (is DISPLAY set?): {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[cfg(target_os = "linux")]
    #[error("X11 connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[cfg(target_os = "linux")]
    #[error("X11 request failed: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("X11 extension not available: {0}")]
    MissingExtension(&'static str),

    #[error("desktop sampling is not supported on {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, SampleError>;
