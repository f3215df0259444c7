//! Desktop sampling for Linux using X11 (XScreenSaver extension and EWMH hints).

use std::time::Duration;
use tracing::{debug, info};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::screensaver::{self, ConnectionExt as ScreensaverConnectionExt};
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use super::{Sample, Sampler};
use crate::error::{Result, SampleError};

/// Samples idle time, screensaver state and the focused window title over a
/// single X11 connection.
pub struct X11Sampler {
    conn: RustConnection,
    root: Window,
    net_active_window: u32,
    net_wm_name: u32,
}

impl X11Sampler {
    /// Connect to the display named by `DISPLAY`.
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        if conn
            .extension_information(screensaver::X11_EXTENSION_NAME)?
            .is_none()
        {
            return Err(SampleError::MissingExtension(screensaver::X11_EXTENSION_NAME));
        }

        let net_active_window = intern(&conn, "_NET_ACTIVE_WINDOW")?;
        let net_wm_name = intern(&conn, "_NET_WM_NAME")?;

        info!("Connected to X11 display (screen {})", screen_num);

        Ok(Self {
            conn,
            root,
            net_active_window,
            net_wm_name,
        })
    }

    fn active_window(&self) -> Result<Option<Window>> {
        let reply = self
            .conn
            .get_property(false, self.root, self.net_active_window, AtomEnum::WINDOW, 0, 1)?
            .reply()?;

        Ok(reply
            .value32()
            .and_then(|mut values| values.next())
            .filter(|&window| window != x11rb::NONE))
    }

    fn window_title(&self, window: Window) -> Result<String> {
        for atom in [self.net_wm_name, AtomEnum::WM_NAME.into()] {
            let reply = self
                .conn
                .get_property(false, window, atom, AtomEnum::ANY, 0, 1024)?
                .reply()?;
            if !reply.value.is_empty() {
                return Ok(String::from_utf8_lossy(&reply.value).trim().to_string());
            }
        }
        Ok(String::new())
    }
}

impl Sampler for X11Sampler {
    fn sample(&self) -> Result<Sample> {
        let info = self.conn.screensaver_query_info(self.root)?.reply()?;

        let title = match self.active_window()? {
            Some(window) => self.window_title(window)?,
            None => {
                debug!("No window has focus");
                String::new()
            }
        };

        Ok(Sample {
            idle: Duration::from_millis(u64::from(info.ms_since_user_input)),
            title,
            screensaver_active: info.state == u8::from(screensaver::State::ON),
        })
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<u32> {
    Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
}
