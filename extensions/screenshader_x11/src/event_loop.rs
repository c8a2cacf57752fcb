//! X11 event translation and waiting

use std::os::unix::io::AsRawFd;
use std::time::Duration;

use screenshader_core::{EventSource, Geometry, Place, Result, Size, WindowEvent, WindowId};
use x11rb::connection::Connection;
use x11rb::protocol::xproto;
use x11rb::protocol::Event;

use crate::display::protocol_error;
use crate::X11Platform;

/// Translate an x11rb event, `None` for events the compositor does not use
pub(crate) fn translate(event: Event) -> Option<WindowEvent> {
    match event {
        Event::MapNotify(e) => Some(WindowEvent::Map {
            window: WindowId(e.window),
        }),
        Event::UnmapNotify(e) => Some(WindowEvent::Unmap {
            window: WindowId(e.window),
        }),
        Event::DestroyNotify(e) => Some(WindowEvent::Destroy {
            window: WindowId(e.window),
        }),
        Event::ConfigureNotify(e) => Some(WindowEvent::Configure {
            window: WindowId(e.window),
            geometry: Geometry {
                x: i32::from(e.x),
                y: i32::from(e.y),
                width: u32::from(e.width),
                height: u32::from(e.height),
                border_width: u32::from(e.border_width),
            },
            above: (e.above_sibling != x11rb::NONE).then_some(WindowId(e.above_sibling)),
        }),
        Event::ReparentNotify(e) => Some(WindowEvent::Reparent {
            window: WindowId(e.window),
            parent: WindowId(e.parent),
        }),
        Event::CirculateNotify(e) => Some(WindowEvent::Circulate {
            window: WindowId(e.window),
            place: if e.place == xproto::Place::ON_TOP {
                Place::Top
            } else {
                Place::Bottom
            },
        }),
        Event::DamageNotify(e) => Some(WindowEvent::Damage {
            drawable: WindowId(e.drawable),
        }),
        Event::Error(e) => {
            tracing::debug!("X error {:?} on request {}", e.error_kind, e.major_opcode);
            None
        }
        _ => None,
    }
}

impl EventSource for X11Platform {
    fn next_event(&mut self) -> Result<Option<WindowEvent>> {
        while let Some(event) = self
            .display
            .conn
            .poll_for_event()
            .map_err(protocol_error)?
        {
            let Some(event) = translate(event) else {
                continue;
            };
            if let WindowEvent::Configure {
                window, geometry, ..
            } = event
            {
                if window.0 == self.display.root {
                    self.display.root_size = Size::new(geometry.width, geometry.height);
                }
            }
            return Ok(Some(event));
        }
        Ok(None)
    }

    fn wait_for_events(&mut self, timeout: Duration) {
        if let Err(e) = self.display.conn.flush() {
            tracing::debug!("flush before wait failed: {}", e);
        }
        let mut fd = libc::pollfd {
            fd: self.display.conn.stream().as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        // EINTR from a signal wakes the loop early, which is what the flags want
        unsafe { libc::poll(&mut fd, 1, timeout_ms) };
    }
}
