//! Window server connection
//!
//! Owns the x11rb connection, redirects every top-level window off-screen,
//! takes the composite overlay and makes it transparent to input.

use screenshader_core::{
    CompositorError, DamageId, Geometry, PixmapId, Result, Size, WindowAttributes, WindowId,
    WindowSystem,
};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::composite::{self, ConnectionExt as _, Redirect};
use x11rb::protocol::damage::{self, ConnectionExt as _};
use x11rb::protocol::shape;
use x11rb::protocol::xfixes::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConnectionExt as _, EventMask, MapState, Window,
};
use x11rb::rust_connection::RustConnection;

use crate::X11Platform;

/// Oldest Composite version with NameWindowPixmap and the overlay window
const COMPOSITE_MIN: (u32, u32) = (0, 2);

pub(crate) fn protocol_error(err: impl std::fmt::Display) -> CompositorError {
    CompositorError::Protocol(err.to_string())
}

/// Redirected display with the overlay claimed
pub struct X11Display {
    pub(crate) conn: RustConnection,
    pub(crate) screen_num: usize,
    pub(crate) root: Window,
    pub(crate) overlay: Window,
    pub(crate) root_size: Size,
}

impl X11Display {
    /// Connect, verify extensions, redirect and claim the overlay.
    pub fn connect(display_name: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display_name)
            .map_err(|e| CompositorError::Connection(e.to_string()))?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let root_size = Size::new(
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );

        require_extension(&conn, composite::X11_EXTENSION_NAME)?;
        let version = conn
            .composite_query_version(0, 4)
            .map_err(protocol_error)?
            .reply()
            .map_err(protocol_error)?;
        if (version.major_version, version.minor_version) < COMPOSITE_MIN {
            return Err(CompositorError::MissingExtension(format!(
                "Composite {}.{} (0.2 or newer required)",
                version.major_version, version.minor_version
            )));
        }

        require_extension(&conn, damage::X11_EXTENSION_NAME)?;
        conn.damage_query_version(1, 1)
            .map_err(protocol_error)?
            .reply()
            .map_err(protocol_error)?;

        require_extension(&conn, xfixes::X11_EXTENSION_NAME)?;
        conn.xfixes_query_version(5, 0)
            .map_err(protocol_error)?
            .reply()
            .map_err(protocol_error)?;

        tracing::info!(
            "Composite {}.{} on screen {} ({})",
            version.major_version,
            version.minor_version,
            screen_num,
            root_size
        );

        conn.composite_redirect_subwindows(root, Redirect::AUTOMATIC)
            .map_err(protocol_error)?
            .check()
            .map_err(protocol_error)?;

        let overlay = conn
            .composite_get_overlay_window(root)
            .map_err(protocol_error)?
            .reply()
            .map_err(protocol_error)?
            .overlay_win;

        let display = Self {
            conn,
            screen_num,
            root,
            overlay,
            root_size,
        };
        display.pass_input_through()?;

        let mask =
            EventMask::SUBSTRUCTURE_NOTIFY | EventMask::STRUCTURE_NOTIFY | EventMask::EXPOSURE;
        display
            .conn
            .change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))
            .map_err(protocol_error)?
            .check()
            .map_err(protocol_error)?;
        display.conn.flush().map_err(protocol_error)?;

        tracing::debug!("Overlay window 0x{:x}", overlay);
        Ok(display)
    }

    /// Empty input shape so pointer and keyboard reach the windows below
    fn pass_input_through(&self) -> Result<()> {
        let region = self.conn.generate_id().map_err(protocol_error)?;
        self.conn
            .xfixes_create_region(region, &[])
            .map_err(protocol_error)?;
        self.conn
            .xfixes_set_window_shape_region(self.overlay, shape::SK::INPUT, 0, 0, region)
            .map_err(protocol_error)?;
        self.conn
            .xfixes_destroy_region(region)
            .map_err(protocol_error)?;
        Ok(())
    }

    /// Name a pixmap for the window's current off-screen contents
    pub(crate) fn name_window_pixmap(
        &self,
        window: WindowId,
    ) -> std::result::Result<PixmapId, String> {
        let pixmap = self.conn.generate_id().map_err(|e| e.to_string())?;
        self.conn
            .composite_name_window_pixmap(window.0, pixmap)
            .map_err(|e| e.to_string())?
            .check()
            .map_err(|e| e.to_string())?;
        Ok(PixmapId(pixmap))
    }

    pub(crate) fn free_pixmap(&self, pixmap: PixmapId) {
        if let Err(e) = self.conn.free_pixmap(pixmap.0) {
            tracing::debug!("FreePixmap {} failed: {}", pixmap, e);
        }
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        let _ = self
            .conn
            .composite_unredirect_subwindows(self.root, Redirect::AUTOMATIC);
        let _ = self.conn.composite_release_overlay_window(self.root);
        let _ = self.conn.flush();
    }
}

fn require_extension(conn: &RustConnection, name: &'static str) -> Result<()> {
    match conn.extension_information(name).map_err(protocol_error)? {
        Some(_) => Ok(()),
        None => Err(CompositorError::MissingExtension(name.to_string())),
    }
}

impl WindowSystem for X11Platform {
    fn root(&self) -> WindowId {
        WindowId(self.display.root)
    }

    fn overlay(&self) -> WindowId {
        WindowId(self.display.overlay)
    }

    fn root_size(&self) -> Size {
        self.display.root_size
    }

    fn top_level_windows(&mut self) -> Result<Vec<WindowId>> {
        let tree = self
            .display
            .conn
            .query_tree(self.display.root)
            .map_err(protocol_error)?
            .reply()
            .map_err(protocol_error)?;
        Ok(tree.children.into_iter().map(WindowId).collect())
    }

    fn attributes(&mut self, window: WindowId) -> Option<WindowAttributes> {
        let conn = &self.display.conn;
        // Both requests go out before either reply is awaited
        let attrs = conn.get_window_attributes(window.0).ok()?;
        let geometry = conn.get_geometry(window.0).ok()?;
        let attrs = attrs.reply().ok()?;
        let geometry = geometry.reply().ok()?;

        Some(WindowAttributes {
            geometry: Geometry {
                x: i32::from(geometry.x),
                y: i32::from(geometry.y),
                width: u32::from(geometry.width),
                height: u32::from(geometry.height),
                border_width: u32::from(geometry.border_width),
            },
            depth: geometry.depth,
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
        })
    }

    fn create_damage(&mut self, window: WindowId) -> Result<DamageId> {
        let conn = &self.display.conn;
        let damage = conn.generate_id().map_err(protocol_error)?;
        conn.damage_create(damage, window.0, damage::ReportLevel::NON_EMPTY)
            .map_err(protocol_error)?
            .check()
            .map_err(protocol_error)?;
        Ok(DamageId(damage))
    }

    fn destroy_damage(&mut self, damage: DamageId) {
        if let Err(e) = self.display.conn.damage_destroy(damage.0) {
            tracing::debug!("DamageDestroy {} failed: {}", damage, e);
        }
    }

    fn subtract_damage(&mut self, damage: DamageId) {
        if let Err(e) = self
            .display
            .conn
            .damage_subtract(damage.0, x11rb::NONE, x11rb::NONE)
        {
            tracing::debug!("DamageSubtract {} failed: {}", damage, e);
        }
    }
}
