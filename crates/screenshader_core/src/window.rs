//! Tracked window records and the identifiers they carry

use std::fmt;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

resource_id!(
    /// Server-side window identity
    WindowId(u32)
);
resource_id!(
    /// Damage subscription handle
    DamageId(u32)
);
resource_id!(
    /// Pixmap naming a redirected window's contents
    PixmapId(u32)
);
resource_id!(
    /// GPU-side wrapper around a named pixmap
    GpuPixmapId(u64)
);
resource_id!(
    /// Texture the GPU pixmap's image is bound into
    TextureId(u32)
);

/// Window rectangle in root coordinates (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            border_width: 0,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Attributes queried from the server for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub geometry: Geometry,
    pub depth: u8,
    pub override_redirect: bool,
    pub viewable: bool,
}

/// The three resources a bound window holds
///
/// Kept as one value so a window either has all of them or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundResources {
    pub pixmap: PixmapId,
    pub gpu_pixmap: GpuPixmapId,
    pub texture: TextureId,
}

/// Lifecycle stage of a tracked window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Unmapped,
    MappedUnbound,
    MappedBound,
}

/// A top-level window the compositor draws
#[derive(Debug, Clone)]
pub struct TrackedWindow {
    pub id: WindowId,
    pub geometry: Geometry,
    pub depth: u8,
    pub mapped: bool,
    pub override_redirect: bool,
    pub bound: Option<BoundResources>,
    pub damage: Option<DamageId>,
    /// Contents changed since the texture was last refreshed
    pub dirty: bool,
}

impl TrackedWindow {
    pub fn new(id: WindowId) -> Self {
        Self {
            id,
            geometry: Geometry::default(),
            depth: 0,
            mapped: false,
            override_redirect: false,
            bound: None,
            damage: None,
            dirty: false,
        }
    }

    pub fn apply_attributes(&mut self, attrs: &WindowAttributes) {
        self.geometry = attrs.geometry;
        self.depth = attrs.depth;
        self.override_redirect = attrs.override_redirect;
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    pub fn state(&self) -> WindowState {
        match (self.mapped, self.bound.is_some()) {
            (false, _) => WindowState::Unmapped,
            (true, false) => WindowState::MappedUnbound,
            (true, true) => WindowState::MappedBound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_follows_flags() {
        let mut w = TrackedWindow::new(WindowId(7));
        assert_eq!(w.state(), WindowState::Unmapped);

        w.mapped = true;
        assert_eq!(w.state(), WindowState::MappedUnbound);

        w.bound = Some(BoundResources {
            pixmap: PixmapId(1),
            gpu_pixmap: GpuPixmapId(2),
            texture: TextureId(3),
        });
        assert_eq!(w.state(), WindowState::MappedBound);
    }

    #[test]
    fn test_geometry_empty() {
        assert!(Geometry::new(0, 0, 0, 10).is_empty());
        assert!(!Geometry::new(-5, 3, 1, 1).is_empty());
    }

    #[test]
    fn test_id_display_is_hex() {
        assert_eq!(WindowId(0x1a00007).to_string(), "0x1a00007");
    }
}
