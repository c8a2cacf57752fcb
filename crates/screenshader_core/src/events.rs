//! Window system notifications the compositor reacts to

use crate::window::{Geometry, WindowId};

/// Placement hint carried by a circulate notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Top,
    Bottom,
}

/// A notification translated from the window system's event queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Map {
        window: WindowId,
    },
    Unmap {
        window: WindowId,
    },
    Destroy {
        window: WindowId,
    },
    Configure {
        window: WindowId,
        geometry: Geometry,
        /// Sibling the window now sits directly above, `None` for bottom
        above: Option<WindowId>,
    },
    Reparent {
        window: WindowId,
        parent: WindowId,
    },
    Circulate {
        window: WindowId,
        place: Place,
    },
    /// Contents of a drawable changed
    Damage {
        drawable: WindowId,
    },
}

impl WindowEvent {
    /// Window the event is about
    pub fn window(&self) -> WindowId {
        match *self {
            WindowEvent::Map { window }
            | WindowEvent::Unmap { window }
            | WindowEvent::Destroy { window }
            | WindowEvent::Configure { window, .. }
            | WindowEvent::Reparent { window, .. }
            | WindowEvent::Circulate { window, .. } => window,
            WindowEvent::Damage { drawable } => drawable,
        }
    }
}
