//! Window tracking
//!
//! Applies window system notifications to the registry, keeps damage
//! subscriptions and bound resources in step with each window's state, and
//! reports whether the frame needs redrawing.

use crate::binder;
use crate::error::Result;
use crate::events::{Place, WindowEvent};
use crate::fbconfig::FbConfigIndex;
use crate::platform::{PixmapBinder, WindowSystem};
use crate::registry::Registry;
use crate::window::{Geometry, Size, TrackedWindow, WindowId};

/// Outcome of handling one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Ignored,
    Redraw,
    /// Root changed size, the off-screen target must follow
    RootResized(Size),
}

/// Registry plus the per-window protocol around it
#[derive(Debug)]
pub struct WindowTracker<C: Copy> {
    registry: Registry,
    index: FbConfigIndex<C>,
    root: WindowId,
    overlay: WindowId,
    root_size: Size,
}

impl<C: Copy> WindowTracker<C> {
    pub fn new(
        root: WindowId,
        overlay: WindowId,
        root_size: Size,
        index: FbConfigIndex<C>,
    ) -> Self {
        Self {
            registry: Registry::new(),
            index,
            root,
            overlay,
            root_size,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn root_size(&self) -> Size {
        self.root_size
    }

    /// Commit a new root size once the off-screen target matches it
    pub fn set_root_size(&mut self, size: Size) {
        self.root_size = size;
    }

    pub fn config_index(&self) -> &FbConfigIndex<C> {
        &self.index
    }

    fn is_own(&self, window: WindowId) -> bool {
        window == self.root || window == self.overlay
    }

    /// Apply one event
    pub fn handle<P>(&mut self, platform: &mut P, event: WindowEvent) -> Dispatch
    where
        P: WindowSystem + PixmapBinder<Config = C>,
    {
        match event {
            WindowEvent::Map { window } => self.map(platform, window),
            WindowEvent::Unmap { window } => self.unmap(platform, window),
            WindowEvent::Destroy { window } => self.destroy(platform, window),
            WindowEvent::Configure {
                window,
                geometry,
                above,
            } => self.configure(platform, window, geometry, above),
            WindowEvent::Reparent { window, parent } => self.reparent(platform, window, parent),
            WindowEvent::Circulate { window, place } => self.circulate(window, place),
            WindowEvent::Damage { drawable } => self.damage(platform, drawable),
        }
    }

    /// Adopt the root's current viewable children, bottom to top
    pub fn adopt_existing<P>(&mut self, platform: &mut P) -> Result<usize>
    where
        P: WindowSystem + PixmapBinder<Config = C>,
    {
        for window in platform.top_level_windows()? {
            self.map(platform, window);
        }
        let bound = self.registry.iter().filter(|w| w.is_bound()).count();
        tracing::info!(
            "Tracking {} existing windows ({} bound)",
            self.registry.len(),
            bound
        );
        Ok(self.registry.len())
    }

    /// Release every window's resources and forget them
    pub fn release_all<P>(&mut self, platform: &mut P)
    where
        P: WindowSystem + PixmapBinder,
    {
        for mut window in self.registry.drain() {
            forget(platform, &mut window);
        }
    }

    fn map<P>(&mut self, platform: &mut P, id: WindowId) -> Dispatch
    where
        P: WindowSystem + PixmapBinder<Config = C>,
    {
        if self.is_own(id) {
            return Dispatch::Ignored;
        }

        let attrs = match platform.attributes(id) {
            Some(attrs) if attrs.viewable => attrs,
            _ => {
                tracing::debug!("Window {} not viewable at map", id);
                return self.discard(platform, id);
            }
        };

        if !self.registry.contains(id) {
            self.registry.insert_top(TrackedWindow::new(id));
        }
        let Some(window) = self.registry.get_mut(id) else {
            return Dispatch::Ignored;
        };
        window.apply_attributes(&attrs);
        window.mapped = true;

        if window.damage.is_none() {
            match platform.create_damage(id) {
                Ok(damage) => window.damage = Some(damage),
                Err(e) => tracing::debug!("No damage tracking for {}: {}", id, e),
            }
        }

        if let Err(e) = binder::bind(platform, &self.index, window) {
            tracing::debug!("Bind skipped: {}", e);
        }
        Dispatch::Redraw
    }

    fn unmap<P>(&mut self, platform: &mut P, id: WindowId) -> Dispatch
    where
        P: WindowSystem + PixmapBinder,
    {
        let Some(window) = self.registry.get_mut(id) else {
            return Dispatch::Ignored;
        };
        window.mapped = false;
        forget(platform, window);
        Dispatch::Redraw
    }

    fn destroy<P>(&mut self, platform: &mut P, id: WindowId) -> Dispatch
    where
        P: WindowSystem + PixmapBinder,
    {
        self.discard(platform, id)
    }

    fn discard<P>(&mut self, platform: &mut P, id: WindowId) -> Dispatch
    where
        P: WindowSystem + PixmapBinder,
    {
        match self.registry.remove(id) {
            Some(mut window) => {
                forget(platform, &mut window);
                Dispatch::Redraw
            }
            None => Dispatch::Ignored,
        }
    }

    fn configure<P>(
        &mut self,
        platform: &mut P,
        id: WindowId,
        geometry: Geometry,
        above: Option<WindowId>,
    ) -> Dispatch
    where
        P: WindowSystem + PixmapBinder<Config = C>,
    {
        if id == self.root {
            let size = geometry.size();
            if size != self.root_size {
                tracing::info!("Screen resized: {} -> {}", self.root_size, size);
                return Dispatch::RootResized(size);
            }
            return Dispatch::Redraw;
        }
        if id == self.overlay {
            return Dispatch::Ignored;
        }

        let Some(window) = self.registry.get_mut(id) else {
            return Dispatch::Ignored;
        };
        let resized = window.geometry.width != geometry.width
            || window.geometry.height != geometry.height;
        window.geometry = geometry;

        self.registry.restack(id, above);

        if let Some(window) = self.registry.get_mut(id) {
            if resized && window.mapped {
                if let Err(e) = binder::bind(platform, &self.index, window) {
                    tracing::debug!("Rebind after resize skipped: {}", e);
                }
            }
        }
        Dispatch::Redraw
    }

    fn reparent<P>(&mut self, platform: &mut P, id: WindowId, parent: WindowId) -> Dispatch
    where
        P: WindowSystem + PixmapBinder<Config = C>,
    {
        if self.is_own(id) {
            return Dispatch::Ignored;
        }
        let viewable = parent == self.root
            && platform.attributes(id).is_some_and(|attrs| attrs.viewable);
        if viewable {
            self.map(platform, id)
        } else {
            self.destroy(platform, id)
        }
    }

    fn circulate(&mut self, id: WindowId, place: Place) -> Dispatch {
        let moved = match place {
            Place::Top => self.registry.raise_top(id),
            Place::Bottom => self.registry.lower_bottom(id),
        };
        if moved {
            Dispatch::Redraw
        } else {
            Dispatch::Ignored
        }
    }

    fn damage<P>(&mut self, platform: &mut P, id: WindowId) -> Dispatch
    where
        P: WindowSystem,
    {
        let Some(window) = self.registry.get_mut(id) else {
            return Dispatch::Ignored;
        };
        let Some(damage) = window.damage else {
            return Dispatch::Ignored;
        };
        platform.subtract_damage(damage);
        if window.is_bound() {
            window.dirty = true;
            Dispatch::Redraw
        } else {
            Dispatch::Ignored
        }
    }
}

/// Release bound resources and end the damage subscription
fn forget<P>(platform: &mut P, window: &mut TrackedWindow)
where
    P: WindowSystem + PixmapBinder,
{
    binder::release(platform, window);
    if let Some(damage) = window.damage.take() {
        platform.destroy_damage(damage);
    }
}
