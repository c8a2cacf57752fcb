//! Window registry
//!
//! Tracked windows live in a slotmap arena. Stacking order is an explicit
//! bottom-to-top sequence of keys, and an identity index maps server window
//! ids to keys.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::window::{TrackedWindow, WindowId};

new_key_type! {
    /// Generation-checked handle to a tracked window
    pub struct WindowKey;
}

/// Where a restack request placed the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restack {
    /// Already directly above the reported sibling
    Unchanged,
    /// Moved directly above the reported sibling
    Above(WindowId),
    /// No sibling given, moved to the bottom
    Bottom,
    /// Sibling is not tracked, moved to the top
    TopFallback,
}

/// Ordered collection of tracked windows, bottom to top
#[derive(Debug, Default)]
pub struct Registry {
    windows: SlotMap<WindowKey, TrackedWindow>,
    order: Vec<WindowKey>,
    index: FxHashMap<WindowId, WindowKey>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            windows: SlotMap::with_key(),
            order: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Insert a new window at the top of the stack
    ///
    /// Returns `None` if the id is already tracked.
    pub fn insert_top(&mut self, window: TrackedWindow) -> Option<WindowKey> {
        if self.index.contains_key(&window.id) {
            return None;
        }
        let id = window.id;
        let key = self.windows.insert(window);
        self.order.push(key);
        self.index.insert(id, key);
        Some(key)
    }

    /// Unlink and return a window
    pub fn remove(&mut self, id: WindowId) -> Option<TrackedWindow> {
        let key = self.index.remove(&id)?;
        self.unlink(key);
        self.windows.remove(key)
    }

    pub fn key(&self, id: WindowId) -> Option<WindowKey> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: WindowId) -> Option<&TrackedWindow> {
        self.key(id).and_then(|key| self.windows.get(key))
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut TrackedWindow> {
        let key = self.key(id)?;
        self.windows.get_mut(key)
    }

    pub fn get_by_key(&self, key: WindowKey) -> Option<&TrackedWindow> {
        self.windows.get(key)
    }

    pub fn get_by_key_mut(&mut self, key: WindowKey) -> Option<&mut TrackedWindow> {
        self.windows.get_mut(key)
    }

    /// Window directly below `id`, if any
    pub fn predecessor(&self, id: WindowId) -> Option<WindowId> {
        let pos = self.position(id)?;
        let below = *self.order.get(pos.checked_sub(1)?)?;
        self.windows.get(below).map(|w| w.id)
    }

    /// Place `id` directly above `above`
    ///
    /// With no sibling the window goes to the bottom. A sibling that is not
    /// tracked puts the window on top, which approximates the server's order
    /// but cannot reconstruct it in general.
    pub fn restack(&mut self, id: WindowId, above: Option<WindowId>) -> Option<Restack> {
        let key = self.key(id)?;
        if self.predecessor(id) == above && above.is_some() {
            return Some(Restack::Unchanged);
        }

        match above {
            None => {
                if self.order.first() == Some(&key) {
                    return Some(Restack::Unchanged);
                }
                self.unlink(key);
                self.order.insert(0, key);
                Some(Restack::Bottom)
            }
            Some(sibling) if sibling != id => match self.key(sibling) {
                Some(sibling_key) => {
                    self.unlink(key);
                    let pos = self
                        .order
                        .iter()
                        .position(|k| *k == sibling_key)
                        .map_or(self.order.len(), |p| p + 1);
                    self.order.insert(pos, key);
                    Some(Restack::Above(sibling))
                }
                None => {
                    self.unlink(key);
                    self.order.push(key);
                    Some(Restack::TopFallback)
                }
            },
            Some(_) => Some(Restack::Unchanged),
        }
    }

    pub fn raise_top(&mut self, id: WindowId) -> bool {
        let Some(key) = self.key(id) else {
            return false;
        };
        self.unlink(key);
        self.order.push(key);
        true
    }

    pub fn lower_bottom(&mut self, id: WindowId) -> bool {
        let Some(key) = self.key(id) else {
            return false;
        };
        self.unlink(key);
        self.order.insert(0, key);
        true
    }

    /// Windows bottom to top
    pub fn iter(&self) -> impl Iterator<Item = &TrackedWindow> {
        self.order.iter().filter_map(|key| self.windows.get(*key))
    }

    /// Keys bottom to top
    pub fn keys(&self) -> impl Iterator<Item = WindowKey> + '_ {
        self.order.iter().copied()
    }

    /// Window ids bottom to top
    pub fn ids(&self) -> Vec<WindowId> {
        self.iter().map(|w| w.id).collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Remove every window, returning them bottom to top
    pub fn drain(&mut self) -> Vec<TrackedWindow> {
        let order = std::mem::take(&mut self.order);
        self.index.clear();
        let drained = order
            .into_iter()
            .filter_map(|key| self.windows.remove(key))
            .collect();
        self.windows.clear();
        drained
    }

    fn position(&self, id: WindowId) -> Option<usize> {
        let key = self.key(id)?;
        self.order.iter().position(|k| *k == key)
    }

    fn unlink(&mut self, key: WindowKey) {
        self.order.retain(|k| *k != key);
    }
}
