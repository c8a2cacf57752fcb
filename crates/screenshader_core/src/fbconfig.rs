//! Depth-indexed table of surface configurations usable for pixmap binding

/// Number of depth slots (0 through 32)
pub const MAX_DEPTH: usize = 33;

/// Texture format a pixmap is bound with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb,
    Rgba,
}

/// Configuration selected for one depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthConfig<C: Copy> {
    pub config: C,
    pub format: TextureFormat,
}

/// One enumerated configuration with the attributes the resolver checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FbConfigCandidate<C: Copy> {
    pub config: C,
    pub pixmap_drawable: bool,
    pub texture_2d_target: bool,
    pub double_buffered: bool,
    pub bind_rgb: bool,
    pub bind_rgba: bool,
    /// Depth of the associated visual, `None` if it has none
    pub depth: Option<u8>,
}

impl<C: Copy> FbConfigCandidate<C> {
    fn usable(&self) -> Option<(usize, TextureFormat)> {
        if !self.pixmap_drawable || !self.texture_2d_target || self.double_buffered {
            return None;
        }
        let depth = usize::from(self.depth?);
        if depth == 0 || depth >= MAX_DEPTH {
            return None;
        }
        let format = if self.bind_rgba {
            TextureFormat::Rgba
        } else if self.bind_rgb {
            TextureFormat::Rgb
        } else {
            return None;
        };
        Some((depth, format))
    }
}

/// Read-only after construction
#[derive(Debug, Clone)]
pub struct FbConfigIndex<C: Copy> {
    slots: [Option<DepthConfig<C>>; MAX_DEPTH],
}

impl<C: Copy> FbConfigIndex<C> {
    /// Build the index, keeping the first usable candidate per depth
    pub fn from_candidates<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = FbConfigCandidate<C>>,
    {
        let mut slots = [None; MAX_DEPTH];
        for candidate in candidates {
            let Some((depth, format)) = candidate.usable() else {
                continue;
            };
            if slots[depth].is_none() {
                slots[depth] = Some(DepthConfig {
                    config: candidate.config,
                    format,
                });
            }
        }
        Self { slots }
    }

    pub fn get(&self, depth: u8) -> Option<&DepthConfig<C>> {
        self.slots.get(usize::from(depth))?.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn available_depths(&self) -> Vec<u8> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(depth, _)| depth as u8)
            .collect()
    }
}
