//! Pixmap/texture binding lifecycle
//!
//! Binding goes named pixmap, then GPU pixmap, then texture. A failing step
//! rolls back the earlier ones so a window never holds a partial set.

use crate::error::BindError;
use crate::fbconfig::FbConfigIndex;
use crate::platform::{PixmapBinder, WindowSystem};
use crate::window::{BoundResources, TrackedWindow};

/// Bind a window's contents as a texture
///
/// An already-bound window has its old set released first. The window is
/// re-queried so a race with unmapping fails cleanly.
pub fn bind<P>(
    platform: &mut P,
    index: &FbConfigIndex<P::Config>,
    window: &mut TrackedWindow,
) -> Result<(), BindError>
where
    P: WindowSystem + PixmapBinder,
{
    release(platform, window);

    let id = window.id;
    if !window.mapped {
        return Err(BindError::NotMapped(id));
    }
    if window.geometry.is_empty() {
        return Err(BindError::EmptySize(id));
    }

    let attrs = match platform.attributes(id) {
        Some(attrs) if attrs.viewable => attrs,
        _ => return Err(BindError::NotViewable(id)),
    };
    window.apply_attributes(&attrs);
    if window.geometry.is_empty() {
        return Err(BindError::EmptySize(id));
    }

    let config = *index
        .get(window.depth)
        .ok_or(BindError::UnsupportedDepth {
            window: id,
            depth: window.depth,
        })?;

    let pixmap = platform
        .name_pixmap(id)
        .map_err(|reason| BindError::NamePixmap { window: id, reason })?;

    let gpu_pixmap = match platform.create_gpu_pixmap(pixmap, &config) {
        Ok(gpu_pixmap) => gpu_pixmap,
        Err(reason) => {
            platform.free_pixmap(pixmap);
            return Err(BindError::GpuPixmap { window: id, reason });
        }
    };

    let texture = match platform.create_texture(gpu_pixmap) {
        Ok(texture) => texture,
        Err(reason) => {
            platform.destroy_gpu_pixmap(gpu_pixmap);
            platform.free_pixmap(pixmap);
            return Err(BindError::Texture { window: id, reason });
        }
    };

    window.bound = Some(BoundResources {
        pixmap,
        gpu_pixmap,
        texture,
    });
    window.dirty = false;
    Ok(())
}

/// Release a window's bound resources, if any
pub fn release<P: PixmapBinder + ?Sized>(platform: &mut P, window: &mut TrackedWindow) {
    let Some(resources) = window.bound.take() else {
        return;
    };
    platform.release_image(&resources);
    platform.delete_texture(resources.texture);
    platform.destroy_gpu_pixmap(resources.gpu_pixmap);
    platform.free_pixmap(resources.pixmap);
    window.dirty = false;
}

/// Refresh a dirty window's texture in place and clear the flag
pub fn refresh<P: PixmapBinder + ?Sized>(platform: &mut P, window: &mut TrackedWindow) {
    if !window.dirty {
        return;
    }
    if let Some(resources) = window.bound.as_ref() {
        platform.refresh_texture(resources);
    }
    window.dirty = false;
}
