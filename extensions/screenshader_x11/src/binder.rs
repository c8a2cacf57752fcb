//! Texture-from-pixmap binding
//!
//! Pixmaps are named on the x11rb connection and wrapped as GLX pixmaps on
//! the Xlib one. Textures use linear filtering and clamp at the edges.

use screenshader_core::{
    BoundResources, DepthConfig, FbConfigCandidate, GpuPixmapId, PixmapBinder, PixmapId,
    TextureId, WindowId,
};

use crate::glx::FbConfig;
use crate::xerror;
use crate::X11Platform;

fn configure_texture(texture: u32) {
    unsafe {
        gl::BindTexture(gl::TEXTURE_2D, texture);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as i32);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as i32);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as i32);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as i32);
    }
}

impl PixmapBinder for X11Platform {
    type Config = FbConfig;

    fn texture_configs(&mut self) -> Vec<FbConfigCandidate<FbConfig>> {
        self.glx.texture_configs()
    }

    fn name_pixmap(&mut self, window: WindowId) -> Result<PixmapId, String> {
        self.display.name_window_pixmap(window)
    }

    fn create_gpu_pixmap(
        &mut self,
        pixmap: PixmapId,
        config: &DepthConfig<FbConfig>,
    ) -> Result<GpuPixmapId, String> {
        self.glx.create_pixmap(pixmap, config)
    }

    fn create_texture(&mut self, gpu_pixmap: GpuPixmapId) -> Result<TextureId, String> {
        let mut texture = 0;
        unsafe { gl::GenTextures(1, &mut texture) };
        configure_texture(texture);
        let error = self.glx.bind_image(gpu_pixmap);
        unsafe { gl::BindTexture(gl::TEXTURE_2D, 0) };

        if let Some(code) = error {
            unsafe { gl::DeleteTextures(1, &texture) };
            return Err(format!("glXBindTexImageEXT: {}", xerror::describe(code)));
        }
        Ok(TextureId(texture))
    }

    fn refresh_texture(&mut self, resources: &BoundResources) {
        unsafe { gl::BindTexture(gl::TEXTURE_2D, resources.texture.0) };
        self.glx.rebind_image(resources.gpu_pixmap);
        unsafe { gl::BindTexture(gl::TEXTURE_2D, 0) };
    }

    fn release_image(&mut self, resources: &BoundResources) {
        unsafe { gl::BindTexture(gl::TEXTURE_2D, resources.texture.0) };
        self.glx.release_image(resources.gpu_pixmap);
        unsafe { gl::BindTexture(gl::TEXTURE_2D, 0) };
    }

    fn delete_texture(&mut self, texture: TextureId) {
        unsafe { gl::DeleteTextures(1, &texture.0) };
    }

    fn destroy_gpu_pixmap(&mut self, gpu_pixmap: GpuPixmapId) {
        self.glx.destroy_pixmap(gpu_pixmap);
    }

    fn free_pixmap(&mut self, pixmap: PixmapId) {
        self.display.free_pixmap(pixmap);
    }
}
