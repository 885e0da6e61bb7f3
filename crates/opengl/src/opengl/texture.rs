use crate::backend::OpenGlError;
use glow::{
    CLAMP_TO_EDGE, HasContext, NEAREST, PixelUnpackData, RGBA, RGBA8, TEXTURE_2D, TEXTURE_MAG_FILTER,
    TEXTURE_MIN_FILTER, TEXTURE_WRAP_S, TEXTURE_WRAP_T, TEXTURE0, UNPACK_ALIGNMENT, UNSIGNED_BYTE,
};
use rdpshade_core::AtlasRect;

/// The square RGBA8 texture every cached texture is packed into.
pub struct GlAtlas<T: HasContext> {
    texture: T::Texture,
    size: u32,
}

impl<T: HasContext> GlAtlas<T> {
    pub fn new(gl: &T, size: u32) -> Result<Self, OpenGlError> {
        unsafe {
            let texture = gl
                .create_texture()
                .map_err(|message| OpenGlError::Resource { what: "atlas texture", message })?;

            gl.bind_texture(TEXTURE_2D, Some(texture));

            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_MIN_FILTER, NEAREST as _);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_MAG_FILTER, NEAREST as _);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_WRAP_T, CLAMP_TO_EDGE as _);
            gl.tex_parameter_i32(TEXTURE_2D, TEXTURE_WRAP_S, CLAMP_TO_EDGE as _);

            gl.tex_image_2d(
                TEXTURE_2D,
                0,
                RGBA8 as _,
                size as _,
                size as _,
                0,
                RGBA,
                UNSIGNED_BYTE,
                PixelUnpackData::Slice(None),
            );

            Ok(Self { texture, size })
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Copy tightly packed RGBA8 pixels into a rectangle of the atlas.
    pub fn upload(&self, gl: &T, bounds: AtlasRect, pixels: &[u8]) {
        assert!(
            bounds.x as u32 + bounds.width as u32 <= self.size && bounds.y as u32 + bounds.height as u32 <= self.size,
            "{bounds:?} is outside of the {0}x{0} atlas",
            self.size
        );
        assert_eq!(pixels.len(), bounds.area() * 4, "invalid RGBA8 data length for {bounds:?}");

        if bounds.is_empty() {
            return;
        }

        unsafe {
            gl.bind_texture(TEXTURE_2D, Some(self.texture));
            gl.pixel_store_i32(UNPACK_ALIGNMENT, 1);
            gl.tex_sub_image_2d(
                TEXTURE_2D,
                0,
                bounds.x as _,
                bounds.y as _,
                bounds.width as _,
                bounds.height as _,
                RGBA,
                UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    pub fn bind(&self, gl: &T, unit: u32) {
        unsafe {
            gl.active_texture(TEXTURE0 + unit);
            gl.bind_texture(TEXTURE_2D, Some(self.texture));
        }
    }

    pub fn delete(self, gl: &T) {
        unsafe {
            gl.delete_texture(self.texture);
        }
    }
}
