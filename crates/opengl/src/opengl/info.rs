use glow::{HasContext, MAX_TEXTURE_IMAGE_UNITS, MAX_TEXTURE_SIZE, MAX_VERTEX_ATTRIBS};
use std::collections::HashSet;

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GlInfo {
    pub version: (u32, u32),
    pub is_gles: bool,

    pub vendor: String,
    pub extensions: HashSet<String>,

    pub max_texture_size: u32,
    pub max_texture_units: u32,
    pub max_vertex_attribs: u32,
}

impl GlInfo {
    pub fn query(gl: &impl HasContext) -> Self {
        unsafe {
            let version = gl.version();
            let max_texture_size = gl.get_parameter_i32(MAX_TEXTURE_SIZE as _) as u32;
            let max_texture_units = gl.get_parameter_i32(MAX_TEXTURE_IMAGE_UNITS as _) as u32;
            let max_vertex_attribs = gl.get_parameter_i32(MAX_VERTEX_ATTRIBS as _) as u32;

            Self {
                version: (version.major, version.minor),
                is_gles: version.is_embedded,

                vendor: version.vendor_info.clone(),
                extensions: gl.supported_extensions().clone(),

                max_texture_size,
                max_texture_units,
                max_vertex_attribs,
            }
        }
    }

    /// Everything the backend needs: vertex array objects, eight vertex attributes
    /// and an atlas of at least `atlas_size` texels square.
    pub(crate) fn is_baseline_supported(&self, atlas_size: u32) -> bool {
        let vertex_arrays = if self.is_gles {
            self.version >= (3, 0) || self.extensions.contains("GL_OES_vertex_array_object")
        } else {
            self.version >= (3, 0) || self.extensions.contains("GL_ARB_vertex_array_object")
        };

        self.version >= (2, 0)
            && vertex_arrays
            && self.max_vertex_attribs >= 8
            && self.max_texture_size >= atlas_size
    }
}
