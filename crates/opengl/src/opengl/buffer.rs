use crate::backend::OpenGlError;
use glow::{ARRAY_BUFFER, FLOAT, HasContext, SHORT, STREAM_DRAW, TRIANGLES, UNSIGNED_BYTE};
use rdpshade_core::Vertex;
use std::mem::offset_of;

/// Names of the vertex attributes, the index is the attribute location.
pub const VERTEX_ATTRIBUTES: [&str; 8] = [
    "aPosition",
    "aTextureUv",
    "aTexture0Bounds",
    "aTexture1Bounds",
    "aShade",
    "aPrimitive",
    "aEnvironment",
    "aSubprogram",
];

struct Attribute {
    size: i32,
    data_type: u32,
    normalized: bool,
    offset: usize,
}

const LAYOUT: [Attribute; 8] = [
    Attribute { size: 4, data_type: FLOAT, normalized: false, offset: offset_of!(Vertex, position) },
    Attribute { size: 2, data_type: FLOAT, normalized: false, offset: offset_of!(Vertex, texture_uv) },
    Attribute { size: 4, data_type: SHORT, normalized: false, offset: offset_of!(Vertex, texture0_bounds) },
    Attribute { size: 4, data_type: SHORT, normalized: false, offset: offset_of!(Vertex, texture1_bounds) },
    Attribute { size: 4, data_type: UNSIGNED_BYTE, normalized: true, offset: offset_of!(Vertex, shade) },
    Attribute { size: 4, data_type: UNSIGNED_BYTE, normalized: true, offset: offset_of!(Vertex, primitive) },
    Attribute { size: 4, data_type: UNSIGNED_BYTE, normalized: true, offset: offset_of!(Vertex, environment) },
    // subprogram select and alpha threshold, read as raw bytes
    Attribute { size: 2, data_type: UNSIGNED_BYTE, normalized: false, offset: offset_of!(Vertex, subprogram) },
];

/// A vertex array object with one streamed vertex buffer in the [`Vertex`] layout.
pub struct GlVertexArray<T: HasContext> {
    array: T::VertexArray,
    buffer: T::Buffer,
}

pub struct GlVertexArrayBinding<'a, T: HasContext> {
    array: &'a GlVertexArray<T>,
    gl: &'a T,
}

impl<T: HasContext> GlVertexArray<T> {
    pub fn new(gl: &T) -> Result<Self, OpenGlError> {
        unsafe {
            let array = gl
                .create_vertex_array()
                .map_err(|message| OpenGlError::Resource { what: "vertex array", message })?;
            let buffer = match gl.create_buffer() {
                Ok(buffer) => buffer,
                Err(message) => {
                    gl.delete_vertex_array(array);
                    return Err(OpenGlError::Resource { what: "vertex buffer", message });
                }
            };

            gl.bind_vertex_array(Some(array));
            gl.bind_buffer(ARRAY_BUFFER, Some(buffer));

            let stride = size_of::<Vertex>() as i32;
            for (index, attribute) in LAYOUT.iter().enumerate() {
                gl.enable_vertex_attrib_array(index as u32);
                gl.vertex_attrib_pointer_f32(
                    index as u32,
                    attribute.size,
                    attribute.data_type,
                    attribute.normalized,
                    stride,
                    attribute.offset as i32,
                );
            }

            gl.bind_vertex_array(None);

            Ok(Self { array, buffer })
        }
    }

    pub fn bind<'a>(&'a self, gl: &'a T) -> GlVertexArrayBinding<'a, T> {
        unsafe {
            gl.bind_vertex_array(Some(self.array));
        }

        GlVertexArrayBinding { array: self, gl }
    }

    pub fn delete(self, gl: &T) {
        unsafe {
            gl.delete_vertex_array(self.array);
            gl.delete_buffer(self.buffer);
        }
    }
}

impl<T: HasContext> GlVertexArrayBinding<'_, T> {
    /// Replace the buffer contents with `vertices` and draw them as triangles.
    pub fn draw_triangles(&self, vertices: &[Vertex]) {
        if vertices.is_empty() {
            return;
        }

        unsafe {
            self.gl.bind_buffer(ARRAY_BUFFER, Some(self.array.buffer));
            self.gl
                .buffer_data_u8_slice(ARRAY_BUFFER, bytemuck::cast_slice(vertices), STREAM_DRAW);
            self.gl.draw_arrays(TRIANGLES, 0, vertices.len() as i32);
        }
    }
}

impl<T: HasContext> Drop for GlVertexArrayBinding<'_, T> {
    fn drop(&mut self) {
        unsafe {
            self.gl.bind_vertex_array(None);
        }
    }
}
