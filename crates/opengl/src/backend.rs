use crate::opengl::{GlAtlas, GlProgram, GlVertexArray, VERTEX_ATTRIBUTES, apply_blend_flags, enable_debug};
use glow::HasContext;
use rdpshade_core::{
    AtlasRect, Backend, Batch, ProgramId, ProgramSlots,
    codegen::{UNIFORM_TEXTURE0, UNIFORM_TEXTURE1},
};
use std::{ffi::CStr, time::Duration};
use thiserror::Error;
use tracing::{debug, trace};

pub use crate::opengl::GlInfo as OpenGlInfo;
pub type OpenGlNativeBackend = OpenGlBackend<glow::Context>;

const ATLAS_TEXTURE_UNIT: u32 = 0;

#[derive(Debug, Clone, Error)]
pub enum OpenGlError {
    #[error("unsupported OpenGL version {}.{} ({})", .info.version.0, .info.version.1, .info.vendor)]
    UnsupportedVersion { info: OpenGlInfo },
    #[error("failed to compile {stage} shader: {log}")]
    ShaderCompile { stage: &'static str, log: String },
    #[error("failed to link program: {log}")]
    Link { log: String },
    #[error("failed to create {what}: {message}")]
    Resource { what: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct OpenGlOptions {
    /// Vertex shader source, it must declare the attributes named in
    /// [`VERTEX_ATTRIBUTES`](crate::VERTEX_ATTRIBUTES) and feed the fragment inputs
    pub vertex_shader: String,
    /// Text placed at the top of both shader stages, usually a `#version` line
    pub preamble: String,
    /// Width and height of the texture atlas in texels
    pub atlas_size: u32,
    /// Height of the framebuffer, used to flip viewports
    pub target_height: u32,
}

impl Default for OpenGlOptions {
    fn default() -> Self {
        Self {
            vertex_shader: String::new(),
            preamble: String::new(),
            atlas_size: 1024,
            target_height: 240,
        }
    }
}

/// A [`Backend`] drawing with OpenGL.
pub struct OpenGlBackend<T: HasContext> {
    options: OpenGlOptions,
    gl_context: T,
    gl_info: OpenGlInfo,
    gl_atlas: GlAtlas<T>,
    gl_vertex: GlVertexArray<T>,
    frames: u64,
}

unsafe impl<T: HasContext> Send for OpenGlBackend<T> {}

impl OpenGlBackend<glow::Context> {
    /// Creates a new OpenGL backend from a given loader function
    /// (a function that takes a GL function name and returns a pointer to that function).
    ///
    /// #### Error Conditions
    /// - If the version is not supported [`OpenGlError::UnsupportedVersion`] is returned.
    ///
    /// #### Safety
    /// This function should be called only if the OpenGL context is currently active for the current thread.
    pub unsafe fn new<F>(loader: F, options: OpenGlOptions) -> Result<Self, OpenGlError>
    where
        F: FnMut(&CStr) -> *const std::os::raw::c_void,
    {
        unsafe { Self::from_glow(glow::Context::from_loader_function_cstr(loader), options) }
    }
}

impl<T: HasContext> OpenGlBackend<T> {
    /// Creates a new OpenGL backend from a given `glow` context.
    ///
    /// See [`OpenGlBackend::new`] for more details.
    pub unsafe fn from_glow(mut gl_context: T, options: OpenGlOptions) -> Result<Self, OpenGlError> {
        let gl_info = OpenGlInfo::query(&gl_context);

        if !gl_info.is_baseline_supported(options.atlas_size) {
            return Err(OpenGlError::UnsupportedVersion { info: gl_info });
        }

        let gl_atlas = GlAtlas::new(&gl_context, options.atlas_size)?;
        let gl_vertex = match GlVertexArray::new(&gl_context) {
            Ok(gl_vertex) => gl_vertex,
            Err(err) => {
                gl_atlas.delete(&gl_context);
                return Err(err);
            }
        };

        if cfg!(debug_assertions) {
            enable_debug(&mut gl_context);
        }

        debug!(version = ?gl_info.version, gles = gl_info.is_gles, "created OpenGL backend");

        Ok(Self {
            options,
            gl_context,
            gl_info,
            gl_atlas,
            gl_vertex,
            frames: 0,
        })
    }

    pub fn info(&self) -> &OpenGlInfo {
        &self.gl_info
    }

    /// Number of frames presented so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Delete all the resources associated with the OpenGL backend.
    ///
    /// Compiled programs are owned by the caller, destroy them first.
    ///
    /// #### Safety
    /// This function should be called only if the OpenGL context is currently active for the current thread.
    pub unsafe fn delete(self) {
        self.gl_vertex.delete(&self.gl_context);
        self.gl_atlas.delete(&self.gl_context);
    }
}

impl<T: HasContext> Backend for OpenGlBackend<T> {
    type Program = GlProgram<T>;
    type Error = OpenGlError;

    fn upload_texture(&mut self, bounds: AtlasRect, pixels: &[u8]) -> Result<(), OpenGlError> {
        self.gl_atlas.upload(&self.gl_context, bounds, pixels);
        Ok(())
    }

    fn compile_program(&mut self, id: ProgramId, fragment_source: &str) -> Result<GlProgram<T>, OpenGlError> {
        let gl = &self.gl_context;
        let vertex_shader = format!("{}{}", self.options.preamble, self.options.vertex_shader);
        let fragment_shader = format!("{}{}", self.options.preamble, fragment_source);

        let program = GlProgram::compile(gl, &vertex_shader, &fragment_shader, &VERTEX_ATTRIBUTES)?;

        let binding = program.bind(gl);
        program.set_texture_sampler_binding(gl, UNIFORM_TEXTURE0, ATLAS_TEXTURE_UNIT);
        program.set_texture_sampler_binding(gl, UNIFORM_TEXTURE1, ATLAS_TEXTURE_UNIT);
        binding.unbind();

        trace!(id = id.0, "linked program");
        Ok(program)
    }

    fn destroy_program(&mut self, program: GlProgram<T>) {
        program.delete(&self.gl_context);
    }

    fn draw_batches(&mut self, batches: &[Batch], programs: &ProgramSlots<GlProgram<T>>) -> Result<(), OpenGlError> {
        let gl = &self.gl_context;
        self.gl_atlas.bind(gl, ATLAS_TEXTURE_UNIT);

        let vertex = self.gl_vertex.bind(gl);
        for batch in batches {
            let Some(program) = programs.get(batch.program) else {
                panic!("{} is not compiled", batch.program);
            };

            let _program = program.bind(gl);
            apply_blend_flags(gl, &batch.flags, self.options.target_height);
            vertex.draw_triangles(&batch.vertices);
        }

        Ok(())
    }

    fn present(&mut self, elapsed: Duration) -> Result<(), OpenGlError> {
        unsafe {
            self.gl_context.flush();
        }

        self.frames += 1;
        trace!(frame = self.frames, ?elapsed, "presented frame");
        Ok(())
    }
}
