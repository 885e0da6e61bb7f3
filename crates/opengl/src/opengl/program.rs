use crate::backend::OpenGlError;
use glow::{FRAGMENT_SHADER, HasContext, VERTEX_SHADER};

pub struct GlProgram<T: HasContext> {
    program: T::Program,
}

pub struct GlProgramBinding<'a, T: HasContext> {
    _program: &'a GlProgram<T>,
    gl: &'a T,
}

impl<T: HasContext> GlProgram<T> {
    /// Compile and link a program, binding `attributes[i]` to attribute location `i`.
    pub fn compile(
        gl: &T,
        vertex_shader: &str,
        fragment_shader: &str,
        attributes: &[&str],
    ) -> Result<Self, OpenGlError> {
        unsafe {
            let program = gl
                .create_program()
                .map_err(|message| OpenGlError::Resource { what: "program", message })?;

            let shader_sources = [
                ("vertex", VERTEX_SHADER, vertex_shader),
                ("fragment", FRAGMENT_SHADER, fragment_shader),
            ];

            let mut shaders = Vec::with_capacity(shader_sources.len());
            let mut result = Ok(());
            for (stage, shader_type, shader_source) in shader_sources {
                let shader = match gl.create_shader(shader_type) {
                    Ok(shader) => shader,
                    Err(message) => {
                        result = Err(OpenGlError::Resource { what: "shader", message });
                        break;
                    }
                };

                gl.shader_source(shader, shader_source);
                gl.compile_shader(shader);
                shaders.push(shader);

                if !gl.get_shader_compile_status(shader) {
                    result = Err(OpenGlError::ShaderCompile {
                        stage,
                        log: gl.get_shader_info_log(shader),
                    });
                    break;
                }

                gl.attach_shader(program, shader);
            }

            if result.is_ok() {
                for (index, name) in attributes.iter().enumerate() {
                    gl.bind_attrib_location(program, index as u32, name);
                }

                gl.link_program(program);
                if !gl.get_program_link_status(program) {
                    result = Err(OpenGlError::Link {
                        log: gl.get_program_info_log(program),
                    });
                }
            }

            for shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }

            match result {
                Ok(()) => Ok(Self { program }),
                Err(err) => {
                    gl.delete_program(program);
                    Err(err)
                }
            }
        }
    }

    /// Point a sampler uniform at a texture unit, the program must be bound.
    pub fn set_texture_sampler_binding(&self, gl: &T, name: &str, unit: u32) {
        unsafe {
            if let Some(location) = gl.get_uniform_location(self.program, name) {
                gl.uniform_1_i32(Some(&location), unit as i32);
            }
        }
    }

    pub fn bind<'a>(&'a self, gl: &'a T) -> GlProgramBinding<'a, T> {
        unsafe {
            gl.use_program(Some(self.program));
        }

        GlProgramBinding { _program: self, gl }
    }

    pub fn delete(self, gl: &T) {
        unsafe {
            gl.delete_program(self.program);
        }
    }
}

impl<T: HasContext> GlProgramBinding<'_, T> {
    pub fn unbind(self) {
        unsafe {
            self.gl.use_program(None);
        }
    }
}
