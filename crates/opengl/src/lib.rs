mod backend;
mod opengl;

pub use backend::{OpenGlBackend, OpenGlError, OpenGlInfo, OpenGlNativeBackend, OpenGlOptions};
pub use opengl::VERTEX_ATTRIBUTES;
