//! Emulation of the N64 RDP color combiner on programmable GPUs.
//!
//! The producer side ([`Renderer`]) decodes combiner state into small optimized
//! programs and records frames, the consumer side ([`Executor`]) turns them into
//! shader source and drives a [`Backend`].

pub use rdpshade_core::*;

#[cfg(feature = "opengl")]
pub use rdpshade_opengl as opengl;
