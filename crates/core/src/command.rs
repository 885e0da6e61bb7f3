use crate::{
    AtlasRect, Rgba8, Viewport,
    combiner::DrawMode,
    program::{Program, ProgramId},
};
use bytemuck::{Pod, Zeroable};
use std::{sync::Arc, time::Duration};

/// A single command sent from the producer to the rendering thread.
///
/// Commands are executed strictly in the order they were pushed.
#[derive(Clone, Debug)]
pub enum Command {
    /// Copy RGBA8 pixels into the texture atlas.
    UploadTexture(TextureUpload),
    /// Generate and compile the shader of a program into its slot.
    CompileProgram(Arc<Program>),
    /// Delete the compiled program in a slot, freeing it for reuse.
    DestroyProgram(ProgramId),
    /// Draw batches, every referenced program must be compiled by then.
    DrawBatches(Vec<Batch>),
    /// The frame is complete.
    Present { elapsed: Duration },
}

#[derive(Clone, Debug)]
pub struct TextureUpload {
    pub bounds: AtlasRect,
    /// Tightly packed RGBA8 rows, `bounds.area() * 4` bytes
    pub pixels: Vec<u8>,
}

/// Vertex as consumed by the vertex stage.
///
/// `subprogram` is the dense per-batch branch index, not a global subprogram id.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub texture_uv: [f32; 2],
    pub texture0_bounds: [i16; 4],
    pub texture1_bounds: [i16; 4],
    pub shade: Rgba8,
    pub primitive: Rgba8,
    pub environment: Rgba8,
    pub subprogram: u8,
    pub alpha_threshold: u8,
    pub _padding: [u8; 2],
}

/// Cycle type from the other mode register.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum CycleType {
    #[default]
    One,
    Two,
    Copy,
    Fill,
}

/// Fixed function blending applied to a batch.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    Disabled,
    /// `ONE, ONE`
    Add,
    /// `ONE, ZERO`
    Opaque,
    /// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`
    Interpolated,
    /// `ZERO, ONE`
    KeepDestination,
}

impl BlendMode {
    /// Pick the blend mode for the current draw from the other mode register.
    ///
    /// `blender` is the upper half of the low other mode word.
    pub fn select(mode: DrawMode, cycle: CycleType, force_blender: bool, alpha_cvg_sel: bool, blender: u16) -> Self {
        if mode == DrawMode::TextureBlit || cycle == CycleType::Fill {
            return BlendMode::Interpolated;
        }

        if !force_blender || cycle == CycleType::Copy || alpha_cvg_sel {
            return BlendMode::Disabled;
        }

        match blender {
            0x0448 | 0x055a => BlendMode::Add,
            0x0c08 | 0x0f0a => BlendMode::Opaque,
            0x0fa5 | 0x5055 => BlendMode::KeepDestination,
            // 0xc810, 0xc811 fog; 0x0c18, 0x0050 interpolation; 0x0c19, 0x0055 antialiasing
            _ => BlendMode::Interpolated,
        }
    }
}

/// Render state shared by every vertex of a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlendFlags {
    pub z_test: bool,
    pub z_update: bool,
    pub blend_mode: BlendMode,
    pub viewport: Viewport,
}

/// Vertices drawn with one program and one render state.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub vertices: Vec<Vertex>,
    pub flags: BlendFlags,
    pub program: ProgramId,
}

impl Batch {
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}
