mod decode;

use crate::{Rgba8, ir::Special};
use std::fmt::{Display, Formatter, Result as FmtResult};

pub use decode::*;

/// Inputs selectable into the RGB half of a combiner stage.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum RgbSource {
    Combined,
    Texel0,
    Texel1,
    Primitive,
    Shade,
    Environment,
    One,
    Zero,
    Noise,
    Center,
    K4,
    Scale,
    CombinedAlpha,
    Texel0Alpha,
    Texel1Alpha,
    PrimitiveAlpha,
    ShadeAlpha,
    EnvironmentAlpha,
    LodFraction,
    PrimitiveLodFraction,
    K5,
}

/// Inputs selectable into the alpha half of a combiner stage.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlphaSource {
    Combined,
    Texel0,
    Texel1,
    Primitive,
    Shade,
    Environment,
    One,
    Zero,
    LodFraction,
    PrimitiveLodFraction,
}

/// What a mux source turns into once the draw context is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// The result of the previous cycle, if there is one
    Combined,
    /// A per-pixel shader input
    Special(Special),
    /// A color fixed for the whole draw
    Constant(Rgba8),
    /// A source we do not emulate, it reads as zero
    Unsupported,
}

/// A source that can be selected into one of the four combiner inputs.
pub trait MuxOperand: Copy + Display {
    fn lower(self, context: &ShaderContext) -> Operand;
}

impl MuxOperand for RgbSource {
    fn lower(self, context: &ShaderContext) -> Operand {
        use RgbSource::*;
        match self {
            // TODO: COMBINED_ALPHA should read the alpha of the previous cycle, not its color
            Combined | CombinedAlpha => Operand::Combined,
            Texel0 => Operand::Special(Special::Texel0),
            Texel0Alpha => Operand::Special(Special::Texel0Alpha),
            Texel1 => Operand::Special(Special::Texel1),
            Texel1Alpha => Operand::Special(Special::Texel1Alpha),
            Shade => Operand::Special(Special::Shade),
            Primitive => Operand::Constant(context.primitive),
            Environment => Operand::Constant(context.environment),
            PrimitiveAlpha => Operand::Constant(Rgba8::splat(context.primitive.a)),
            EnvironmentAlpha => Operand::Constant(Rgba8::splat(context.environment.a)),
            Zero => Operand::Constant(Rgba8::ZERO),
            One => Operand::Constant(Rgba8::ONE),
            Noise | Center | K4 | Scale | ShadeAlpha | LodFraction | PrimitiveLodFraction | K5 => {
                Operand::Unsupported
            }
        }
    }
}

impl MuxOperand for AlphaSource {
    fn lower(self, context: &ShaderContext) -> Operand {
        use AlphaSource::*;
        match self {
            Combined => Operand::Combined,
            Texel0 => Operand::Special(Special::Texel0),
            Texel1 => Operand::Special(Special::Texel1),
            Shade => Operand::Special(Special::Shade),
            Primitive => Operand::Constant(context.primitive),
            Environment => Operand::Constant(context.environment),
            Zero => Operand::Constant(Rgba8::ZERO),
            One => Operand::Constant(Rgba8::ONE),
            LodFraction | PrimitiveLodFraction => Operand::Unsupported,
        }
    }
}

impl Display for RgbSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        use RgbSource::*;
        f.write_str(match self {
            Combined => "COMBINED",
            Texel0 => "TEXEL0",
            Texel1 => "TEXEL1",
            Primitive => "PRIMITIVE",
            Shade => "SHADE",
            Environment => "ENVIRONMENT",
            One => "1",
            Zero => "0",
            Noise => "NOISE",
            Center => "CENTER",
            K4 => "K4",
            Scale => "SCALE",
            CombinedAlpha => "COMBINED_ALPHA",
            Texel0Alpha => "TEXEL0_ALPHA",
            Texel1Alpha => "TEXEL1_ALPHA",
            PrimitiveAlpha => "PRIMITIVE_ALPHA",
            ShadeAlpha => "SHADE_ALPHA",
            EnvironmentAlpha => "ENV_ALPHA",
            LodFraction => "LOD_FRACTION",
            PrimitiveLodFraction => "PRIM_LOD_FRAC",
            K5 => "K5",
        })
    }
}

impl Display for AlphaSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        use AlphaSource::*;
        f.write_str(match self {
            Combined => "COMBINED",
            Texel0 => "TEXEL0",
            Texel1 => "TEXEL1",
            Primitive => "PRIMITIVE",
            Shade => "SHADE",
            Environment => "ENVIRONMENT",
            One => "1",
            Zero => "0",
            LodFraction => "LOD_FRACTION",
            PrimitiveLodFraction => "PRIM_LOD_FRAC",
        })
    }
}

/// One combiner equation, `(a - b) * m + n`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct CombinerStage<S> {
    pub a: S,
    pub b: S,
    pub m: S,
    pub n: S,
}

impl<S> CombinerStage<S> {
    pub const fn new(a: S, b: S, m: S, n: S) -> Self {
        Self { a, b, m, n }
    }
}

impl<S: Display> Display for CombinerStage<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "({} - {}) * {} + {}", self.a, self.b, self.m, self.n)
    }
}

/// The decoded combiner: both channel groups for both cycles.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct CombinerDescriptor {
    pub rgb: [CombinerStage<RgbSource>; 2],
    pub alpha: [CombinerStage<AlphaSource>; 2],
}

impl Display for CombinerDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "rgb: {} ; {}, alpha: {} ; {}",
            self.rgb[0], self.rgb[1], self.alpha[0], self.alpha[1]
        )
    }
}

/// Per-draw state that affects code generation.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct ShaderContext {
    pub primitive: Rgba8,
    pub environment: Rgba8,
    /// Whether the second combiner cycle is evaluated
    pub two_cycle: bool,
}

/// How the current primitive is drawn.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum DrawMode {
    #[default]
    Normal,
    /// A textured rectangle copied straight from texture memory
    TextureBlit,
    /// A rectangle filled with the fill color
    RectFill,
}
