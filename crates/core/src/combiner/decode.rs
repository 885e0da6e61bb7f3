use super::{AlphaSource, CombinerDescriptor, CombinerStage, DrawMode, RgbSource};
use tracing::trace;

/// Raw mux selectors of one combiner stage, as found in the combine register.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct RawStage {
    pub a: u8,
    pub b: u8,
    pub m: u8,
    pub n: u8,
}

/// The raw combine register, split into its sixteen mux fields.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct RawCombiner {
    pub rgb: [RawStage; 2],
    pub alpha: [RawStage; 2],
}

const SA_RGB: [RgbSource; 16] = {
    use RgbSource::*;
    [
        Combined, Texel0, Texel1, Primitive, Shade, Environment, Noise, One, //
        Zero, Zero, Zero, Zero, Zero, Zero, Zero, Zero,
    ]
};

const SB_RGB: [RgbSource; 16] = {
    use RgbSource::*;
    [
        Combined, Texel0, Texel1, Primitive, Shade, Environment, Center, K4, //
        Zero, Zero, Zero, Zero, Zero, Zero, Zero, Zero,
    ]
};

const M_RGB: [RgbSource; 32] = {
    use RgbSource::*;
    [
        Combined,
        Texel0,
        Texel1,
        Primitive,
        Shade,
        Environment,
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
        Zero, Zero, Zero, Zero, Zero, Zero, Zero, Zero, //
        Zero, Zero, Zero, Zero, Zero, Zero, Zero, Zero,
    ]
};

const N_RGB: [RgbSource; 8] = {
    use RgbSource::*;
    [Combined, Texel0, Texel1, Primitive, Shade, Environment, One, Zero]
};

const SA_ALPHA: [AlphaSource; 8] = {
    use AlphaSource::*;
    [Combined, Texel0, Texel1, Primitive, Shade, Environment, One, Zero]
};

const SB_ALPHA: [AlphaSource; 8] = SA_ALPHA;

const M_ALPHA: [AlphaSource; 8] = {
    use AlphaSource::*;
    [LodFraction, Texel0, Texel1, Primitive, Shade, Environment, PrimitiveLodFraction, Zero]
};

const N_ALPHA: [AlphaSource; 8] = SA_ALPHA;

const BLIT: CombinerDescriptor = {
    let rgb = CombinerStage::new(RgbSource::Zero, RgbSource::Zero, RgbSource::Zero, RgbSource::Texel0);
    let alpha = CombinerStage::new(AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Texel0);
    CombinerDescriptor {
        rgb: [rgb, rgb],
        alpha: [alpha, alpha],
    }
};

const FILL: CombinerDescriptor = {
    let rgb = CombinerStage::new(RgbSource::Zero, RgbSource::Zero, RgbSource::Zero, RgbSource::Shade);
    let alpha = CombinerStage::new(AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Zero, AlphaSource::One);
    CombinerDescriptor {
        rgb: [rgb, rgb],
        alpha: [alpha, alpha],
    }
};

impl RawCombiner {
    /// Split the two words of a `SETCOMBINE` command into mux fields.
    ///
    /// `mux0` holds the low 24 bits of the first command word, `mux1` the second word.
    pub fn unpack(mux0: u32, mux1: u32) -> Self {
        let field = |word: u32, shift: u32, bits: u32| ((word >> shift) & ((1 << bits) - 1)) as u8;

        Self {
            rgb: [
                RawStage {
                    a: field(mux0, 20, 4),
                    b: field(mux1, 28, 4),
                    m: field(mux0, 15, 5),
                    n: field(mux1, 15, 3),
                },
                RawStage {
                    a: field(mux0, 5, 4),
                    b: field(mux1, 24, 4),
                    m: field(mux0, 0, 5),
                    n: field(mux1, 6, 3),
                },
            ],
            alpha: [
                RawStage {
                    a: field(mux0, 12, 3),
                    b: field(mux1, 12, 3),
                    m: field(mux0, 9, 3),
                    n: field(mux1, 9, 3),
                },
                RawStage {
                    a: field(mux1, 21, 3),
                    b: field(mux1, 3, 3),
                    m: field(mux1, 18, 3),
                    n: field(mux1, 0, 3),
                },
            ],
        }
    }

    /// Decode the raw fields into mux sources.
    ///
    /// Texture blits and rectangle fills ignore the register and use a fixed combiner.
    /// Selector values outside of a table read as zero.
    pub fn decode(&self, mode: DrawMode) -> CombinerDescriptor {
        let descriptor = match mode {
            DrawMode::TextureBlit => BLIT,
            DrawMode::RectFill => FILL,
            DrawMode::Normal => CombinerDescriptor {
                rgb: self.rgb.map(|stage| CombinerStage {
                    a: lookup(&SA_RGB, stage.a, RgbSource::Zero),
                    b: lookup(&SB_RGB, stage.b, RgbSource::Zero),
                    m: lookup(&M_RGB, stage.m, RgbSource::Zero),
                    n: lookup(&N_RGB, stage.n, RgbSource::Zero),
                }),
                alpha: self.alpha.map(|stage| CombinerStage {
                    a: lookup(&SA_ALPHA, stage.a, AlphaSource::Zero),
                    b: lookup(&SB_ALPHA, stage.b, AlphaSource::Zero),
                    m: lookup(&M_ALPHA, stage.m, AlphaSource::Zero),
                    n: lookup(&N_ALPHA, stage.n, AlphaSource::Zero),
                }),
            },
        };

        trace!(?mode, combiner = %descriptor, "decoded combiner");
        descriptor
    }
}

fn lookup<S: Copy>(table: &[S], raw: u8, fallback: S) -> S {
    table.get(raw as usize).copied().unwrap_or(fallback)
}
