use bytemuck::{Pod, Zeroable};

/// An 8-bit per channel RGBA color.
///
/// Used both for per-draw colors (primitive, environment, shade) and for the
/// constant pool entries of a [`ChannelFunction`](crate::ir::ChannelFunction).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const ZERO: Self = Self::splat(0);
    pub const ONE: Self = Self::splat(255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// A color with all four channels set to `x`
    pub const fn splat(x: u8) -> Self {
        Self::new(x, x, x, x)
    }

    /// Quantize a normalized floating point color, see [`quantize`]
    pub fn from_f32(color: [f32; 4]) -> Self {
        Self::new(
            quantize(color[0]),
            quantize(color[1]),
            quantize(color[2]),
            quantize(color[3]),
        )
    }

    /// Returns `true` if every channel equals `x`
    pub fn is_splat(&self, x: u8) -> bool {
        self.r == x && self.g == x && self.b == x && self.a == x
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// The color as normalized floats (`x / 255`)
    pub fn to_f32(self) -> [f32; 4] {
        self.to_array().map(|x| x as f32 / 255.0)
    }
}

impl From<[u8; 4]> for Rgba8 {
    fn from(value: [u8; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

/// Map a normalized float to a byte, rounding to nearest and clamping to `[0, 1]`.
pub fn quantize(x: f32) -> u8 {
    if x.is_nan() {
        return 0;
    }

    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// An axis aligned rectangle inside the texture atlas, in texels.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct AtlasRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl AtlasRect {
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<[u16; 4]> for AtlasRect {
    fn from(value: [u16; 4]) -> Self {
        Self {
            x: value[0],
            y: value[1],
            width: value[2],
            height: value[3],
        }
    }
}

/// A viewport rectangle in framebuffer pixels with origin in the top left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<[f32; 4]> for Viewport {
    fn from(value: [f32; 4]) -> Self {
        Self {
            x: value[0],
            y: value[1],
            width: value[2],
            height: value[3],
        }
    }
}
