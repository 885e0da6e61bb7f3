use crate::Rgba8;
use bumpalo::Bump;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::trace;

mod builder;
mod compact;
mod deadcode;
mod peephole;
mod propagate;

pub use builder::build_function;
pub use compact::{merge_constants, renumber_registers};
pub use deadcode::eliminate_dead_code;
pub use peephole::optimize_peephole;
pub use propagate::{propagate_copies, propagate_constants};

/// Most instructions a single channel function may hold.
pub const MAX_INSTRUCTIONS: usize = 16;
/// Most constants a single channel function may hold.
pub const MAX_CONSTANTS: usize = 16;

/// Fixed shader inputs and the channel output.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Special {
    Texel0,
    Texel0Alpha,
    Texel1,
    Texel1Alpha,
    Shade,
    Output,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Register(u8),
    /// Index into the constant pool of the owning function
    Constant(u8),
    Special(Special),
}

impl Value {
    pub fn register(self) -> Option<u8> {
        match self {
            Value::Register(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_register(self) -> bool {
        matches!(self, Value::Register(_))
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Opcode {
    Move,
    Add,
    Sub,
    Mul,
}

impl Opcode {
    /// Number of operands the opcode reads
    pub fn arity(self) -> usize {
        match self {
            Opcode::Move => 1,
            Opcode::Add | Opcode::Sub | Opcode::Mul => 2,
        }
    }
}

/// A single SSA instruction.
///
/// A `Move` keeps its second operand equal to the first, so structurally equal
/// moves always hash and compare equal.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instruction {
    pub opcode: Opcode,
    pub destination: Value,
    pub operands: [Value; 2],
}

impl Instruction {
    pub fn new(opcode: Opcode, destination: Value, a: Value, b: Value) -> Self {
        match opcode {
            Opcode::Move => Self::mov(destination, a),
            _ => Self {
                opcode,
                destination,
                operands: [a, b],
            },
        }
    }

    pub fn mov(destination: Value, source: Value) -> Self {
        Self {
            opcode: Opcode::Move,
            destination,
            operands: [source, source],
        }
    }

    /// The operands actually read by the instruction
    pub fn inputs(&self) -> &[Value] {
        &self.operands[..self.opcode.arity()]
    }

    pub fn reads(&self, value: Value) -> bool {
        self.inputs().contains(&value)
    }

    /// Rewrite every read operand, keeping the destination.
    pub fn map_inputs(&self, mut f: impl FnMut(Value) -> Value) -> Self {
        match self.opcode {
            Opcode::Move => Self::mov(self.destination, f(self.operands[0])),
            opcode => Self::new(opcode, self.destination, f(self.operands[0]), f(self.operands[1])),
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let [a, b] = self.operands;
        match self.opcode {
            Opcode::Move => write!(f, "{:?} = {:?}", self.destination, a),
            Opcode::Add => write!(f, "{:?} = {:?} + {:?}", self.destination, a, b),
            Opcode::Sub => write!(f, "{:?} = {:?} - {:?}", self.destination, a, b),
            Opcode::Mul => write!(f, "{:?} = {:?} * {:?}", self.destination, a, b),
        }
    }
}

/// The instructions and constants computing one channel group (RGB or alpha).
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct ChannelFunction {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Rgba8>,
}

impl ChannelFunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_instruction(&mut self, instruction: Instruction) {
        assert!(
            self.instructions.len() < MAX_INSTRUCTIONS,
            "channel function exceeds {MAX_INSTRUCTIONS} instructions"
        );
        self.instructions.push(instruction);
    }

    pub fn push_constant(&mut self, color: Rgba8) -> Value {
        assert!(
            self.constants.len() < MAX_CONSTANTS,
            "channel function exceeds {MAX_CONSTANTS} constants"
        );
        self.constants.push(color);
        Value::Constant((self.constants.len() - 1) as u8)
    }

    /// The color of a constant pool entry, panics if the index is out of bounds.
    pub fn constant(&self, index: u8) -> Rgba8 {
        self.constants[index as usize]
    }

    /// The color referenced by `value`, if it is a constant
    pub fn constant_value(&self, value: Value) -> Option<Rgba8> {
        match value {
            Value::Constant(index) => Some(self.constant(index)),
            _ => None,
        }
    }

    /// One more than the highest register written.
    pub fn register_count(&self) -> usize {
        self.instructions
            .iter()
            .filter_map(|instruction| instruction.destination.register())
            .map(|index| index as usize + 1)
            .max()
            .unwrap_or(0)
    }

    /// Returns `true` if some instruction writes [`Special::Output`]
    pub fn writes_output(&self) -> bool {
        self.instructions
            .iter()
            .any(|instruction| instruction.destination == Value::Special(Special::Output))
    }
}

impl Display for ChannelFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        for (index, constant) in self.constants.iter().enumerate() {
            writeln!(f, "Constant({index}) = {:?}", constant.to_array())?;
        }
        Ok(())
    }
}

/// Run the optimization passes to a fixed point, then compact registers and constants.
///
/// `arena` holds the scratch tables of the passes and can be reset afterwards.
pub fn optimize(function: &mut ChannelFunction, arena: &Bump) {
    let mut rounds = 0;
    loop {
        rounds += 1;

        let mut changed = optimize_peephole(function);
        changed |= propagate_copies(function);
        changed |= propagate_constants(function);
        changed |= eliminate_dead_code(function, arena);

        if !changed {
            break;
        }
    }

    renumber_registers(function, arena);
    merge_constants(function, arena);

    trace!(
        rounds,
        instructions = function.instructions.len(),
        constants = function.constants.len(),
        "optimized channel function"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::{AlphaSource, CombinerStage, RgbSource, ShaderContext};
    use pretty_assertions::assert_eq;

    fn optimized_rgb(context: &ShaderContext, stage: CombinerStage<RgbSource>) -> ChannelFunction {
        let arena = Bump::new();
        let mut function = build_function(context, &stage, None);
        optimize(&mut function, &arena);
        function
    }

    fn destinations(function: &ChannelFunction) -> Vec<u8> {
        function
            .instructions
            .iter()
            .filter_map(|instruction| instruction.destination.register())
            .collect()
    }

    #[test]
    fn move_filler_operand() {
        let a = Instruction::new(Opcode::Move, Value::Register(0), Value::Constant(1), Value::Register(7));
        let b = Instruction::mov(Value::Register(0), Value::Constant(1));
        assert_eq!(a, b);
        assert_eq!(a.inputs(), &[Value::Constant(1)]);
    }

    #[test]
    fn non_identity_stage_keeps_every_instruction() {
        let context = ShaderContext {
            primitive: Rgba8::new(200, 100, 50, 255),
            environment: Rgba8::new(10, 20, 30, 40),
            two_cycle: false,
        };
        let stage = CombinerStage::new(RgbSource::Primitive, RgbSource::Environment, RgbSource::Shade, RgbSource::Texel0);
        let function = optimized_rgb(&context, stage);

        let shade = Value::Special(Special::Shade);
        let texel0 = Value::Special(Special::Texel0);
        assert_eq!(
            function.instructions,
            vec![
                Instruction::new(Opcode::Sub, Value::Register(0), Value::Constant(0), Value::Constant(1)),
                Instruction::new(Opcode::Mul, Value::Register(1), Value::Register(0), shade),
                Instruction::new(Opcode::Add, Value::Register(2), Value::Register(1), texel0),
                Instruction::mov(Value::Special(Special::Output), Value::Register(2)),
            ]
        );
        assert_eq!(function.constants, vec![context.primitive, context.environment]);
    }

    #[test]
    fn zero_addend_folds_into_output() {
        let context = ShaderContext {
            primitive: Rgba8::new(200, 100, 50, 255),
            environment: Rgba8::new(10, 20, 30, 40),
            two_cycle: false,
        };
        let stage = CombinerStage::new(RgbSource::Primitive, RgbSource::Environment, RgbSource::Shade, RgbSource::Zero);
        let function = optimized_rgb(&context, stage);

        assert_eq!(
            function.instructions,
            vec![
                Instruction::new(Opcode::Sub, Value::Register(0), Value::Constant(0), Value::Constant(1)),
                Instruction::new(Opcode::Mul, Value::Register(1), Value::Register(0), Value::Special(Special::Shade)),
                Instruction::mov(Value::Special(Special::Output), Value::Register(1)),
            ]
        );
        assert_eq!(function.constants.len(), 2);
    }

    #[test]
    fn self_subtraction_collapses_to_zero() {
        let stage = CombinerStage::new(RgbSource::Texel0, RgbSource::Texel0, RgbSource::Shade, RgbSource::Zero);
        let function = optimized_rgb(&ShaderContext::default(), stage);

        assert_eq!(
            function.instructions,
            vec![Instruction::mov(Value::Special(Special::Output), Value::Constant(0))]
        );
        assert_eq!(function.constants, vec![Rgba8::ZERO]);
    }

    #[test]
    fn passthrough_collapses_to_single_move() {
        let stage = CombinerStage::new(AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Zero, AlphaSource::Shade);
        let arena = Bump::new();
        let mut function = build_function(&ShaderContext::default(), &stage, None);
        optimize(&mut function, &arena);

        assert_eq!(
            function.instructions,
            vec![Instruction::mov(
                Value::Special(Special::Output),
                Value::Special(Special::Shade)
            )]
        );
        assert!(function.constants.is_empty());
    }

    #[test]
    fn optimizer_is_idempotent() {
        let context = ShaderContext {
            primitive: Rgba8::new(1, 2, 3, 4),
            environment: Rgba8::ONE,
            two_cycle: true,
        };
        let stages = [
            CombinerStage::new(RgbSource::Texel0, RgbSource::Zero, RgbSource::Shade, RgbSource::Zero),
            CombinerStage::new(RgbSource::Combined, RgbSource::Primitive, RgbSource::Environment, RgbSource::Texel1),
            CombinerStage::new(RgbSource::Noise, RgbSource::K4, RgbSource::One, RgbSource::Combined),
            CombinerStage::new(RgbSource::Shade, RgbSource::Shade, RgbSource::Primitive, RgbSource::Environment),
        ];

        let arena = Bump::new();
        for first in stages {
            for second in stages {
                let mut function = build_function(&context, &first, Some(&second));
                optimize(&mut function, &arena);
                let once = function.clone();
                optimize(&mut function, &arena);
                assert_eq!(function, once, "{first} ; {second}");
            }
        }
    }

    #[test]
    fn output_survives_and_registers_are_dense() {
        let context = ShaderContext {
            primitive: Rgba8::new(9, 8, 7, 6),
            environment: Rgba8::new(0, 0, 0, 255),
            two_cycle: true,
        };
        let sources = [
            RgbSource::Combined,
            RgbSource::Texel0,
            RgbSource::Texel1,
            RgbSource::Primitive,
            RgbSource::Shade,
            RgbSource::Environment,
            RgbSource::One,
            RgbSource::Zero,
            RgbSource::Noise,
            RgbSource::EnvironmentAlpha,
        ];

        let arena = Bump::new();
        for &a in &sources {
            for &m in &sources {
                let first = CombinerStage::new(a, RgbSource::Zero, m, RgbSource::Shade);
                let second = CombinerStage::new(RgbSource::Combined, a, m, RgbSource::Combined);
                let mut function = build_function(&context, &first, Some(&second));
                optimize(&mut function, &arena);

                assert!(function.writes_output(), "{first} ; {second}");
                assert!(function.instructions.len() <= MAX_INSTRUCTIONS);
                assert!(function.constants.len() <= MAX_CONSTANTS);

                let expected: Vec<u8> = (0..function.register_count() as u8).collect();
                assert_eq!(destinations(&function), expected, "{first} ; {second}");
            }
        }
    }

    #[test]
    fn constants_are_merged_in_first_use_order() {
        let context = ShaderContext {
            primitive: Rgba8::new(5, 5, 5, 5),
            environment: Rgba8::new(5, 5, 5, 5),
            two_cycle: false,
        };
        let stage = CombinerStage::new(RgbSource::Texel0, RgbSource::Primitive, RgbSource::Texel1, RgbSource::Environment);
        let function = optimized_rgb(&context, stage);

        assert_eq!(function.constants, vec![Rgba8::splat(5)]);
        assert!(function.instructions.iter().all(|instruction| {
            instruction
                .inputs()
                .iter()
                .all(|value| !matches!(value, Value::Constant(index) if *index != 0))
        }));
    }
}
