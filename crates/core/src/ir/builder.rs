use super::{ChannelFunction, Instruction, Opcode, Special, Value};
use crate::{
    Rgba8,
    combiner::{CombinerStage, MuxOperand, Operand, ShaderContext},
};
use tracing::trace;

/// Build the unoptimized function for one channel group.
///
/// Every evaluated cycle appends `Sub`, `Mul` and `Add` into fresh registers. When
/// `cycle1` is given, its `COMBINED` input reads the result of `cycle0`; in the first
/// cycle `COMBINED` reads as zero. A final move writes the last result to the output.
pub fn build_function<S: MuxOperand>(
    context: &ShaderContext,
    cycle0: &CombinerStage<S>,
    cycle1: Option<&CombinerStage<S>>,
) -> ChannelFunction {
    let mut builder = FunctionBuilder {
        context,
        function: ChannelFunction::new(),
        next_register: 0,
    };

    let mut result = builder.cycle(cycle0, None);
    if let Some(cycle1) = cycle1 {
        result = builder.cycle(cycle1, Some(result));
    }

    builder
        .function
        .push_instruction(Instruction::mov(Value::Special(Special::Output), result));
    builder.function
}

struct FunctionBuilder<'a> {
    context: &'a ShaderContext,
    function: ChannelFunction,
    next_register: u8,
}

impl FunctionBuilder<'_> {
    fn cycle<S: MuxOperand>(&mut self, stage: &CombinerStage<S>, combined: Option<Value>) -> Value {
        let a = self.operand(stage.a, combined);
        let b = self.operand(stage.b, combined);
        let m = self.operand(stage.m, combined);
        let n = self.operand(stage.n, combined);

        let difference = self.emit(Opcode::Sub, a, b);
        let product = self.emit(Opcode::Mul, difference, m);
        self.emit(Opcode::Add, product, n)
    }

    fn operand<S: MuxOperand>(&mut self, source: S, combined: Option<Value>) -> Value {
        match source.lower(self.context) {
            Operand::Combined => match combined {
                Some(value) => value,
                None => self.function.push_constant(Rgba8::ZERO),
            },
            Operand::Special(special) => Value::Special(special),
            Operand::Constant(color) => self.function.push_constant(color),
            Operand::Unsupported => {
                trace!(%source, "unsupported combiner input, reading zero");
                self.function.push_constant(Rgba8::ZERO)
            }
        }
    }

    fn emit(&mut self, opcode: Opcode, a: Value, b: Value) -> Value {
        let destination = Value::Register(self.next_register);
        self.next_register += 1;
        self.function.push_instruction(Instruction::new(opcode, destination, a, b));
        destination
    }
}
