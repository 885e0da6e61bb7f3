use super::{ChannelFunction, Instruction, Opcode, Value};
use crate::Rgba8;

/// Apply algebraic identities to single instructions, turning them into moves.
///
/// `x + 0`, `x - 0` and `x * 1` become `x`, `x - x` and `x * 0` become zero.
/// Returns `true` if any instruction changed.
pub fn optimize_peephole(function: &mut ChannelFunction) -> bool {
    let mut changed = false;

    for index in 0..function.instructions.len() {
        let instruction = function.instructions[index];
        if let Some(simplified) = single_peephole(function, instruction) {
            function.instructions[index] = simplified;
            changed = true;
        }
    }

    changed
}

fn single_peephole(function: &mut ChannelFunction, instruction: Instruction) -> Option<Instruction> {
    let [a, b] = instruction.operands;
    let dst = instruction.destination;
    let is = |value: Value, x: u8| function.constant_value(value).is_some_and(|color| color.is_splat(x));
    let (a_zero, b_zero) = (is(a, 0), is(b, 0));
    let (a_one, b_one) = (is(a, 255), is(b, 255));

    match instruction.opcode {
        Opcode::Move => None,
        Opcode::Add if b_zero => Some(Instruction::mov(dst, a)),
        Opcode::Add if a_zero => Some(Instruction::mov(dst, b)),
        Opcode::Sub if b_zero => Some(Instruction::mov(dst, a)),
        Opcode::Sub if same_value(function, a, b) => Some(Instruction::mov(dst, zero(function))),
        Opcode::Mul if a_zero => Some(Instruction::mov(dst, a)),
        Opcode::Mul if b_zero => Some(Instruction::mov(dst, b)),
        Opcode::Mul if b_one => Some(Instruction::mov(dst, a)),
        Opcode::Mul if a_one => Some(Instruction::mov(dst, b)),
        _ => None,
    }
}

/// Both operands are provably the same color.
fn same_value(function: &ChannelFunction, a: Value, b: Value) -> bool {
    match (function.constant_value(a), function.constant_value(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// A constant reading as zero, added to the pool if there is none yet.
fn zero(function: &mut ChannelFunction) -> Value {
    match function.constants.iter().position(|color| color.is_splat(0)) {
        Some(index) => Value::Constant(index as u8),
        None => function.push_constant(Rgba8::ZERO),
    }
}
