use super::{ChannelFunction, Instruction, Opcode, Value};

/// Inline register copies.
///
/// Walking backwards, every `Move` of a register into another register takes over the
/// opcode and operands of the instruction defining its source. The move writing the
/// output is left alone so every function ends in a plain move.
pub fn propagate_copies(function: &mut ChannelFunction) -> bool {
    let mut changed = false;

    for index in (0..function.instructions.len()).rev() {
        let instruction = function.instructions[index];
        if instruction.opcode != Opcode::Move || !instruction.destination.is_register() {
            continue;
        }

        let source = instruction.operands[0];
        if !source.is_register() {
            continue;
        }

        let definition = function.instructions[..index]
            .iter()
            .find(|candidate| candidate.destination == source)
            .copied()
            .unwrap_or_else(|| panic!("register {source:?} read before it is written"));

        function.instructions[index] = Instruction {
            destination: instruction.destination,
            ..definition
        };
        changed = true;
    }

    changed
}

/// Forward constants and shader inputs moved into registers to their readers.
pub fn propagate_constants(function: &mut ChannelFunction) -> bool {
    let mut changed = false;

    for index in 0..function.instructions.len() {
        let instruction = function.instructions[index];
        let source = instruction.operands[0];
        if instruction.opcode != Opcode::Move || !instruction.destination.is_register() || source.is_register() {
            continue;
        }

        for later in &mut function.instructions[index + 1..] {
            if later.reads(instruction.destination) {
                *later = later.map_inputs(|value| if value == instruction.destination { source } else { value });
                changed = true;
            }
        }
    }

    changed
}
