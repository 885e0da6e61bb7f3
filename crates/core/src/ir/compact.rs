use super::{ChannelFunction, Value};
use bumpalo::{Bump, collections::Vec};

/// Renumber registers densely from zero, in order of their definition.
pub fn renumber_registers(function: &mut ChannelFunction, arena: &Bump) {
    let mut mapping: Vec<Option<u8>> = Vec::new_in(arena);
    let mut next = 0u8;

    for instruction in &mut function.instructions {
        let rename = |value: Value, mapping: &Vec<Option<u8>>| match value {
            Value::Register(index) => match mapping.get(index as usize).copied().flatten() {
                Some(renamed) => Value::Register(renamed),
                None => panic!("register {index} read before it is written"),
            },
            value => value,
        };

        *instruction = instruction.map_inputs(|value| rename(value, &mapping));

        if let Value::Register(index) = instruction.destination {
            if mapping.len() <= index as usize {
                mapping.resize(index as usize + 1, None);
            }
            mapping[index as usize] = Some(next);
            instruction.destination = Value::Register(next);
            next += 1;
        }
    }
}

/// Deduplicate the constant pool by color and drop unreferenced entries.
///
/// Surviving constants are ordered by their first reference.
pub fn merge_constants(function: &mut ChannelFunction, arena: &Bump) {
    let mut merged = Vec::new_in(arena);
    let mut mapping: Vec<Option<u8>> = Vec::new_in(arena);
    mapping.resize(function.constants.len(), None);

    let constants = &function.constants;
    for instruction in &mut function.instructions {
        *instruction = instruction.map_inputs(|value| match value {
            Value::Constant(index) => match mapping[index as usize] {
                Some(merged_index) => Value::Constant(merged_index),
                None => {
                    let color = constants[index as usize];
                    let position = match merged.iter().position(|x| *x == color) {
                        Some(position) => position,
                        None => {
                            merged.push(color);
                            merged.len() - 1
                        }
                    } as u8;

                    mapping[index as usize] = Some(position);
                    Value::Constant(position)
                }
            },
            value => value,
        });
    }

    function.constants.clear();
    function.constants.extend(merged);
}
