use super::{ChannelFunction, Special, Value};
use bumpalo::{Bump, collections::Vec};

/// Drop instructions whose destination is never read.
///
/// Sweeps backwards with a live set seeded with the output, so chains of dead
/// instructions go away in a single call.
pub fn eliminate_dead_code(function: &mut ChannelFunction, arena: &Bump) -> bool {
    let mut live = Vec::new_in(arena);
    live.push(Value::Special(Special::Output));

    let mut keep = Vec::with_capacity_in(function.instructions.len(), arena);
    keep.resize(function.instructions.len(), false);

    for (index, instruction) in function.instructions.iter().enumerate().rev() {
        if live.contains(&instruction.destination) {
            keep[index] = true;
            for &input in instruction.inputs() {
                if !live.contains(&input) {
                    live.push(input);
                }
            }
        }
    }

    let before = function.instructions.len();
    let mut index = 0;
    function.instructions.retain(|_| {
        index += 1;
        keep[index - 1]
    });

    function.instructions.len() != before
}
