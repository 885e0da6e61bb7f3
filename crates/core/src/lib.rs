pub mod backend;
pub mod codegen;
pub mod combiner;
pub mod command;
mod data;
pub mod ir;
pub mod program;
pub mod queue;
pub mod renderer;
pub mod subprogram;

pub use backend::{Backend, Executor, ProgramSlots};
pub use codegen::{EmitOptions, generate_fragment_shader};
pub use combiner::{CombinerDescriptor, DrawMode, RawCombiner, ShaderContext};
pub use command::{Batch, BlendFlags, BlendMode, Command, CycleType, Vertex};
pub use data::*;
pub use program::{Program, ProgramCache, ProgramDescriptor, ProgramId};
pub use queue::{CommandReceiver, CommandSender, QueueError, channel};
pub use renderer::{CombinerState, FrameStats, Renderer, RendererOptions};
pub use subprogram::{Subprogram, SubprogramCache, SubprogramId};
