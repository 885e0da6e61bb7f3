use crate::{
    AtlasRect,
    codegen::{EmitOptions, generate_fragment_shader},
    command::{Batch, Command},
    program::ProgramId,
    queue::CommandReceiver,
};
use std::time::Duration;
use tracing::{debug, error, warn};

/// The rendering side of the pipeline.
///
/// Implementations own every GPU object. They are only ever driven from the thread
/// running the [`Executor`].
pub trait Backend {
    /// A compiled and linked shader program
    type Program;
    type Error: std::error::Error;

    fn upload_texture(&mut self, bounds: AtlasRect, pixels: &[u8]) -> Result<(), Self::Error>;

    fn compile_program(&mut self, id: ProgramId, fragment_source: &str) -> Result<Self::Program, Self::Error>;

    fn destroy_program(&mut self, program: Self::Program);

    /// Draw batches in order, every batch program is present in `programs`.
    fn draw_batches(&mut self, batches: &[Batch], programs: &ProgramSlots<Self::Program>)
    -> Result<(), Self::Error>;

    fn present(&mut self, elapsed: Duration) -> Result<(), Self::Error>;
}

/// Compiled programs indexed by their program id.
///
/// A slot whose compile failed stays reserved until the producer destroys it,
/// batches using it are not drawn.
pub struct ProgramSlots<P> {
    slots: Vec<Slot<P>>,
}

enum Slot<P> {
    Empty,
    Compiled(P),
    Failed,
}

impl<P> Default for ProgramSlots<P> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<P> ProgramSlots<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a program, panics if the slot is not empty.
    pub fn insert(&mut self, id: ProgramId, program: P) {
        *self.vacant(id) = Slot::Compiled(program);
    }

    /// Reserve the slot of a program that failed to compile, panics if the slot is not empty.
    pub fn insert_failed(&mut self, id: ProgramId) {
        *self.vacant(id) = Slot::Failed;
    }

    /// Empty a slot, returning its program if it compiled. Panics if the slot is already empty.
    pub fn remove(&mut self, id: ProgramId) -> Option<P> {
        let slot = self.slots.get_mut(id.0 as usize).map(|slot| std::mem::replace(slot, Slot::Empty));
        match slot {
            Some(Slot::Compiled(program)) => Some(program),
            Some(Slot::Failed) => None,
            Some(Slot::Empty) | None => panic!("{id} destroyed while not compiled"),
        }
    }

    pub fn get(&self, id: ProgramId) -> Option<&P> {
        match self.slots.get(id.0 as usize) {
            Some(Slot::Compiled(program)) => Some(program),
            _ => None,
        }
    }

    pub fn is_failed(&self, id: ProgramId) -> bool {
        matches!(self.slots.get(id.0 as usize), Some(Slot::Failed))
    }

    /// Number of compiled programs
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| matches!(slot, Slot::Compiled(_))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty every slot, yielding the compiled programs.
    pub fn drain(&mut self) -> impl Iterator<Item = P> + '_ {
        self.slots
            .iter_mut()
            .filter_map(|slot| match std::mem::replace(slot, Slot::Empty) {
                Slot::Compiled(program) => Some(program),
                Slot::Empty | Slot::Failed => None,
            })
    }

    fn vacant(&mut self, id: ProgramId) -> &mut Slot<P> {
        let index = id.0 as usize;
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || Slot::Empty);
        }

        let slot = &mut self.slots[index];
        assert!(matches!(slot, Slot::Empty), "{id} compiled into an occupied slot");
        slot
    }
}

/// Consumer side of the pipeline: generates shader text and drives a [`Backend`].
pub struct Executor<B: Backend> {
    backend: B,
    programs: ProgramSlots<B::Program>,
    options: EmitOptions,
}

impl<B: Backend> Executor<B> {
    pub fn new(backend: B, options: EmitOptions) -> Self {
        Self {
            backend,
            programs: ProgramSlots::new(),
            options,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn programs(&self) -> &ProgramSlots<B::Program> {
        &self.programs
    }

    /// Execute the commands of one frame in order.
    ///
    /// A failing command is logged and skipped, the rest of the frame still runs.
    /// Returns the first error of the frame. A program that failed to compile keeps
    /// its slot and its batches are dropped until the producer destroys it.
    pub fn execute(&mut self, commands: Vec<Command>) -> Result<(), B::Error> {
        let mut first_error = None;

        for command in commands {
            let result = match command {
                Command::UploadTexture(upload) => self.backend.upload_texture(upload.bounds, &upload.pixels),

                Command::CompileProgram(program) => {
                    let source = generate_fragment_shader(&self.options, &program);
                    debug!(id = program.id.0, bytes = source.len(), "compiling program");
                    match self.backend.compile_program(program.id, &source) {
                        Ok(compiled) => {
                            self.programs.insert(program.id, compiled);
                            Ok(())
                        }
                        Err(err) => {
                            self.programs.insert_failed(program.id);
                            Err(err)
                        }
                    }
                }

                Command::DestroyProgram(id) => {
                    if let Some(program) = self.programs.remove(id) {
                        self.backend.destroy_program(program);
                    }
                    Ok(())
                }

                Command::DrawBatches(mut batches) => {
                    batches.retain(|batch| {
                        if self.programs.get(batch.program).is_some() {
                            return true;
                        }

                        assert!(
                            self.programs.is_failed(batch.program),
                            "{} drawn before it was compiled",
                            batch.program
                        );
                        warn!(id = batch.program.0, "skipping batch of a program that failed to compile");
                        false
                    });

                    if batches.is_empty() {
                        Ok(())
                    } else {
                        self.backend.draw_batches(&batches, &self.programs)
                    }
                }

                Command::Present { elapsed } => self.backend.present(elapsed),
            };

            if let Err(err) = result {
                error!(%err, "backend command failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Execute frames until the producer disconnects.
    ///
    /// Backend errors are logged by [`Executor::execute`] and do not stop the loop.
    pub fn run(&mut self, receiver: &CommandReceiver) {
        while let Ok(commands) = receiver.recv() {
            self.execute(commands).ok();
        }
    }

    /// Destroy every compiled program and hand back the backend.
    pub fn into_backend(mut self) -> B {
        for program in self.programs.drain().collect::<Vec<_>>() {
            self.backend.destroy_program(program);
        }
        self.backend
    }
}
