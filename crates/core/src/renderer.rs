use crate::{
    AtlasRect, Rgba8,
    combiner::{DrawMode, RawCombiner, ShaderContext},
    command::{Batch, BlendFlags, Command, TextureUpload, Vertex},
    data::quantize,
    program::{DEFAULT_MAX_RESIDENT_PROGRAMS, ProgramCache, ProgramDescriptor},
    queue::{CommandSender, QueueError},
    subprogram::{SubprogramCache, SubprogramId},
};
use std::{collections::HashMap, mem::take, time::Instant};
use tracing::debug;

/// Most distinct subprograms a single batch can select between.
pub const MAX_BATCH_SUBPROGRAMS: usize = 256;

#[derive(Clone, Debug)]
pub struct RendererOptions {
    /// Bound on compiled programs kept alive on the rendering thread
    pub max_resident_programs: usize,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            max_resident_programs: DEFAULT_MAX_RESIDENT_PROGRAMS,
        }
    }
}

/// Combiner related state of the primitive being drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CombinerState {
    pub combiner: RawCombiner,
    pub mode: DrawMode,
    pub primitive: Rgba8,
    pub environment: Rgba8,
    pub two_cycle: bool,
}

impl CombinerState {
    /// The draw context the combiner is compiled for.
    ///
    /// Texture blits and fills always run a single cycle.
    pub fn context(&self) -> ShaderContext {
        ShaderContext {
            primitive: self.primitive,
            environment: self.environment,
            two_cycle: self.two_cycle && self.mode == DrawMode::Normal,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub batches: usize,
    pub vertices: usize,
    pub programs_created: usize,
    pub programs_evicted: usize,
    pub subprograms_created: usize,
}

struct PendingBatch {
    vertices: Vec<Vertex>,
    flags: BlendFlags,
    subprograms: Vec<SubprogramId>,
    index: HashMap<SubprogramId, u8>,
}

impl PendingBatch {
    fn new(flags: BlendFlags) -> Self {
        Self {
            vertices: Vec::new(),
            flags,
            subprograms: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn accepts(&self, flags: &BlendFlags, subprogram: SubprogramId) -> bool {
        self.flags == *flags
            && (self.index.contains_key(&subprogram) || self.subprograms.len() < MAX_BATCH_SUBPROGRAMS)
    }

    /// Dense index of a subprogram within this batch, in order of first use.
    fn select(&mut self, subprogram: SubprogramId) -> u8 {
        *self.index.entry(subprogram).or_insert_with(|| {
            self.subprograms.push(subprogram);
            (self.subprograms.len() - 1) as u8
        })
    }
}

/// Producer side of the pipeline.
///
/// Records the triangles of a frame into batches, resolves their programs and sends
/// everything to the rendering thread at the end of the frame.
pub struct Renderer {
    subprograms: SubprogramCache,
    programs: ProgramCache,
    batches: Vec<PendingBatch>,
    sender: CommandSender,
    stats: FrameStats,
    frame_start: Instant,
}

impl Renderer {
    pub fn new(sender: CommandSender, options: RendererOptions) -> Self {
        Self {
            subprograms: SubprogramCache::new(),
            programs: ProgramCache::new(options.max_resident_programs),
            batches: Vec::new(),
            sender,
            stats: FrameStats::default(),
            frame_start: Instant::now(),
        }
    }

    pub fn subprograms(&self) -> &SubprogramCache {
        &self.subprograms
    }

    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    /// Drop anything recorded so far and start a new frame.
    ///
    /// Evictions made by [`Renderer::set_max_resident_programs`] since the last frame
    /// are already queued and stay counted in the next frame's stats.
    pub fn begin_frame(&mut self) {
        self.batches.clear();
        self.stats = FrameStats {
            programs_evicted: self.stats.programs_evicted,
            ..Default::default()
        };
        self.frame_start = Instant::now();
    }

    /// Change the bound on resident programs, destroying the oldest ones if needed.
    pub fn set_max_resident_programs(&mut self, max: usize) {
        for id in self.programs.set_capacity(max) {
            self.stats.programs_evicted += 1;
            self.sender.push(Command::DestroyProgram(id));
        }
    }

    /// Queue RGBA8 pixels for upload into the texture atlas.
    pub fn upload_texture(&mut self, bounds: AtlasRect, pixels: Vec<u8>) {
        assert_eq!(pixels.len(), bounds.area() * 4, "pixel data does not match {bounds:?}");
        self.sender.push(Command::UploadTexture(TextureUpload { bounds, pixels }));
    }

    /// Record a triangle.
    ///
    /// The combiner is compiled (or looked up) right away, the subprogram and alpha
    /// threshold attributes of the vertices are overwritten.
    pub fn add_triangle(
        &mut self,
        vertices: [Vertex; 3],
        flags: &BlendFlags,
        state: &CombinerState,
        alpha_threshold: f32,
    ) {
        let combiner = state.combiner.decode(state.mode);
        let (id, _, created) = self.subprograms.get_or_create(&combiner, &state.context());
        if created {
            self.stats.subprograms_created += 1;
        }

        let mut batch = match self.batches.pop() {
            Some(batch) if batch.accepts(flags, id) => batch,
            previous => {
                self.batches.extend(previous);
                PendingBatch::new(*flags)
            }
        };

        let subprogram = batch.select(id);
        let alpha_threshold = quantize(alpha_threshold);
        batch.vertices.extend(vertices.map(|vertex| Vertex {
            primitive: state.primitive,
            environment: state.environment,
            subprogram,
            alpha_threshold,
            ..vertex
        }));
        self.batches.push(batch);
    }

    /// Resolve programs for every recorded batch, send the frame and wait for the
    /// rendering thread to take it.
    pub fn end_frame(&mut self) -> Result<FrameStats, QueueError> {
        let mut ready: Vec<Batch> = Vec::new();

        for batch in take(&mut self.batches) {
            self.stats.batches += 1;
            self.stats.vertices += batch.vertices.len();

            let lookup = self
                .programs
                .get_or_create(&self.subprograms, ProgramDescriptor(batch.subprograms));

            if let Some(evicted) = lookup.evicted {
                self.stats.programs_evicted += 1;

                // the slot is about to be reused, draw what still needs the old program
                if ready.iter().any(|batch| batch.program == evicted) {
                    self.sender.push(Command::DrawBatches(take(&mut ready)));
                }
                self.sender.push(Command::DestroyProgram(evicted));
            }

            if lookup.created {
                self.stats.programs_created += 1;
                self.sender.push(Command::CompileProgram(lookup.program));
            }

            ready.push(Batch {
                vertices: batch.vertices,
                flags: batch.flags,
                program: lookup.id,
            });
        }

        if !ready.is_empty() {
            self.sender.push(Command::DrawBatches(ready));
        }

        self.sender.push(Command::Present {
            elapsed: self.frame_start.elapsed(),
        });
        self.sender.submit()?;

        let stats = take(&mut self.stats);
        debug!(?stats, resident = self.programs.len(), "frame submitted");
        self.frame_start = Instant::now();
        Ok(stats)
    }
}
