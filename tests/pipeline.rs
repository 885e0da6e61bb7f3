use pretty_assertions::assert_eq;
use rdpshade::{
    AtlasRect, Backend, Batch, BlendFlags, BlendMode, CombinerState, CycleType, DrawMode, EmitOptions, Executor,
    FrameStats, ProgramId, ProgramSlots, RawCombiner, Renderer, RendererOptions, Rgba8, Vertex, Viewport, channel,
    combiner::RawStage,
};
use std::{convert::Infallible, thread, time::Duration};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Upload(AtlasRect),
    Compile(ProgramId),
    Destroy(ProgramId),
    Draw(Vec<(ProgramId, usize)>),
    Present,
}

/// a backend that records what it is asked to do
#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
    sources: Vec<String>,
}

impl Backend for Recorder {
    type Program = (ProgramId, String);
    type Error = Infallible;

    fn upload_texture(&mut self, bounds: AtlasRect, _pixels: &[u8]) -> Result<(), Infallible> {
        self.events.push(Event::Upload(bounds));
        Ok(())
    }

    fn compile_program(&mut self, id: ProgramId, fragment_source: &str) -> Result<(ProgramId, String), Infallible> {
        self.events.push(Event::Compile(id));
        self.sources.push(fragment_source.to_string());
        Ok((id, fragment_source.to_string()))
    }

    fn destroy_program(&mut self, (id, _): (ProgramId, String)) {
        self.events.push(Event::Destroy(id));
    }

    fn draw_batches(
        &mut self,
        batches: &[Batch],
        programs: &ProgramSlots<(ProgramId, String)>,
    ) -> Result<(), Infallible> {
        for batch in batches {
            let (_, source) = programs.get(batch.program).expect("program is compiled");
            let branches = source.matches("vSubprogram ==").count();
            for vertex in &batch.vertices {
                assert!((vertex.subprogram as usize) < branches, "vertex selects a missing branch");
            }
        }

        self.events.push(Event::Draw(
            batches.iter().map(|batch| (batch.program, batch.vertices.len())).collect(),
        ));
        Ok(())
    }

    fn present(&mut self, _elapsed: Duration) -> Result<(), Infallible> {
        self.events.push(Event::Present);
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("shader rejected by the driver")]
struct Rejected;

/// a recorder whose first `failures` compiles are rejected
#[derive(Default)]
struct Rejecting {
    recorder: Recorder,
    failures: usize,
}

impl Backend for Rejecting {
    type Program = (ProgramId, String);
    type Error = Rejected;

    fn upload_texture(&mut self, bounds: AtlasRect, pixels: &[u8]) -> Result<(), Rejected> {
        let Ok(()) = self.recorder.upload_texture(bounds, pixels);
        Ok(())
    }

    fn compile_program(&mut self, id: ProgramId, fragment_source: &str) -> Result<(ProgramId, String), Rejected> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(Rejected);
        }
        let Ok(program) = self.recorder.compile_program(id, fragment_source);
        Ok(program)
    }

    fn destroy_program(&mut self, program: (ProgramId, String)) {
        self.recorder.destroy_program(program);
    }

    fn draw_batches(
        &mut self,
        batches: &[Batch],
        programs: &ProgramSlots<(ProgramId, String)>,
    ) -> Result<(), Rejected> {
        let Ok(()) = self.recorder.draw_batches(batches, programs);
        Ok(())
    }

    fn present(&mut self, elapsed: Duration) -> Result<(), Rejected> {
        let Ok(()) = self.recorder.present(elapsed);
        Ok(())
    }
}

/// run a producer on this thread against a consumer thread driving `backend`
fn run<B: Backend + Send + 'static>(
    backend: B,
    options: RendererOptions,
    frames: impl FnOnce(&mut Renderer) -> Vec<FrameStats>,
) -> (B, Vec<FrameStats>) {
    let (sender, receiver) = channel();
    let consumer = thread::spawn(move || {
        let mut executor = Executor::new(backend, EmitOptions::default());
        executor.run(&receiver);
        executor.into_backend()
    });

    let mut renderer = Renderer::new(sender, options);
    let stats = frames(&mut renderer);
    drop(renderer);

    (consumer.join().unwrap(), stats)
}

fn stage(a: u8, b: u8, m: u8, n: u8) -> RawStage {
    RawStage { a, b, m, n }
}

/// `(TEXEL0 - 0) * SHADE + 0` in both cycles
fn modulate() -> CombinerState {
    CombinerState {
        combiner: RawCombiner {
            rgb: [stage(1, 15, 4, 7); 2],
            alpha: [stage(1, 7, 4, 7); 2],
        },
        ..Default::default()
    }
}

/// `(0 - 0) * 0 + PRIMITIVE` in both cycles
fn flat(primitive: Rgba8) -> CombinerState {
    CombinerState {
        combiner: RawCombiner {
            rgb: [stage(15, 15, 31, 3); 2],
            alpha: [stage(7, 7, 7, 3); 2],
        },
        primitive,
        ..Default::default()
    }
}

fn flags() -> BlendFlags {
    BlendFlags {
        z_test: true,
        z_update: true,
        blend_mode: BlendMode::select(DrawMode::Normal, CycleType::One, true, false, 0x0c18),
        viewport: Viewport::from([0.0, 0.0, 320.0, 240.0]),
    }
}

fn triangle() -> [Vertex; 3] {
    let vertex = Vertex {
        position: [0.0, 0.0, 0.0, 1.0],
        ..Default::default()
    };
    [vertex; 3]
}

/// a single frame with two materials shares one program with two branches
#[test]
fn one_frame_one_program() {
    let (recorder, stats) = run(Recorder::default(), RendererOptions::default(), |renderer| {
        renderer.begin_frame();
        renderer.upload_texture(AtlasRect::from([0, 0, 2, 2]), vec![255; 16]);
        renderer.add_triangle(triangle(), &flags(), &modulate(), 0.0);
        renderer.add_triangle(triangle(), &flags(), &flat(Rgba8::new(255, 0, 0, 255)), 0.0);
        vec![renderer.end_frame().unwrap()]
    });

    assert_eq!(
        recorder.events,
        vec![
            Event::Upload(AtlasRect::from([0, 0, 2, 2])),
            Event::Compile(ProgramId(0)),
            Event::Draw(vec![(ProgramId(0), 6)]),
            Event::Present,
        ]
    );
    assert_eq!(
        stats[0],
        FrameStats {
            batches: 1,
            vertices: 6,
            programs_created: 1,
            programs_evicted: 0,
            subprograms_created: 2,
        }
    );

    let source = &recorder.sources[0];
    assert!(source.contains("    if (vSubprogram == 0.0) {\n        r0 = texture0Color * vShade;\n"));
    assert!(source.contains("    } else if (vSubprogram == 1.0) {\n        fragRGB = vec4(1.000000, 0.000000, 0.000000, 1.000000);\n"));
    assert!(source.ends_with("    gl_FragColor = vec4(fragRGB.rgb, fragA.a);\n}\n"));
}

/// cached programs are compiled once and reused by later frames
#[test]
fn programs_are_compiled_once() {
    let (recorder, _) = run(Recorder::default(), RendererOptions::default(), |renderer| {
        (0..5)
            .map(|_| {
                renderer.begin_frame();
                renderer.add_triangle(triangle(), &flags(), &modulate(), 0.5);
                renderer.end_frame().unwrap()
            })
            .collect()
    });

    let compiles = recorder
        .events
        .iter()
        .filter(|event| matches!(event, Event::Compile(_)))
        .count();
    assert_eq!(compiles, 1);
    assert_eq!(recorder.events.iter().filter(|event| **event == Event::Present).count(), 5);
}

/// with a single resident program every new program destroys the previous one first
#[test]
fn eviction_destroys_before_reuse() {
    let options = RendererOptions {
        max_resident_programs: 1,
    };

    let (recorder, stats) = run(Recorder::default(), options, |renderer| {
        (0..3u8)
            .map(|i| {
                renderer.begin_frame();
                renderer.add_triangle(triangle(), &flags(), &flat(Rgba8::new(i, 0, 0, 255)), 0.0);
                renderer.end_frame().unwrap()
            })
            .collect()
    });

    assert_eq!(
        recorder.events,
        vec![
            Event::Compile(ProgramId(0)),
            Event::Draw(vec![(ProgramId(0), 3)]),
            Event::Present,
            Event::Destroy(ProgramId(0)),
            Event::Compile(ProgramId(0)),
            Event::Draw(vec![(ProgramId(0), 3)]),
            Event::Present,
            Event::Destroy(ProgramId(0)),
            Event::Compile(ProgramId(0)),
            Event::Draw(vec![(ProgramId(0), 3)]),
            Event::Present,
        ]
    );
    assert_eq!(stats.iter().map(|stats| stats.programs_evicted).sum::<usize>(), 2);
}

/// the same subprograms used in a different order make a different program
#[test]
fn first_use_order_selects_the_program() {
    let red = flat(Rgba8::new(255, 0, 0, 255));
    let green = flat(Rgba8::new(0, 255, 0, 255));

    let (recorder, _) = run(Recorder::default(), RendererOptions::default(), |renderer| {
        renderer.begin_frame();
        renderer.add_triangle(triangle(), &flags(), &red, 0.0);
        renderer.add_triangle(triangle(), &flags(), &green, 0.0);
        let first = renderer.end_frame().unwrap();

        renderer.begin_frame();
        renderer.add_triangle(triangle(), &flags(), &green, 0.0);
        renderer.add_triangle(triangle(), &flags(), &red, 0.0);
        let second = renderer.end_frame().unwrap();

        vec![first, second]
    });

    assert_eq!(recorder.sources.len(), 2);
    assert_ne!(recorder.sources[0], recorder.sources[1]);
    assert!(recorder.events.contains(&Event::Draw(vec![(ProgramId(1), 6)])));
}

/// two independent pipelines fed the same frames generate identical shaders
#[test]
fn generation_is_deterministic() {
    let record = || {
        run(Recorder::default(), RendererOptions::default(), |renderer| {
            renderer.begin_frame();
            renderer.add_triangle(triangle(), &flags(), &modulate(), 0.0);
            renderer.add_triangle(triangle(), &flags(), &flat(Rgba8::new(10, 20, 30, 40)), 0.0);
            vec![renderer.end_frame().unwrap()]
        })
        .0
        .sources
    };

    assert_eq!(record(), record());
}

/// a rejected shader only drops its own draws, later frames keep presenting
#[test]
fn rejected_shader_keeps_the_pipeline_alive() {
    let backend = Rejecting {
        failures: 1,
        ..Default::default()
    };
    let options = RendererOptions {
        max_resident_programs: 1,
    };

    let (backend, stats) = run(backend, options, |renderer| {
        let mut stats: Vec<FrameStats> = (0..3)
            .map(|_| {
                renderer.begin_frame();
                renderer.add_triangle(triangle(), &flags(), &flat(Rgba8::new(255, 0, 0, 255)), 0.0);
                renderer.end_frame().unwrap()
            })
            .collect();

        // evicting the rejected program frees its slot for the next one
        renderer.begin_frame();
        renderer.add_triangle(triangle(), &flags(), &flat(Rgba8::new(0, 255, 0, 255)), 0.0);
        stats.push(renderer.end_frame().unwrap());
        stats
    });

    assert_eq!(stats.len(), 4);
    assert_eq!(
        backend.recorder.events,
        vec![
            Event::Present,
            Event::Present,
            Event::Present,
            Event::Compile(ProgramId(0)),
            Event::Draw(vec![(ProgramId(0), 3)]),
            Event::Present,
        ]
    );
}
