use std::error::Error;

use crate::controls::Controls;
use crate::driver::FrameTiming;
use crate::flip::BufferPair;

/// Handle to one double-buffered state channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelId(pub(crate) usize);

impl ChannelId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Which side of a channel a pass reads.
///
/// `Front` is the default contract (last frame's result). `Back` reads a
/// buffer written by an earlier pass in the same frame, expressing the
/// intra-frame dependency chain (cells reads the simulation state that was
/// just stepped, deposit reads the cells that were just rendered).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

/// Where a pass writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// The back buffer of a channel.
    Channel(ChannelId),
    /// The swapchain. Not part of any pair, never flipped.
    Screen,
}

/// Draw geometry of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Geometry {
    /// Two triangles covering the whole target (6 vertices).
    FullscreenQuad,
    /// One point primitive per agent, positioned by a per-agent vertex
    /// layout computed once from the target dimensions.
    AgentPoints { count: u32 },
}

/// One GPU program dispatch: bound inputs, an output target, geometry.
///
/// Stateless between invocations except through the textures and uniform
/// snapshot it is handed each frame.
#[derive(Clone, Debug)]
pub struct PassSpec {
    pub name: &'static str,
    pub inputs: Vec<(ChannelId, Side)>,
    pub output: Output,
    pub geometry: Geometry,
    /// Skipped while the pause flag is set. Render/composite passes leave
    /// this unset so the display stays responsive during pause.
    pub mutates_state: bool,
}

/// Resolved resources and frame-scoped parameters for one dispatch.
pub struct PassBindings<'a, T> {
    /// Input resources, in the order the pass declared them.
    pub inputs: Vec<&'a T>,
    /// Output resource; `None` means the screen.
    pub output: Option<&'a T>,
    pub controls: Controls,
    pub timing: FrameTiming,
}

/// The seam between the frame protocol and the graphics backend.
///
/// Executing a pass issues one draw call. Dispatches are fire-and-forget:
/// ordering and output-to-input visibility between passes are the
/// backend's (ultimately the GPU queue's) responsibility.
pub trait PassExecutor {
    type Target;
    type Error: Error + Send + Sync + 'static;

    fn dispatch(
        &mut self,
        pass: &PassSpec,
        bindings: PassBindings<'_, Self::Target>,
    ) -> Result<(), Self::Error>;
}

/// Wiring errors caught at construction, before any frame runs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pass '{pass}' references undeclared channel {channel}")]
    UnknownChannel { pass: &'static str, channel: usize },
    #[error("pass '{pass}' reads the back buffer of the channel it writes")]
    SelfRead { pass: &'static str },
    #[error("pass '{pass}' reads the back of channel {channel} before any pass writes it")]
    BackReadBeforeWrite { pass: &'static str, channel: usize },
    #[error("channel '{0}' declared twice")]
    DuplicateChannel(String),
    #[error("pipeline declares no passes")]
    EmptySchedule,
}

/// Fatal per-frame failures. There is no partial-frame degraded mode: a
/// frame either completes or the loop terminates with this error.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame hook fired before initialisation completed ({0})")]
    NotInitialised(&'static str),
    #[error("pass '{pass}' failed")]
    Pass {
        pass: &'static str,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("resource initialisation failed")]
    Init(#[source] Box<dyn Error + Send + Sync>),
    #[error("presentation surface unavailable")]
    Surface(#[source] Box<dyn Error + Send + Sync>),
}

/// What one frame did, for logs and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReport {
    pub dispatched: usize,
    pub skipped: usize,
    /// Completed simulation generations (pause does not advance this).
    pub generation: u64,
}

struct NamedChannel<T> {
    name: String,
    pair: BufferPair<T>,
}

/// Assembles channels and the ordered pass list, validating the wiring.
pub struct PipelineBuilder<T> {
    channels: Vec<NamedChannel<T>>,
    passes: Vec<PassSpec>,
}

impl<T> PipelineBuilder<T> {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            passes: Vec::new(),
        }
    }

    /// Declares a double-buffered channel. Both sides must hold identical
    /// initial content so the first frame's read is well defined; that
    /// contract is the caller's because only the caller can clone its
    /// resources.
    pub fn channel(&mut self, name: impl Into<String>, pair: BufferPair<T>) -> ChannelId {
        let id = ChannelId(self.channels.len());
        self.channels.push(NamedChannel {
            name: name.into(),
            pair,
        });
        id
    }

    /// Appends a pass to the frame schedule. Order is execution order.
    pub fn pass(&mut self, pass: PassSpec) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn build(self) -> Result<SimulationPipeline<T>, PipelineError> {
        if self.passes.is_empty() {
            return Err(PipelineError::EmptySchedule);
        }
        for (index, channel) in self.channels.iter().enumerate() {
            if self.channels[..index]
                .iter()
                .any(|other| other.name == channel.name)
            {
                return Err(PipelineError::DuplicateChannel(channel.name.clone()));
            }
        }
        let mut back_written = vec![false; self.channels.len()];
        for pass in &self.passes {
            let mut referenced: Vec<ChannelId> =
                pass.inputs.iter().map(|(channel, _)| *channel).collect();
            if let Output::Channel(channel) = pass.output {
                referenced.push(channel);
            }
            for channel in referenced {
                if channel.0 >= self.channels.len() {
                    return Err(PipelineError::UnknownChannel {
                        pass: pass.name,
                        channel: channel.0,
                    });
                }
            }
            if let Output::Channel(written) = pass.output {
                let reads_own_back = pass
                    .inputs
                    .iter()
                    .any(|&(channel, side)| channel == written && side == Side::Back);
                if reads_own_back {
                    return Err(PipelineError::SelfRead { pass: pass.name });
                }
            }
            // A back read is an intra-frame dependency; it must follow the
            // pass that produces it, or it would observe last frame's data.
            for &(channel, side) in &pass.inputs {
                if side == Side::Back && !back_written[channel.0] {
                    return Err(PipelineError::BackReadBeforeWrite {
                        pass: pass.name,
                        channel: channel.0,
                    });
                }
            }
            if let Output::Channel(written) = pass.output {
                back_written[written.0] = true;
            }
        }
        Ok(SimulationPipeline {
            channels: self.channels,
            passes: self.passes,
            generation: 0,
        })
    }
}

impl<T> Default for PipelineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the buffer pairs and the ordered pass list, and runs the per-frame
/// protocol: read fronts, write backs, composite to screen, then flip
/// every pair exactly once.
pub struct SimulationPipeline<T> {
    channels: Vec<NamedChannel<T>>,
    passes: Vec<PassSpec>,
    generation: u64,
}

impl<T> SimulationPipeline<T> {
    pub fn builder() -> PipelineBuilder<T> {
        PipelineBuilder::new()
    }

    /// Executes one frame.
    ///
    /// Passes run in declared order; a dispatch failure aborts the frame
    /// before any flip so the error is surfaced instead of presenting a
    /// partial frame. When `controls.paused` is set the state-mutating
    /// passes are skipped, the rest still run, and the end-of-frame flips
    /// still toggle roles (both sides then hold prior generations, so the
    /// visible result is a no-op).
    pub fn frame<E>(
        &mut self,
        executor: &mut E,
        controls: Controls,
        timing: FrameTiming,
    ) -> Result<FrameReport, FrameError>
    where
        E: PassExecutor<Target = T>,
    {
        let mut dispatched = 0;
        let mut skipped = 0;

        for pass in &self.passes {
            if controls.paused && pass.mutates_state {
                skipped += 1;
                continue;
            }

            let inputs = pass
                .inputs
                .iter()
                .map(|&(channel, side)| {
                    let pair = &self.channels[channel.0].pair;
                    match side {
                        Side::Front => pair.front(),
                        Side::Back => pair.back(),
                    }
                })
                .collect();
            let output = match pass.output {
                Output::Channel(channel) => Some(self.channels[channel.0].pair.back()),
                Output::Screen => None,
            };

            executor
                .dispatch(
                    pass,
                    PassBindings {
                        inputs,
                        output,
                        controls,
                        timing,
                    },
                )
                .map_err(|source| FrameError::Pass {
                    pass: pass.name,
                    source: Box::new(source),
                })?;
            dispatched += 1;
        }

        // The single flip point of the frame: after every pass, before the
        // next frame begins.
        for channel in &mut self.channels {
            channel.pair.flip();
        }
        if !controls.paused {
            self.generation += 1;
        }

        tracing::trace!(
            dispatched,
            skipped,
            generation = self.generation,
            frame = timing.frame_index,
            "frame complete"
        );

        Ok(FrameReport {
            dispatched,
            skipped,
            generation: self.generation,
        })
    }

    pub fn channel(&self, id: ChannelId) -> &BufferPair<T> {
        &self.channels[id.0].pair
    }

    pub fn channel_name(&self, id: ChannelId) -> &str {
        &self.channels[id.0].name
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn passes(&self) -> &[PassSpec] {
        &self.passes
    }

    /// Completed simulation generations.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::convert::Infallible;

    use super::*;

    /// Stand-in render target with observable contents.
    #[derive(Debug)]
    struct FakeTarget {
        id: usize,
        contents: RefCell<u64>,
    }

    impl FakeTarget {
        fn new(id: usize) -> Self {
            Self {
                id,
                contents: RefCell::new(0),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct DrawRecord {
        pass: &'static str,
        inputs: Vec<usize>,
        output: Option<usize>,
    }

    /// Executor that records draws, enforces read/write isolation, and
    /// "writes" the frame index into the output target.
    #[derive(Default)]
    struct Recorder {
        draws: Vec<DrawRecord>,
    }

    impl PassExecutor for Recorder {
        type Target = FakeTarget;
        type Error = Infallible;

        fn dispatch(
            &mut self,
            pass: &PassSpec,
            bindings: PassBindings<'_, FakeTarget>,
        ) -> Result<(), Infallible> {
            if let Some(output) = bindings.output {
                assert!(
                    bindings.inputs.iter().all(|input| input.id != output.id),
                    "pass '{}' reads and writes target {}",
                    pass.name,
                    output.id
                );
                *output.contents.borrow_mut() = bindings.timing.frame_index + 1;
            }
            self.draws.push(DrawRecord {
                pass: pass.name,
                inputs: bindings.inputs.iter().map(|input| input.id).collect(),
                output: bindings.output.map(|output| output.id),
            });
            Ok(())
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("device lost")]
    struct DeviceLost;

    struct FailingExecutor;

    impl PassExecutor for FailingExecutor {
        type Target = FakeTarget;
        type Error = DeviceLost;

        fn dispatch(
            &mut self,
            _pass: &PassSpec,
            _bindings: PassBindings<'_, FakeTarget>,
        ) -> Result<(), DeviceLost> {
            Err(DeviceLost)
        }
    }

    struct Fixture {
        pipeline: SimulationPipeline<FakeTarget>,
        simulation: ChannelId,
        cells: ChannelId,
        deposit: ChannelId,
    }

    /// The production schedule: simulate → cells → deposit → composite
    /// over three channels, with unique target ids 0..=5.
    fn fixture() -> Fixture {
        let mut builder = SimulationPipeline::builder();
        let simulation = builder.channel(
            "simulation",
            BufferPair::new(FakeTarget::new(0), FakeTarget::new(1)),
        );
        let cells = builder.channel(
            "cells",
            BufferPair::new(FakeTarget::new(2), FakeTarget::new(3)),
        );
        let deposit = builder.channel(
            "deposit",
            BufferPair::new(FakeTarget::new(4), FakeTarget::new(5)),
        );
        builder
            .pass(PassSpec {
                name: "simulate",
                inputs: vec![(simulation, Side::Front), (deposit, Side::Front)],
                output: Output::Channel(simulation),
                geometry: Geometry::FullscreenQuad,
                mutates_state: true,
            })
            .pass(PassSpec {
                name: "cells",
                inputs: vec![(simulation, Side::Back)],
                output: Output::Channel(cells),
                geometry: Geometry::AgentPoints { count: 64 },
                mutates_state: true,
            })
            .pass(PassSpec {
                name: "deposit",
                inputs: vec![(deposit, Side::Front), (cells, Side::Back)],
                output: Output::Channel(deposit),
                geometry: Geometry::FullscreenQuad,
                mutates_state: true,
            })
            .pass(PassSpec {
                name: "composite",
                inputs: vec![(deposit, Side::Back), (cells, Side::Back)],
                output: Output::Screen,
                geometry: Geometry::FullscreenQuad,
                mutates_state: false,
            });
        Fixture {
            pipeline: builder.build().expect("valid schedule"),
            simulation,
            cells,
            deposit,
        }
    }

    fn timing(frame_index: u64) -> FrameTiming {
        FrameTiming {
            seconds: frame_index as f32 / 60.0,
            delta_seconds: 1.0 / 60.0,
            frame_index,
        }
    }

    #[test]
    fn unpaused_frame_dispatches_every_pass_in_order() {
        let Fixture {
            mut pipeline, ..
        } = fixture();
        let mut recorder = Recorder::default();
        let report = pipeline
            .frame(&mut recorder, Controls::default(), timing(0))
            .unwrap();

        assert_eq!(report.dispatched, 4);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.generation, 1);
        let order: Vec<_> = recorder.draws.iter().map(|draw| draw.pass).collect();
        assert_eq!(order, ["simulate", "cells", "deposit", "composite"]);
    }

    #[test]
    fn back_buffer_receives_new_contents_and_becomes_front() {
        let Fixture {
            mut pipeline,
            simulation,
            ..
        } = fixture();
        let mut recorder = Recorder::default();

        let front_before = pipeline.channel(simulation).front().id;
        let back_before = pipeline.channel(simulation).back().id;
        pipeline
            .frame(&mut recorder, Controls::default(), timing(0))
            .unwrap();

        // The written back buffer is the new front.
        assert_eq!(pipeline.channel(simulation).front().id, back_before);
        assert_eq!(*pipeline.channel(simulation).front().contents.borrow(), 1);
        // The pre-frame front was never written during the frame.
        assert!(recorder
            .draws
            .iter()
            .all(|draw| draw.output != Some(front_before)));
    }

    #[test]
    fn paused_frame_skips_mutating_passes_but_still_composites() {
        let Fixture {
            mut pipeline,
            simulation,
            ..
        } = fixture();
        let mut recorder = Recorder::default();
        let controls = Controls {
            paused: true,
            ..Controls::default()
        };

        let front_contents_before = *pipeline.channel(simulation).front().contents.borrow();
        let front_before = pipeline.channel(simulation).front().id;
        let report = pipeline.frame(&mut recorder, controls, timing(0)).unwrap();

        assert_eq!(report.dispatched, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.generation, 0);
        assert_eq!(recorder.draws.len(), 1);
        assert_eq!(recorder.draws[0].pass, "composite");
        // No write occurred anywhere; the old front (now the back after
        // the flip) is bit-identical.
        let old_front = pipeline.channel(simulation).back();
        assert_eq!(old_front.id, front_before);
        assert_eq!(*old_front.contents.borrow(), front_contents_before);
        // The flip still toggled roles.
        assert_ne!(pipeline.channel(simulation).front().id, front_before);
    }

    #[test]
    fn sixty_frames_flip_each_channel_sixty_times() {
        let Fixture {
            mut pipeline,
            simulation,
            cells,
            deposit,
        } = fixture();
        let mut recorder = Recorder::default();
        let channels = [simulation, cells, deposit];
        let mut flips = [0u32; 3];
        let mut fronts: Vec<usize> = channels
            .iter()
            .map(|&id| pipeline.channel(id).front().id)
            .collect();

        for frame in 0..60 {
            pipeline
                .frame(&mut recorder, Controls::default(), timing(frame))
                .unwrap();
            for (slot, &id) in channels.iter().enumerate() {
                let front = pipeline.channel(id).front().id;
                assert_ne!(front, fronts[slot], "channel must flip every frame");
                fronts[slot] = front;
                flips[slot] += 1;
            }
        }

        assert_eq!(flips, [60, 60, 60]);
        assert_eq!(pipeline.generation(), 60);
        assert_eq!(recorder.draws.len(), 60 * 4);
    }

    #[test]
    fn dispatch_failure_aborts_the_frame_before_any_flip() {
        let Fixture {
            mut pipeline,
            simulation,
            ..
        } = fixture();
        let front_before = pipeline.channel(simulation).front().id;

        let err = pipeline
            .frame(&mut FailingExecutor, Controls::default(), timing(0))
            .unwrap_err();
        match err {
            FrameError::Pass { pass, .. } => assert_eq!(pass, "simulate"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pipeline.channel(simulation).front().id, front_before);
        assert_eq!(pipeline.generation(), 0);
    }

    #[test]
    fn builder_rejects_reading_the_written_back_buffer() {
        let mut builder = SimulationPipeline::builder();
        let channel = builder.channel(
            "simulation",
            BufferPair::new(FakeTarget::new(0), FakeTarget::new(1)),
        );
        builder.pass(PassSpec {
            name: "broken",
            inputs: vec![(channel, Side::Back)],
            output: Output::Channel(channel),
            geometry: Geometry::FullscreenQuad,
            mutates_state: true,
        });
        assert!(matches!(
            builder.build(),
            Err(PipelineError::SelfRead { pass: "broken" })
        ));
    }

    #[test]
    fn builder_rejects_back_reads_with_no_earlier_writer() {
        let mut builder = SimulationPipeline::builder();
        let state = builder.channel(
            "state",
            BufferPair::new(FakeTarget::new(0), FakeTarget::new(1)),
        );
        let trail = builder.channel(
            "trail",
            BufferPair::new(FakeTarget::new(2), FakeTarget::new(3)),
        );
        // "present" consumes trail's back, but nothing before it writes
        // trail this frame.
        builder
            .pass(PassSpec {
                name: "step",
                inputs: vec![(state, Side::Front)],
                output: Output::Channel(state),
                geometry: Geometry::FullscreenQuad,
                mutates_state: true,
            })
            .pass(PassSpec {
                name: "present",
                inputs: vec![(trail, Side::Back)],
                output: Output::Screen,
                geometry: Geometry::FullscreenQuad,
                mutates_state: false,
            });
        assert!(matches!(
            builder.build(),
            Err(PipelineError::BackReadBeforeWrite {
                pass: "present",
                channel: 1
            })
        ));
    }

    #[test]
    fn builder_rejects_undeclared_channels_and_duplicates() {
        let mut builder: PipelineBuilder<FakeTarget> = SimulationPipeline::builder();
        builder.pass(PassSpec {
            name: "orphan",
            inputs: vec![(ChannelId(3), Side::Front)],
            output: Output::Screen,
            geometry: Geometry::FullscreenQuad,
            mutates_state: false,
        });
        assert!(matches!(
            builder.build(),
            Err(PipelineError::UnknownChannel {
                pass: "orphan",
                channel: 3
            })
        ));

        let mut builder = SimulationPipeline::builder();
        builder.channel(
            "deposit",
            BufferPair::new(FakeTarget::new(0), FakeTarget::new(1)),
        );
        builder.channel(
            "deposit",
            BufferPair::new(FakeTarget::new(2), FakeTarget::new(3)),
        );
        builder.pass(PassSpec {
            name: "composite",
            inputs: vec![],
            output: Output::Screen,
            geometry: Geometry::FullscreenQuad,
            mutates_state: false,
        });
        assert!(matches!(
            builder.build(),
            Err(PipelineError::DuplicateChannel(name)) if name == "deposit"
        ));
    }

    #[test]
    fn empty_schedule_is_rejected() {
        let builder: PipelineBuilder<FakeTarget> = SimulationPipeline::builder();
        assert!(matches!(builder.build(), Err(PipelineError::EmptySchedule)));
    }
}
