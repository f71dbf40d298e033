use simulation::{
    BufferPair, ChannelId, Controls, FrameError, FrameReport, FrameTiming, Geometry, Output,
    PassSpec, SeedBuffer, Side, SimulationPipeline,
};
use winit::dpi::PhysicalSize;

use crate::gpu::context::GpuContext;
use crate::gpu::target::{SimTarget, TargetDesc};
use crate::gpu::WgpuBackend;

/// The GPU-resident simulation: device context, pass executor, and the
/// double-buffered channel set wired into the frame schedule.
pub(crate) struct GpuSim {
    context: GpuContext,
    backend: WgpuBackend,
    pipeline: SimulationPipeline<SimTarget>,
    grid: (u32, u32),
    seed_fraction: f32,
}

struct Channels {
    pipeline: SimulationPipeline<SimTarget>,
    schedule: Vec<PassSpec>,
}

/// Builds the three channels and the frame schedule.
///
/// The simulation channel holds one texel per agent and both of its sides
/// are uploaded from the same scatter so the first frame reads a defined
/// state. The cells and deposit channels are display-sized trail maps and
/// start black (fresh textures are zeroed).
fn build_channels(
    context: &GpuContext,
    grid: (u32, u32),
    seed_fraction: f32,
) -> Result<Channels, FrameError> {
    let seed = SeedBuffer::scatter_fraction(grid.0 as i64, grid.1 as i64, seed_fraction)
        .map_err(|err| FrameError::Init(Box::new(err)))?;
    tracing::info!(
        grid_w = grid.0,
        grid_h = grid.1,
        agents = seed.live_cells(),
        "seeded agent grid"
    );

    let device = &context.device;
    let queue = &context.queue;
    let sim_desc = TargetDesc {
        label: "simulation".into(),
        width: grid.0,
        height: grid.1,
    };
    let trail_desc = |label: &str| TargetDesc {
        label: label.into(),
        width: context.size.width,
        height: context.size.height,
    };

    let mut builder = SimulationPipeline::builder();
    let simulation = builder.channel(
        "simulation",
        BufferPair::new(
            SimTarget::seeded(device, queue, &sim_desc, &seed),
            SimTarget::seeded(device, queue, &sim_desc, &seed),
        ),
    );
    let cells_desc = trail_desc("cells");
    let cells = builder.channel(
        "cells",
        BufferPair::new(
            SimTarget::new(device, &cells_desc),
            SimTarget::new(device, &cells_desc),
        ),
    );
    let deposit_desc = trail_desc("deposit");
    let deposit = builder.channel(
        "deposit",
        BufferPair::new(
            SimTarget::new(device, &deposit_desc),
            SimTarget::new(device, &deposit_desc),
        ),
    );

    let schedule = frame_schedule(simulation, cells, deposit, grid.0 * grid.1);
    for pass in &schedule {
        builder.pass(pass.clone());
    }
    let pipeline = builder
        .build()
        .map_err(|err| FrameError::Init(Box::new(err)))?;
    Ok(Channels { pipeline, schedule })
}

/// The fixed per-frame pass order. Each agent advances once (simulate),
/// is splatted into the cells map (one point per agent), diffuses into
/// the deposit trail, and the trail is composited to the screen.
fn frame_schedule(
    simulation: ChannelId,
    cells: ChannelId,
    deposit: ChannelId,
    agent_count: u32,
) -> Vec<PassSpec> {
    vec![
        PassSpec {
            name: "simulate",
            inputs: vec![(simulation, Side::Front), (deposit, Side::Front)],
            output: Output::Channel(simulation),
            geometry: Geometry::FullscreenQuad,
            mutates_state: true,
        },
        PassSpec {
            name: "cells",
            inputs: vec![(simulation, Side::Back)],
            output: Output::Channel(cells),
            geometry: Geometry::AgentPoints { count: agent_count },
            mutates_state: true,
        },
        PassSpec {
            name: "deposit",
            inputs: vec![(deposit, Side::Front), (cells, Side::Back)],
            output: Output::Channel(deposit),
            geometry: Geometry::FullscreenQuad,
            mutates_state: true,
        },
        PassSpec {
            name: "composite",
            inputs: vec![(deposit, Side::Back), (cells, Side::Back)],
            output: Output::Screen,
            geometry: Geometry::FullscreenQuad,
            mutates_state: false,
        },
    ]
}

impl GpuSim {
    pub(crate) fn new(
        context: GpuContext,
        grid: (u32, u32),
        seed_fraction: f32,
    ) -> Result<Self, FrameError> {
        let Channels { pipeline, schedule } = build_channels(&context, grid, seed_fraction)?;
        let backend = WgpuBackend::new(
            &context.device,
            &context.queue,
            &schedule,
            context.surface_format,
            (context.size.width, context.size.height),
            grid,
        )
        .map_err(|err| FrameError::Init(Box::new(err)))?;
        Ok(Self {
            context,
            backend,
            pipeline,
            grid,
            seed_fraction,
        })
    }

    /// Runs one frame against the swapchain.
    ///
    /// A lost or outdated surface reconfigures and reports a zero-dispatch
    /// frame; the next redraw picks up normally. Any other acquisition
    /// failure is fatal.
    pub(crate) fn render(
        &mut self,
        controls: Controls,
        timing: FrameTiming,
    ) -> Result<FrameReport, FrameError> {
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost, reconfiguring");
                self.context.reconfigure();
                return Ok(FrameReport {
                    dispatched: 0,
                    skipped: 0,
                    generation: self.pipeline.generation(),
                });
            }
            Err(err) => return Err(FrameError::Surface(Box::new(err))),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.backend.begin_frame(view);
        let report = self
            .pipeline
            .frame(&mut self.backend, controls, timing)?;
        self.backend.end_frame();
        frame.present();
        Ok(report)
    }

    /// Rebuilds the display-sized channels for the new dimensions and
    /// re-seeds the agent grid, matching the from-scratch start the
    /// simulation cannot meaningfully rescale.
    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<(), FrameError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.context.config.width = width;
        self.context.config.height = height;
        self.context.size = PhysicalSize::new(width, height);
        self.context.reconfigure();

        let Channels { pipeline, .. } =
            build_channels(&self.context, self.grid, self.seed_fraction)?;
        self.pipeline = pipeline;
        self.backend.set_surface_size(width, height);
        tracing::debug!(width, height, "rebuilt render targets");
        Ok(())
    }
}
