//! GPU renderer for the myxo slime-mold simulation.
//!
//! The crate glues the preview window, the `wgpu` pass executor, and the
//! double-buffered frame protocol from the `simulation` crate together.
//! The overall flow is:
//!
//! ```text
//!   CLI / myxo
//!        │ RendererConfig
//!        ▼
//!   run ──▶ WindowDriver ──▶ winit event loop ──▶ SimApp::on_frame()
//!                                       │
//!                                       └─▶ GpuSim::render() ─▶ pass dispatches ─▶ flip
//! ```
//!
//! `GpuSim` owns all GPU resources (surface, device, channel textures,
//! pipelines); `SimApp` is the thin [`FrameHandler`] that creates it once
//! a live window exists and steps it every redraw. All simulation state
//! stays on the GPU in float textures; the CPU only uploads the initial
//! seed and a uniform block per pass.

mod gpu;
mod sim;
pub mod window;

use simulation::{Controls, DriverError, FrameDriver, FrameError, FrameTiming};

use crate::gpu::context::GpuContext;
use crate::sim::GpuSim;
use crate::window::{ShellContext, WindowDriver};

pub use crate::gpu::context::AdapterProfile;

/// Everything the binary decides before handing off to the renderer.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub window_title: String,
    /// Initial window dimensions in physical pixels.
    pub surface_size: (u32, u32),
    /// Agent grid dimensions; one potential agent per texel.
    pub grid_size: (u32, u32),
    /// Fraction of grid slots seeded with a live agent.
    pub seed_fraction: f32,
    pub initial_controls: Controls,
    pub vsync: bool,
    /// Wall-clock frame cap; `None` leaves pacing to vsync.
    pub target_fps: Option<f32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window_title: "myxo".into(),
            surface_size: (1280, 720),
            grid_size: (256, 256),
            seed_fraction: 0.25,
            initial_controls: Controls::default(),
            vsync: true,
            target_fps: None,
        }
    }
}

/// Frame handler bridging the window shell to the GPU simulation.
///
/// Construction is cheap and GPU-free; the device, surface, and channel
/// textures come into existence in `on_init`, once the driver has a live
/// window to hand over. A redraw arriving before that is a hard error,
/// not a silent skip.
pub struct SimApp {
    grid_size: (u32, u32),
    seed_fraction: f32,
    vsync: bool,
    sim: Option<GpuSim>,
}

impl SimApp {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            grid_size: config.grid_size,
            seed_fraction: config.seed_fraction,
            vsync: config.vsync,
            sim: None,
        }
    }
}

impl simulation::FrameHandler for SimApp {
    type Context = ShellContext;

    fn on_init(&mut self, ctx: &mut ShellContext) -> Result<(), FrameError> {
        let context = GpuContext::new(ctx.window.as_ref(), ctx.size, self.vsync)
            .map_err(|err| FrameError::Init(err.into()))?;
        if context.adapter_profile.is_software() {
            tracing::warn!(
                adapter = %context.adapter_profile.name,
                "software rasterizer detected; expect low frame rates"
            );
        }
        self.sim = Some(GpuSim::new(context, self.grid_size, self.seed_fraction)?);
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut ShellContext, timing: FrameTiming) -> Result<(), FrameError> {
        let sim = self
            .sim
            .as_mut()
            .ok_or(FrameError::NotInitialised("gpu simulation"))?;
        let report = sim.render(ctx.controls, timing)?;
        tracing::trace!(
            dispatched = report.dispatched,
            skipped = report.skipped,
            generation = report.generation,
            "frame presented"
        );
        Ok(())
    }

    fn on_resize(&mut self, _ctx: &mut ShellContext, width: u32, height: u32) -> Result<(), FrameError> {
        match self.sim.as_mut() {
            Some(sim) => sim.resize(width, height),
            // Resize events may precede init on some platforms.
            None => Ok(()),
        }
    }
}

/// Opens the window and runs the simulation until the user quits.
pub fn run(config: RendererConfig) -> Result<(), DriverError> {
    let app = SimApp::new(&config);
    WindowDriver::new(config.window_title.clone(), config.surface_size)
        .with_controls(config.initial_controls)
        .with_target_fps(config.target_fps)
        .drive(app)
}
