//! Double-buffered simulation core for myxo.
//!
//! Everything in this crate is GPU-free: it owns the ping-pong buffer
//! pairs, the pass schedule, and the per-frame protocol, and delegates the
//! actual draws to a [`PassExecutor`] implemented by the renderer crate.
//! The overall flow is:
//!
//! ```text
//!   FrameDriver tick
//!        │ on_frame(controls snapshot, timing)
//!        ▼
//!   SimulationPipeline::frame ──▶ dispatch passes in order ──▶ executor
//!        │   (fronts read, backs written, screen composited)
//!        └─▶ flip every BufferPair exactly once
//! ```
//!
//! The next tick sees this frame's output as the new front of every
//! channel. Pausing skips the state-mutating passes but keeps the
//! render/composite passes (and the end-of-frame flips) running.

pub mod controls;
pub mod driver;
pub mod flip;
pub mod pipeline;
pub mod seed;

pub use controls::{Controls, DragPoint};
pub use driver::{DriverError, FrameClock, FrameDriver, FrameHandler, FrameTiming, ManualDriver};
pub use flip::BufferPair;
pub use pipeline::{
    ChannelId, FrameError, FrameReport, Geometry, Output, PassBindings, PassExecutor, PassSpec,
    PipelineBuilder, PipelineError, Side, SimulationPipeline,
};
pub use seed::{SeedBuffer, SeedError};
