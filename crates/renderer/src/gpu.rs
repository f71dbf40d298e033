//! wgpu execution backend for the simulation schedule.
//!
//! The simulation crate decides which passes run and which buffers they
//! touch; this module turns each dispatch into a render pass. All state
//! lives in float textures, so every pass is a draw over either a
//! fullscreen quad or one point per agent.

pub(crate) mod context;
pub(crate) mod passes;
pub(crate) mod target;
pub(crate) mod uniforms;

use std::collections::HashMap;

use simulation::{Geometry, Output, PassBindings, PassExecutor, PassSpec};
use thiserror::Error;
use wgpu::util::DeviceExt;

use passes::PassKit;
use target::SimTarget;
use uniforms::SimUniforms;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("dispatch issued outside begin_frame/end_frame")]
    FrameNotBegun,
    #[error("no compiled pipeline for pass '{0}'")]
    UnknownPass(&'static str),
    #[error("pass '{0}' targets a channel but no output buffer was bound")]
    MissingOutput(&'static str),
}

fn shader_source(pass: &'static str) -> Option<&'static str> {
    match pass {
        "simulate" => Some(include_str!("../shaders/simulate.wgsl")),
        "cells" => Some(include_str!("../shaders/cells.wgsl")),
        "deposit" => Some(include_str!("../shaders/deposit.wgsl")),
        "composite" => Some(include_str!("../shaders/composite.wgsl")),
        _ => None,
    }
}

struct InFlight {
    encoder: wgpu::CommandEncoder,
    surface_view: wgpu::TextureView,
}

/// Executes simulation passes on a wgpu device.
///
/// One uniform buffer is shared by every pass; each dispatch uploads its
/// values through a staging copy on the frame encoder so passes recorded
/// into the same command buffer see their own snapshot.
pub(crate) struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    kits: HashMap<&'static str, PassKit>,
    uniforms: SimUniforms,
    uniform_buffer: wgpu::Buffer,
    quad_buffer: wgpu::Buffer,
    agent_buffer: wgpu::Buffer,
    grid_size: (u32, u32),
    frame: Option<InFlight>,
}

impl WgpuBackend {
    pub(crate) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        schedule: &[PassSpec],
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
        grid_size: (u32, u32),
    ) -> Result<Self, BackendError> {
        let mut kits = HashMap::new();
        for pass in schedule {
            let wgsl = shader_source(pass.name).ok_or(BackendError::UnknownPass(pass.name))?;
            kits.insert(pass.name, PassKit::new(device, pass, wgsl, surface_format));
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sim uniforms"),
            size: std::mem::size_of::<SimUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fullscreen quad"),
            contents: bytemuck::cast_slice(&passes::QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let slots = passes::agent_slots(grid_size.0, grid_size.1);
        let agent_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("agent slots"),
            contents: bytemuck::cast_slice(&slots),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            kits,
            uniforms: SimUniforms::new(surface_size, grid_size),
            uniform_buffer,
            quad_buffer,
            agent_buffer,
            grid_size,
            frame: None,
        })
    }

    pub(crate) fn set_surface_size(&mut self, width: u32, height: u32) {
        self.uniforms.set_surface(width, height);
    }

    /// Opens a command encoder for the next frame. Every dispatch until
    /// `end_frame` records into it; screen-targeted passes draw to `view`.
    pub(crate) fn begin_frame(&mut self, view: wgpu::TextureView) {
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.frame = Some(InFlight {
            encoder,
            surface_view: view,
        });
    }

    /// Submits the recorded frame. A frame with no dispatches submits an
    /// empty command buffer, which is harmless.
    pub(crate) fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.queue.submit(Some(frame.encoder.finish()));
        }
    }
}

/// Staged copy rather than `queue.write_buffer` so each pass in the
/// encoder sees the values current at record time.
fn upload_uniforms(
    device: &wgpu::Device,
    encoder: &mut wgpu::CommandEncoder,
    uniform_buffer: &wgpu::Buffer,
    uniforms: &SimUniforms,
) {
    let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("uniform staging"),
        contents: bytemuck::bytes_of(uniforms),
        usage: wgpu::BufferUsages::COPY_SRC,
    });
    encoder.copy_buffer_to_buffer(
        &staging,
        0,
        uniform_buffer,
        0,
        std::mem::size_of::<SimUniforms>() as u64,
    );
}

impl PassExecutor for WgpuBackend {
    type Target = SimTarget;
    type Error = BackendError;

    fn dispatch(
        &mut self,
        pass: &PassSpec,
        bindings: PassBindings<'_, SimTarget>,
    ) -> Result<(), BackendError> {
        let kit = self
            .kits
            .get(pass.name)
            .ok_or(BackendError::UnknownPass(pass.name))?;

        self.uniforms.apply(&bindings.controls, &bindings.timing);

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: self.uniform_buffer.as_entire_binding(),
        }];
        for (index, input) in bindings.inputs.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + index as u32,
                resource: wgpu::BindingResource::TextureView(&input.view),
            });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(pass.name),
            layout: &kit.bind_layout,
            entries: &entries,
        });

        let frame = self.frame.as_mut().ok_or(BackendError::FrameNotBegun)?;
        let attachment = match pass.output {
            Output::Screen => &frame.surface_view,
            Output::Channel(_) => {
                &bindings
                    .output
                    .ok_or(BackendError::MissingOutput(pass.name))?
                    .view
            }
        };

        upload_uniforms(
            &self.device,
            &mut frame.encoder,
            &self.uniform_buffer,
            &self.uniforms,
        );

        let mut rpass = frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.name),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        rpass.set_pipeline(&kit.pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        match pass.geometry {
            Geometry::FullscreenQuad => {
                rpass.set_vertex_buffer(0, self.quad_buffer.slice(..));
                rpass.draw(0..6, 0..1);
            }
            Geometry::AgentPoints { count } => {
                rpass.set_vertex_buffer(0, self.agent_buffer.slice(..));
                rpass.draw(0..count, 0..1);
            }
        }
        drop(rpass);

        tracing::trace!(pass = pass.name, grid_w = self.grid_size.0, "dispatched");
        Ok(())
    }
}
