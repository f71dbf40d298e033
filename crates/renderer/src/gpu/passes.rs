use std::borrow::Cow;

use simulation::{Geometry, Output, PassSpec};

use super::target::TARGET_FORMAT;

/// Vertex layout shared by every pass: one `vec2<f32>` per vertex, either
/// a clip-space quad corner or a normalized agent slot.
const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: 8,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: 0,
    }],
};

/// Compiled pipeline and layout for one pass of the schedule.
pub(crate) struct PassKit {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_layout: wgpu::BindGroupLayout,
}

impl PassKit {
    /// Builds the wgpu pipeline for `pass` from its WGSL payload. The
    /// bind group layout is binding 0 = uniform block, then one
    /// non-filterable float texture per declared input; shaders read them
    /// with `textureLoad`, so no samplers are bound.
    pub(crate) fn new(
        device: &wgpu::Device,
        pass: &PassSpec,
        wgsl: &str,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(pass.name),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(wgsl)),
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for index in 0..pass.inputs.len() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1 + index as u32,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} bind layout", pass.name)),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", pass.name)),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let target_format = match pass.output {
            Output::Screen => surface_format,
            Output::Channel(_) => TARGET_FORMAT,
        };
        let topology = match pass.geometry {
            Geometry::FullscreenQuad => wgpu::PrimitiveTopology::TriangleList,
            Geometry::AgentPoints { .. } => wgpu::PrimitiveTopology::PointList,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(pass.name),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[VERTEX_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_layout,
        }
    }
}

/// Two triangles covering the whole target, in clip space. The same six
/// vertices feed every fullscreen pass.
pub(crate) const QUAD_VERTICES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

/// Per-agent vertex data: the normalized center of each agent's slot in
/// the state grid, computed once from the target dimensions.
pub(crate) fn agent_slots(width: u32, height: u32) -> Vec<[f32; 2]> {
    let mut slots = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            slots.push([
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            ]);
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_slots_cover_the_grid_once() {
        let slots = agent_slots(4, 3);
        assert_eq!(slots.len(), 12);
        assert!(slots
            .iter()
            .all(|slot| (0.0..1.0).contains(&slot[0]) && (0.0..1.0).contains(&slot[1])));
        // Distinct slots for distinct agents.
        for (index, slot) in slots.iter().enumerate() {
            assert!(!slots[..index].contains(slot));
        }
    }

    #[test]
    fn quad_covers_clip_space() {
        for corner in [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
            assert!(QUAD_VERTICES.contains(&corner));
        }
    }
}
