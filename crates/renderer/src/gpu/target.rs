use simulation::SeedBuffer;

/// Texel format shared by every offscreen channel. Float components keep
/// agent positions/headings at full precision; shaders read the textures
/// with `textureLoad`, so filterability does not matter.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

const BYTES_PER_TEXEL: u32 = 16;

/// Shape of a render target. Dimensions are immutable after creation.
#[derive(Clone, Debug)]
pub(crate) struct TargetDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

/// An owned framebuffer/texture pair: the unit of double-buffering.
///
/// Exclusively owned by one slot of one [`simulation::BufferPair`]; pixel
/// contents change only when a pass declares the target as its output.
pub struct SimTarget {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl SimTarget {
    pub(crate) fn new(device: &wgpu::Device, desc: &TargetDesc) -> Self {
        let extent = wgpu::Extent3d {
            width: desc.width.max(1),
            height: desc.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width: extent.width,
            height: extent.height,
        }
    }

    /// Creates a target pre-populated from a seed buffer. Both sides of a
    /// pair are built from the same buffer so the first frame's
    /// read-before-any-write is well defined.
    pub(crate) fn seeded(device: &wgpu::Device, queue: &wgpu::Queue, desc: &TargetDesc, seed: &SeedBuffer) -> Self {
        debug_assert_eq!((seed.width(), seed.height()), (desc.width, desc.height));
        let target = Self::new(device, desc);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            seed.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(target.width * BYTES_PER_TEXEL),
                rows_per_image: Some(target.height),
            },
            wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
        );
        target
    }
}
