use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferUsages, Device, Queue, Texture, TextureView};

use crate::error::InitError;
use crate::simulation::grid::GridExtent;
use crate::simulation::kernel::KernelParams;
use crate::simulation::store::GridStateStore;

/// Format of the sampled output image
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Allocate the two device-side grid regions and upload the default grid.
///
/// Fails if the region exceeds the device's storage binding limits or the
/// driver reports out-of-memory while creating it.
pub fn allocate_device_grid(
    device: &Device,
    extent: GridExtent,
) -> Result<GridStateStore<Buffer>, InitError> {
    let bytes = extent.byte_size();
    let limits = device.limits();
    let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    if bytes > limit {
        return Err(InitError::Allocation {
            bytes,
            reason: format!("exceeds device storage limit of {limit} bytes"),
        });
    }

    GridStateStore::allocate_with(extent, |id, initial| {
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let label = format!("grid-buffer-{:?}", id).to_lowercase();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&label),
            contents: bytemuck::cast_slice(&initial.cells),
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
        });

        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(InitError::Allocation {
                bytes,
                reason: err.to_string(),
            }),
            None => Ok(buffer),
        }
    })
}

/// Uniform buffer holding the kernel's parameter slots
pub fn create_params_buffer(device: &Device, params: &KernelParams) -> Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("kernel-params-buffer"),
        contents: bytemuck::bytes_of(params),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    })
}

/// Image the kernel writes each step and the presenter samples
pub struct OutputImage {
    // Kept alive for the view
    #[allow(dead_code)]
    pub texture: Texture,
    pub view: TextureView,
}

impl OutputImage {
    /// One texel per cell, blank white until the first step
    pub fn new(device: &Device, queue: &Queue, extent: GridExtent) -> Self {
        let white: Vec<[f32; 4]> = vec![[1.0; 4]; extent.cell_count()];

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("output-image"),
                size: wgpu::Extent3d {
                    width: extent.width,
                    height: extent.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OUTPUT_FORMAT,
                usage: wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            bytemuck::cast_slice(&white),
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}
