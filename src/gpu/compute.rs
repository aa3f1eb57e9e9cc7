use std::sync::Arc;
use wgpu::{BindGroup, Buffer, CommandEncoder, ComputePipeline, Device, Queue, TextureView};

use crate::config::WORKGROUP_SIZE;
use crate::error::InitError;
use crate::gpu::buffers::{allocate_device_grid, create_params_buffer, OutputImage, OUTPUT_FORMAT};
use crate::simulation::grid::GridExtent;
use crate::simulation::interaction::ParamRecord;
use crate::simulation::kernel::{KernelDispatch, KernelParams, PhysicsConfig, WorkgroupTiling};
use crate::simulation::scheduler::{BufferId, Roles, StepCommitted};
use crate::simulation::store::GridStateStore;

/// The grid kernel on the GPU.
///
/// `barrier` submits the recorded dispatch. wgpu orders submissions on the
/// queue and tracks the storage buffer and storage texture usages across
/// them, so anything encoded afterwards (the next step's buffer reads, the
/// presenter's texture sampling) observes this step's writes.
pub struct GpuKernel {
    device: Arc<Device>,
    queue: Arc<Queue>,
    pipeline: ComputePipeline,
    store: GridStateStore<Buffer>,
    params: KernelParams,
    params_buffer: Buffer,
    output: OutputImage,
    tiling: WorkgroupTiling,
    /// Indexed by the read region's slot
    bind_groups: Option<[BindGroup; 2]>,
    bound: Option<Roles>,
    encoder: Option<(CommandEncoder, Roles)>,
}

impl GpuKernel {
    pub fn new(
        device: Arc<Device>,
        queue: Arc<Queue>,
        extent: GridExtent,
        physics: PhysicsConfig,
    ) -> Result<Self, InitError> {
        let tiling = WorkgroupTiling::configure(extent, WORKGROUP_SIZE)?;
        log::info!(
            "Kernel tiling: {}x{} workgroups of {}x{}",
            tiling.groups_x,
            tiling.groups_y,
            tiling.size,
            tiling.size
        );

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grid-kernel"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/grid.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grid-kernel-bind-group-layout"),
            entries: &[
                // Previous state (read-only storage)
                storage_entry(0, true),
                // Current state (written this step)
                storage_entry(1, false),
                // Parameter slots (uniform)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Output image
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: OUTPUT_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grid-kernel-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("grid-kernel-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(InitError::KernelBuild(err.to_string()));
        }

        let store = allocate_device_grid(&device, extent)?;
        let params = KernelParams::new(extent, physics);
        let params_buffer = create_params_buffer(&device, &params);
        let output = OutputImage::new(&device, &queue, extent);

        let bind_groups = {
            let make = |read: BufferId| -> Option<BindGroup> {
                let previous = store.region(read)?;
                let current = store.region(read.other())?;
                Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("grid-kernel-bind-group"),
                    layout: &bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: previous.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: current.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: params_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::TextureView(&output.view),
                        },
                    ],
                }))
            };
            make(BufferId::A).zip(make(BufferId::B)).map(|(a, b)| [a, b])
        };

        Ok(Self {
            device,
            queue,
            pipeline,
            store,
            params,
            params_buffer,
            output,
            tiling,
            bind_groups,
            bound: None,
            encoder: None,
        })
    }

    /// View of the image the presenter samples
    pub fn output_view(&self) -> &TextureView {
        &self.output.view
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl KernelDispatch for GpuKernel {
    fn extent(&self) -> GridExtent {
        self.store.extent()
    }

    fn bind_roles(&mut self, roles: Roles) {
        self.bound = Some(roles);
    }

    fn push_parameters(&mut self, record: &ParamRecord) {
        self.params.apply(record);
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));
    }

    fn dispatch(&mut self) {
        let Some(roles) = self.bound else {
            debug_assert!(false, "dispatch without bound roles");
            return;
        };
        let Some(bind_groups) = &self.bind_groups else {
            log::warn!("Dispatch after grid storage was released");
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("grid-step-encoder"),
            });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("grid-step-pass"),
                timestamp_writes: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_groups[roles.read().slot()], &[]);
            pass.dispatch_workgroups(self.tiling.groups_x, self.tiling.groups_y, 1);
        }

        self.encoder = Some((encoder, roles));
    }

    fn barrier(&mut self) -> Option<StepCommitted> {
        let (encoder, roles) = self.encoder.take()?;
        self.queue.submit(std::iter::once(encoder.finish()));
        Some(StepCommitted::new(roles.write()))
    }

    fn release(&mut self) {
        self.encoder = None;
        self.bind_groups = None;
        self.bound = None;
        self.store.release();
    }
}
