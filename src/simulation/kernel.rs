use crate::config::{ADVECTION, DIFFUSION, PRESSURE_RESPONSE};
use crate::error::InitError;
use crate::simulation::grid::GridExtent;
use crate::simulation::interaction::ParamRecord;
use crate::simulation::scheduler::{Roles, StepCommitted};

/// One parallel grid update per call sequence:
/// `bind_roles` -> `push_parameters` -> `dispatch` -> `barrier`.
///
/// Invocations for distinct cells run unordered. Each reads only the region
/// bound as read and writes only its own cell in the region bound as write.
pub trait KernelDispatch {
    fn extent(&self) -> GridExtent;

    /// Bind the scheduler's read/write regions to the kernel's two slots
    fn bind_roles(&mut self, roles: Roles);

    /// Upload this step's parameters into the fixed slots
    fn push_parameters(&mut self, record: &ParamRecord);

    /// Issue one invocation per cell of the bound write region
    fn dispatch(&mut self);

    /// Make the dispatch's writes visible to buffer reads and to image
    /// sampling. Returns the commit the scheduler needs to advance, or None
    /// when nothing was dispatched since the last barrier.
    fn barrier(&mut self) -> Option<StepCommitted>;

    /// Free grid storage. Safe to call more than once.
    fn release(&mut self);
}

/// Fixed dispatch tiling
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkgroupTiling {
    pub size: u32,
    pub groups_x: u32,
    pub groups_y: u32,
}

impl WorkgroupTiling {
    /// Tile `extent` into `size`x`size` workgroups. The grid must divide evenly.
    pub fn configure(extent: GridExtent, size: u32) -> Result<Self, InitError> {
        extent.check_tiling(size)?;
        Ok(Self {
            size,
            groups_x: extent.width.div_ceil(size),
            groups_y: extent.height.div_ceil(size),
        })
    }
}

/// Coefficients of the kernel body. Each term is skipped when its
/// coefficient is exactly zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub diffusion: f32,
    pub advection: f32,
    pub pressure_response: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            diffusion: DIFFUSION,
            advection: ADVECTION,
            pressure_response: PRESSURE_RESPONSE,
        }
    }
}

impl PhysicsConfig {
    /// All transport terms disabled; only painting changes the grid
    pub fn at_rest() -> Self {
        Self {
            diffusion: 0.0,
            advection: 0.0,
            pressure_response: 0.0,
        }
    }
}

/// Kernel parameter block (80 bytes, matches `Params` in `grid.wgsl`).
///
/// The first nine fields are the kernel's parameter slots in their fixed
/// order; grid and physics constants follow.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub paint_color: [f32; 3],
    pub paint_strength: f32,
    pub paint_radius: i32,
    pub paint_mode: i32,
    pub right_button: i32,
    pub _padding0: i32, // vec2 alignment
    pub pointer: [f32; 2],
    pub secondary_pointer: [f32; 2],
    pub delta_time: f32,
    pub iterations: i32,

    pub grid_width: u32,
    pub grid_height: u32,
    pub downsample: f32,
    pub diffusion: f32,
    pub advection: f32,
    pub pressure_response: f32,
}

impl KernelParams {
    /// Parameter block before the first push: no paint, secondary pointer at
    /// the origin
    pub fn new(extent: GridExtent, physics: PhysicsConfig) -> Self {
        Self {
            paint_color: [0.0; 3],
            paint_strength: 0.0,
            paint_radius: 1,
            paint_mode: 0,
            right_button: 0,
            _padding0: 0,
            pointer: [0.0; 2],
            secondary_pointer: [0.0; 2],
            delta_time: 0.0,
            iterations: 1,
            grid_width: extent.width,
            grid_height: extent.height,
            downsample: extent.downsample as f32,
            diffusion: physics.diffusion,
            advection: physics.advection,
            pressure_response: physics.pressure_response,
        }
    }

    /// Serialize a record into the slots. A withheld secondary pointer keeps
    /// the last forwarded value, like a uniform that is not re-uploaded.
    pub fn apply(&mut self, record: &ParamRecord) {
        self.paint_color = record.paint_color;
        self.paint_strength = record.paint_strength;
        self.paint_radius = record.paint_radius;
        self.paint_mode = record.paint_mode.slot_value();
        self.right_button = record.right_button as i32;
        self.pointer = record.pointer;
        if let Some(secondary) = record.secondary_pointer {
            self.secondary_pointer = secondary;
        }
        self.delta_time = record.delta_time;
        self.iterations = record.precision;
    }
}
