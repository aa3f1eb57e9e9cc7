/// GPU-compatible grid cell for the fluid simulation.
///
/// Layout: 48 bytes total, matching the WGSL `Node` struct in `grid.wgsl`.
/// - color: [f32; 4] = 16 bytes - Paint tint (rgb) and paint coverage (a), 16-byte aligned
/// - velocity: [f32; 2] = 8 bytes
/// - position: [i32; 2] = 8 bytes - Grid coordinate, fixed for the cell's lifetime
/// - initialized: u32 = 4 bytes - 1 once the cell has been painted
/// - density: f32 = 4 bytes
/// - pressure: f32 = 4 bytes
/// - reserved: f32 = 4 bytes - Pads the record to a multiple of 16
///
/// Do not reorder: both kernels address these fields by byte offset.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Cell {
    pub color: [f32; 4],
    pub velocity: [f32; 2],
    pub position: [i32; 2],
    pub initialized: u32,
    pub density: f32,
    pub pressure: f32,
    pub reserved: f32,
}

/// Size of one cell record in bytes
pub const CELL_SIZE: usize = std::mem::size_of::<Cell>();

impl Cell {
    /// A resting, unpainted cell at grid coordinate (x, y)
    pub fn at(x: u32, y: u32) -> Self {
        Self {
            position: [x as i32, y as i32],
            ..Self::default()
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized != 0
    }
}
