/// Display resolution (fixed window, logical pixels)
pub const SCREEN_WIDTH: u32 = 1024;
pub const SCREEN_HEIGHT: u32 = 768;

/// Screen pixels per grid cell along each axis (1024x768 -> 256x192 cells)
pub const DOWNSAMPLE: u32 = 4;

/// Compute kernel workgroup edge (8x8 invocations per workgroup)
pub const WORKGROUP_SIZE: u32 = 8;

pub const WINDOW_TITLE: &str = "Fluid Simulation";

// ============================================
// Control Surface Ranges
// ============================================

pub const PAINT_RADIUS_RANGE: (i32, i32) = (1, 100);
pub const PAINT_STRENGTH_RANGE: (f32, f32) = (-1.0, 1.0);
pub const PRECISION_RANGE: (i32, i32) = (1, 100);
pub const TIME_SCALE_RANGE: (f32, f32) = (-10.0, 10.0);

// ============================================
// Control Surface Defaults
// ============================================

pub const DEFAULT_TIME_SCALE: f32 = 1.0;
pub const DEFAULT_PAINT_RADIUS: i32 = 5;
pub const DEFAULT_PAINT_STRENGTH: f32 = 0.1;
pub const DEFAULT_PRECISION: i32 = 10;
pub const DEFAULT_PAINT_COLOR: [f32; 3] = [0.0, 0.0, 0.0];

/// Keyboard step sizes
pub const PAINT_STRENGTH_STEP: f32 = 0.05;
pub const TIME_SCALE_STEP: f32 = 0.5;
pub const PAINT_COLOR_STEP: f32 = 0.25;

// ============================================
// Kernel Physics
// ============================================

/// Density/colour diffusion rate (per unit of scaled time)
pub const DIFFUSION: f32 = 0.2;

/// Advection scale applied to the velocity back-trace
pub const ADVECTION: f32 = 1.0;

/// How strongly the pressure gradient corrects velocity
pub const PRESSURE_RESPONSE: f32 = 0.5;

/// Pointer position used when the cursor is outside the window.
/// Far enough out that no radius in PAINT_RADIUS_RANGE reaches the grid.
pub const OFF_GRID_POINTER: [f32; 2] = [-1.0e6, -1.0e6];

/// Background clear colour, rgb(53, 117, 40)
pub const CLEAR_COLOR: [f64; 3] = [53.0 / 255.0, 117.0 / 255.0, 40.0 / 255.0];

/// Environment variable selecting a windowless run of the host kernel
pub const HEADLESS_STEPS_ENV: &str = "FLUID_HEADLESS_STEPS";
