pub mod cell;
pub mod cpu_kernel;
pub mod grid;
pub mod interaction;
pub mod kernel;
pub mod scheduler;
pub mod step;
pub mod store;

pub use cell::Cell;
pub use cpu_kernel::CpuKernel;
pub use grid::GridExtent;
pub use interaction::{FrameInput, PaintControls, PaintMode, PointerState};
pub use kernel::PhysicsConfig;
pub use step::SimulationLoop;
