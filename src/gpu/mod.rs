mod buffers;
mod compute;
mod context;
mod render;

pub use compute::GpuKernel;
pub use context::GpuContext;
pub use render::RenderPipeline;
