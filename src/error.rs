/// Fatal start-up failures. None of these are retried: `main` logs the
/// diagnostic and exits.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("Surface not supported by adapter")]
    SurfaceUnsupported,

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Adapter does not support compute shaders")]
    NoComputeSupport,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Grid storage of {bytes} bytes could not be allocated: {reason}")]
    Allocation { bytes: u64, reason: String },

    #[error("Grid extent {width}x{height} is not a multiple of the {workgroup}x{workgroup} workgroup")]
    Tiling { width: u32, height: u32, workgroup: u32 },

    #[error("Kernel program failed to build: {0}")]
    KernelBuild(String),
}
