//! wgpu realisation of the simulation and render backends.

pub mod backend;
pub mod context;
pub mod pipeline;

pub use backend::WgpuBackend;
pub use context::GpuContext;

use thiserror::Error;

/// Record stride the WGSL kernels declare for the particle storage array.
/// Checked against the host layout when the backend is built.
pub const KERNEL_RECORD_STRIDE_BYTES: u64 = 40;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    AdapterUnavailable,
    #[error("failed to acquire GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("particle record stride mismatch: host {host} bytes, kernel expects {kernel}")]
    StrideMismatch { host: u64, kernel: u64 },
    #[error("no particle buffer resident; read-back requires a configured driver")]
    NotResident,
    #[error("failed to map staging buffer for read-back")]
    MapFailed,
    #[error("read-back channel closed before the map completed")]
    ChannelClosed,
}
