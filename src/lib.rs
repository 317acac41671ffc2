//! GPU-resident particle simulation driver.
//!
//! One [`ParticleDriver`] owns a structured buffer of particle records,
//! refreshes it once per frame with a compute dispatch and issues a single
//! indirect instanced draw over it. The host frame loop drives the explicit
//! `configure` / `advance` / `shutdown` lifecycle; the GPU work itself goes
//! through a [`SimulationBackend`], with [`gpu::WgpuBackend`] as the real
//! implementation and [`testing::RecordingBackend`] for headless tests.

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod gpu;
pub mod mesh;
pub mod particle;
pub mod testing;

pub use backend::{BoundsHint, FrameUniforms, MaterialParams, SimulationBackend};
pub use config::{ConfigError, SimConfig};
pub use dispatch::{DispatchPlan, DrawArgs, THREAD_BLOCK_SIZE, TIME_DAMPING};
pub use driver::{DriverError, DriverState, ParticleDriver};
pub use mesh::{PrimitiveKind, PrimitiveMesh};
pub use particle::{seed_records, ParticleRecord, RECORD_STRIDE_BYTES};
