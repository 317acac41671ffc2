//! Contracts between the driver and its compute/render collaborators.
//!
//! The driver never talks to a graphics API directly; it owns the lifecycle
//! and the per-frame ordering, and pushes work through this trait. The wgpu
//! implementation lives in [`crate::gpu`]; tests substitute a recording mock.

use glam::Vec3;

use crate::dispatch::DrawArgs;
use crate::mesh::PrimitiveMesh;
use crate::particle::ParticleRecord;

/// Uniforms for one update-kernel dispatch.
///
/// `time` arrives already damped (elapsed seconds divided by
/// [`TIME_DAMPING`](crate::dispatch::TIME_DAMPING)).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameUniforms {
    pub time: f32,
    pub phi: f32,
    pub particle_count: u32,
    pub vertices_per_instance: u32,
}

/// Material state bound for the instanced draw.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MaterialParams {
    pub mesh_scale: Vec3,
    pub particle_count: u32,
    pub vertices_per_instance: u32,
}

/// Axis-aligned box handed to the renderer as a culling hint.
///
/// Purely advisory: it bounds nothing in the simulation and never clips
/// particle positions. Backends without per-draw culling ignore it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundsHint {
    pub center: Vec3,
    pub size: Vec3,
}

/// GPU-facing half of the driver.
///
/// Implementations own their buffers and pipelines. References passed into a
/// method are valid for that call only and must not be retained. `release`
/// must be idempotent; every other method may be called only between a
/// successful `upload_particles` and `release`, which the driver guarantees.
pub trait SimulationBackend {
    /// Create the GPU-resident particle buffer and fill it with `records`.
    /// Called exactly once per driver lifecycle.
    fn upload_particles(&mut self, records: &[ParticleRecord]);

    /// Queue one update-kernel dispatch of `group_count` workgroups over the
    /// particle buffer.
    fn dispatch_update(&mut self, uniforms: FrameUniforms, group_count: u32);

    /// Overwrite the indirect args buffer for this frame.
    fn write_draw_args(&mut self, args: DrawArgs);

    /// Queue one indirect instanced draw of `mesh` consuming the particle and
    /// args buffers. Submitted after the dispatch of the same frame; the
    /// command stream orders the buffer write before the read.
    fn draw_indirect(&mut self, mesh: &PrimitiveMesh, params: MaterialParams, bounds: BoundsHint);

    /// Release all GPU resources. Safe to call repeatedly.
    fn release(&mut self);
}
