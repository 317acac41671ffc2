//! Recording backend for headless tests.
//!
//! Stands in for the wgpu backend where no adapter is available: every call
//! is recorded verbatim so lifecycle and ordering can be asserted without a
//! GPU.

use std::cell::Cell;
use std::rc::Rc;

use crate::backend::{BoundsHint, FrameUniforms, MaterialParams, SimulationBackend};
use crate::dispatch::DrawArgs;
use crate::mesh::{PrimitiveKind, PrimitiveMesh};
use crate::particle::ParticleRecord;

/// A [`SimulationBackend`] that records instead of drawing.
#[derive(Default)]
pub struct RecordingBackend {
    pub uploaded_records: usize,
    pub first_records: Vec<ParticleRecord>,
    pub dispatches: Vec<(FrameUniforms, u32)>,
    pub args_writes: Vec<DrawArgs>,
    pub draws: Vec<(PrimitiveKind, MaterialParams, BoundsHint)>,
    pub call_order: Vec<&'static str>,
    pub releases: u32,
    release_probe: Option<Rc<Cell<u32>>>,
}

impl RecordingBackend {
    /// Mirror release counts into `probe`, observable after the backend is
    /// consumed by a driver that gets dropped.
    pub fn with_release_probe(probe: Rc<Cell<u32>>) -> Self {
        Self { release_probe: Some(probe), ..Default::default() }
    }
}

impl SimulationBackend for RecordingBackend {
    fn upload_particles(&mut self, records: &[ParticleRecord]) {
        self.uploaded_records = records.len();
        self.first_records = records.iter().take(8).copied().collect();
        self.call_order.push("upload");
    }

    fn dispatch_update(&mut self, uniforms: FrameUniforms, group_count: u32) {
        self.dispatches.push((uniforms, group_count));
        self.call_order.push("dispatch");
    }

    fn write_draw_args(&mut self, args: DrawArgs) {
        self.args_writes.push(args);
        self.call_order.push("args");
    }

    fn draw_indirect(&mut self, mesh: &PrimitiveMesh, params: MaterialParams, bounds: BoundsHint) {
        self.draws.push((mesh.kind(), params, bounds));
        self.call_order.push("draw");
    }

    fn release(&mut self) {
        self.releases += 1;
        if let Some(probe) = &self.release_probe {
            probe.set(probe.get() + 1);
        }
        self.call_order.push("release");
    }
}
