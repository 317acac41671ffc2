//! Particle simulation driver: lifecycle and per-frame orchestration.
//!
//! One driver owns one GPU-resident particle buffer. The host frame loop
//! calls [`ParticleDriver::advance`] once per frame; everything else is a
//! one-shot transition: `Uninitialized --configure--> Ready --shutdown-->
//! Released`.

use thiserror::Error;

use crate::backend::{BoundsHint, FrameUniforms, MaterialParams, SimulationBackend};
use crate::config::{ConfigError, SimConfig};
use crate::dispatch::{DispatchPlan, DrawArgs, TIME_DAMPING};
use crate::mesh::PrimitiveMesh;
use crate::particle::seed_records;

#[derive(Debug, Error, PartialEq)]
pub enum DriverError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("driver is already configured")]
    AlreadyConfigured,
    #[error("driver has been shut down")]
    Released,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Ready,
    Released,
}

/// Drives one GPU particle simulation through a [`SimulationBackend`].
pub struct ParticleDriver<B: SimulationBackend> {
    backend: B,
    state: DriverState,
    config: SimConfig,
    mesh: Option<PrimitiveMesh>,
    plan: Option<DispatchPlan>,
}

impl<B: SimulationBackend> ParticleDriver<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: DriverState::Uninitialized,
            config: SimConfig::default(),
            mesh: None,
            plan: None,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// The configuration in effect. Meaningful once `configure` succeeded.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Seed and upload the particle buffer, build the template mesh and the
    /// dispatch plan.
    ///
    /// On `Ok` the driver is fully ready to step; on `Err` nothing was
    /// allocated and the driver stays in its previous state.
    pub fn configure(&mut self, config: SimConfig) -> Result<(), DriverError> {
        match self.state {
            DriverState::Uninitialized => {}
            DriverState::Ready => return Err(DriverError::AlreadyConfigured),
            DriverState::Released => return Err(DriverError::Released),
        }
        config.validate()?;

        let total = config.total_records();
        let records = seed_records(total as usize, config.seed);
        self.backend.upload_particles(&records);

        self.mesh = Some(PrimitiveMesh::new(config.primitive));
        self.plan = Some(DispatchPlan::new(total));
        self.config = config;
        self.state = DriverState::Ready;

        log::debug!(
            "configured particle driver: {} instances, {} records, {} workgroups",
            self.config.particle_count,
            total,
            self.plan.as_ref().map(|p| p.group_count).unwrap_or(0),
        );
        Ok(())
    }

    /// Step the simulation and queue this frame's draw.
    ///
    /// Submits the update dispatch, rewrites the indirect args from the live
    /// counts, then queues the indirect instanced draw. The dispatch is
    /// submitted strictly before the draw on the same command stream; that
    /// ordering, not an explicit fence, is what makes the draw observe
    /// updated positions.
    ///
    /// Outside the `Ready` state this is a no-op, matching the transient
    /// skip-a-frame treatment of missing resources.
    pub fn advance(&mut self, elapsed_secs: f32) {
        if self.state != DriverState::Ready {
            log::debug!("advance skipped: driver state is {:?}", self.state);
            return;
        }
        let (Some(mesh), Some(plan)) = (self.mesh.as_ref(), self.plan.as_ref()) else {
            return;
        };

        let vertices_per_instance = self.config.primitive.vertices_per_instance();
        self.backend.dispatch_update(
            FrameUniforms {
                time: elapsed_secs / TIME_DAMPING,
                phi: self.config.phi,
                particle_count: self.config.particle_count,
                vertices_per_instance,
            },
            plan.group_count,
        );

        self.backend
            .write_draw_args(DrawArgs::for_frame(mesh.index_count(), self.config.particle_count));

        self.backend.draw_indirect(
            mesh,
            MaterialParams {
                mesh_scale: self.config.mesh_scale,
                particle_count: self.config.particle_count,
                vertices_per_instance,
            },
            BoundsHint {
                center: self.config.bounds_center,
                size: self.config.bounds_size,
            },
        );
    }

    /// Release GPU resources. Idempotent; the driver is terminal afterwards.
    pub fn shutdown(&mut self) {
        if self.state == DriverState::Released {
            return;
        }
        self.backend.release();
        self.mesh = None;
        self.plan = None;
        self.state = DriverState::Released;
    }

    /// Access the backend, e.g. for diagnostic read-back.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: SimulationBackend> Drop for ParticleDriver<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::PrimitiveKind;
    use crate::testing::RecordingBackend;

    fn small_config(particle_count: u32, primitive: PrimitiveKind) -> SimConfig {
        SimConfig { particle_count, primitive, ..Default::default() }
    }

    #[test]
    fn configure_uploads_count_times_vertices_records() {
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        driver.configure(small_config(100, PrimitiveKind::Lines)).unwrap();

        assert_eq!(driver.state(), DriverState::Ready);
        assert_eq!(driver.backend().uploaded_records, 200);
    }

    #[test]
    fn advance_orders_dispatch_before_args_before_draw() {
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        driver.configure(small_config(4, PrimitiveKind::Points)).unwrap();
        driver.advance(0.0);

        assert_eq!(driver.backend().call_order, vec!["upload", "dispatch", "args", "draw"]);
    }

    #[test]
    fn advance_forwards_damped_time_and_phi() {
        let config = SimConfig { phi: 1.5, ..small_config(8, PrimitiveKind::Points) };
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        driver.configure(config).unwrap();
        driver.advance(10.0);

        let uniforms = driver.backend().dispatches[0].0;
        assert_eq!(uniforms.time, 2.0);
        assert_eq!(uniforms.phi, 1.5);
        assert_eq!(uniforms.particle_count, 8);
        assert_eq!(uniforms.vertices_per_instance, 1);
    }

    #[test]
    fn draw_args_track_particle_count_and_mesh() {
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        driver.configure(small_config(4, PrimitiveKind::Points)).unwrap();
        driver.advance(0.0);

        let args = driver.backend().args_writes[0];
        assert_eq!(args.instance_count, 4);
        assert_eq!(args.index_count, 1);
    }

    #[test]
    fn line_topology_dispatches_over_doubled_records() {
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        driver.configure(small_config(200, PrimitiveKind::Lines)).unwrap();
        driver.advance(1.0);

        // 400 records -> ceil(400/256) + 1 workgroups
        assert_eq!(driver.backend().dispatches[0].1, 3);
        let args = driver.backend().args_writes[0];
        assert_eq!(args.instance_count, 200);
        assert_eq!(args.index_count, 2);
    }

    #[test]
    fn configure_rejects_zero_particles_without_allocating() {
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        let err = driver.configure(small_config(0, PrimitiveKind::Points)).unwrap_err();

        assert_eq!(err, DriverError::InvalidConfig(ConfigError::ZeroParticleCount));
        assert_eq!(driver.state(), DriverState::Uninitialized);
        assert_eq!(driver.backend().uploaded_records, 0);
    }

    #[test]
    fn configure_twice_is_an_error() {
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        driver.configure(small_config(1, PrimitiveKind::Points)).unwrap();
        assert_eq!(
            driver.configure(small_config(1, PrimitiveKind::Points)),
            Err(DriverError::AlreadyConfigured)
        );
    }

    #[test]
    fn advance_before_configure_touches_nothing() {
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        driver.advance(1.0);
        assert!(driver.backend().call_order.is_empty());
    }

    #[test]
    fn shutdown_is_idempotent_and_terminal() {
        let mut driver = ParticleDriver::new(RecordingBackend::default());
        driver.configure(small_config(2, PrimitiveKind::Points)).unwrap();

        driver.shutdown();
        driver.shutdown();
        assert_eq!(driver.backend().releases, 1);
        assert_eq!(driver.state(), DriverState::Released);

        driver.advance(1.0);
        assert_eq!(driver.backend().dispatches.len(), 0);

        assert_eq!(
            driver.configure(small_config(2, PrimitiveKind::Points)),
            Err(DriverError::Released)
        );
    }

    #[test]
    fn drop_releases_the_backend_exactly_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        let probe = Rc::new(Cell::new(0));
        {
            let mut driver =
                ParticleDriver::new(RecordingBackend::with_release_probe(probe.clone()));
            driver.configure(small_config(2, PrimitiveKind::Points)).unwrap();
        }
        assert_eq!(probe.get(), 1);

        // An already shut down driver must not release again on drop.
        let probe = Rc::new(Cell::new(0));
        {
            let mut driver =
                ParticleDriver::new(RecordingBackend::with_release_probe(probe.clone()));
            driver.configure(small_config(2, PrimitiveKind::Points)).unwrap();
            driver.shutdown();
        }
        assert_eq!(probe.get(), 1);
    }
}
