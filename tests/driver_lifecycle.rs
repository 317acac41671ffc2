//! End-to-end lifecycle checks against the recording backend.
//!
//! Run with: cargo test --test driver_lifecycle

use particle_driver::testing::RecordingBackend;
use particle_driver::{
    DriverState, ParticleDriver, PrimitiveKind, SimConfig, THREAD_BLOCK_SIZE,
};

fn config(particle_count: u32, primitive: PrimitiveKind) -> SimConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    SimConfig { particle_count, primitive, ..Default::default() }
}

#[test]
fn four_point_particles_end_to_end() {
    let mut driver = ParticleDriver::new(RecordingBackend::default());
    driver.configure(config(4, PrimitiveKind::Points)).unwrap();
    assert_eq!(driver.backend().uploaded_records, 4);

    driver.advance(0.0);

    let backend = driver.backend();
    let args = backend.args_writes[0];
    assert_eq!(args.instance_count, 4);
    assert_eq!(args.index_count, 1);

    let (uniforms, groups) = backend.dispatches[0];
    assert_eq!(uniforms.time, 0.0);
    assert_eq!(groups, 4u32.div_ceil(THREAD_BLOCK_SIZE) + 1);

    let (kind, params, bounds) = backend.draws[0];
    assert_eq!(kind, PrimitiveKind::Points);
    assert_eq!(params.particle_count, 4);
    assert_eq!(bounds.size, glam::Vec3::splat(300.0));
}

#[test]
fn instance_count_tracks_particle_count_across_frames() {
    let mut driver = ParticleDriver::new(RecordingBackend::default());
    driver.configure(config(1_000, PrimitiveKind::Lines)).unwrap();

    for frame in 0..5 {
        driver.advance(frame as f32 / 60.0);
    }

    for args in &driver.backend().args_writes {
        assert_eq!(args.instance_count, 1_000);
        assert_eq!(args.index_count, 2);
    }
    assert_eq!(driver.backend().dispatches.len(), 5);
}

#[test]
fn seeded_upload_is_within_declared_ranges() {
    let mut driver = ParticleDriver::new(RecordingBackend::default());
    driver.configure(config(8, PrimitiveKind::Points)).unwrap();

    for record in &driver.backend().first_records {
        for c in record.base_position {
            assert!((-10.0..=10.0).contains(&c));
        }
        for c in record.albedo {
            assert!((0.0..=1.0).contains(&c));
        }
        assert!((1.0..=100.0).contains(&record.rotation_speed));
    }
}

#[test]
fn full_lifecycle_shutdown_then_advance_is_inert() {
    let mut driver = ParticleDriver::new(RecordingBackend::default());
    driver.configure(config(16, PrimitiveKind::Points)).unwrap();
    driver.advance(1.0);

    driver.shutdown();
    driver.shutdown();
    assert_eq!(driver.state(), DriverState::Released);
    assert_eq!(driver.backend().releases, 1);

    let calls_after_shutdown = driver.backend().call_order.len();
    driver.advance(2.0);
    driver.advance(3.0);
    assert_eq!(driver.backend().call_order.len(), calls_after_shutdown);
}
