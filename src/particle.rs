//! GPU particle record layout and initial seeding.
//!
//! The record layout is shared with the compute kernel: any change here must
//! be mirrored in `gpu/particle_update.wgsl`, and the backend checks the
//! stride at construction so a mismatch fails fast instead of corrupting the
//! buffer silently.

use bytemuck::{Pod, Zeroable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One simulated particle, tightly packed to 40 bytes.
///
/// `base_position`, `albedo` and `rotation_speed` are written once at seeding
/// time and never touched again from the host; `position` is owned by the
/// update kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleRecord {
    pub base_position: [f32; 3],
    pub position: [f32; 3],
    pub albedo: [f32; 3],
    pub rotation_speed: f32,
}

/// Host-side stride of one record. Must equal the stride the update kernel
/// declares for its storage array.
pub const RECORD_STRIDE_BYTES: u64 = std::mem::size_of::<ParticleRecord>() as u64;

/// Component range for `base_position` at seeding time.
pub const BASE_POSITION_RANGE: std::ops::RangeInclusive<f32> = -10.0..=10.0;
/// Component range for `albedo` at seeding time.
pub const ALBEDO_RANGE: std::ops::RangeInclusive<f32> = 0.0..=1.0;
/// Range for `rotation_speed` at seeding time.
pub const ROTATION_SPEED_RANGE: std::ops::RangeInclusive<f32> = 1.0..=100.0;

/// Seed `count` records with uniformly random state.
///
/// A fixed seed yields an identical buffer on every run.
pub fn seed_records(count: usize, seed: u64) -> Vec<ParticleRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut component = move |range: std::ops::RangeInclusive<f32>| rng.gen_range(range);

    (0..count)
        .map(|_| ParticleRecord {
            base_position: [
                component(BASE_POSITION_RANGE),
                component(BASE_POSITION_RANGE),
                component(BASE_POSITION_RANGE),
            ],
            position: [0.0; 3],
            albedo: [
                component(ALBEDO_RANGE),
                component(ALBEDO_RANGE),
                component(ALBEDO_RANGE),
            ],
            rotation_speed: component(ROTATION_SPEED_RANGE),
        })
        .collect()
}
