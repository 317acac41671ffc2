//! Immutable driver configuration.
//!
//! The host hands a [`SimConfig`] to [`configure`](crate::driver::ParticleDriver::configure)
//! once; nothing is resized or re-tuned afterwards.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::PrimitiveKind;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("particle_count must be at least 1")]
    ZeroParticleCount,
    #[error("phi {0} outside [-pi, pi]")]
    PhiOutOfRange(f32),
}

/// Configuration snapshot for one driver instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Number of instances to simulate and draw.
    pub particle_count: u32,
    /// Point or line topology; decides how many records back one instance.
    pub primitive: PrimitiveKind,
    /// Phase offset in [-pi, pi], forwarded verbatim to the update kernel.
    pub phi: f32,
    /// Per-instance scale applied by the draw shader.
    pub mesh_scale: Vec3,
    /// Center of the culling-hint box handed to the render backend.
    pub bounds_center: Vec3,
    /// Extent of the culling-hint box. Never clips simulated positions.
    pub bounds_size: Vec3,
    /// Seed for the initial particle state.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            particle_count: 500_000,
            primitive: PrimitiveKind::Points,
            phi: PI,
            mesh_scale: Vec3::ONE,
            bounds_center: Vec3::ZERO,
            bounds_size: Vec3::splat(300.0),
            seed: 0,
        }
    }
}

impl SimConfig {
    /// Total records backing the particle buffer.
    pub fn total_records(&self) -> u32 {
        self.particle_count * self.primitive.vertices_per_instance()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::ZeroParticleCount);
        }
        if !(-PI..=PI).contains(&self.phi) {
            return Err(ConfigError::PhiOutOfRange(self.phi));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_particle_count_is_rejected() {
        let config = SimConfig { particle_count: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroParticleCount));
    }

    #[test]
    fn phi_outside_pi_is_rejected() {
        let config = SimConfig { phi: 4.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::PhiOutOfRange(_))));
    }

    #[test]
    fn lines_double_the_record_count() {
        let config = SimConfig {
            particle_count: 10,
            primitive: PrimitiveKind::Lines,
            ..Default::default()
        };
        assert_eq!(config.total_records(), 20);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "particle_count": 4, "primitive": "lines" }"#).unwrap();
        assert_eq!(config.particle_count, 4);
        assert_eq!(config.primitive, PrimitiveKind::Lines);
        assert_eq!(config.mesh_scale, Vec3::ONE);
        assert_eq!(config.bounds_size, Vec3::splat(300.0));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SimConfig { particle_count: 123, seed: 9, ..Default::default() };
        let json = serde_json::to_string(&config).unwrap();
        let back: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.particle_count, 123);
        assert_eq!(back.seed, 9);
    }
}
