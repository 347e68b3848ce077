/*
 * Error Module
 *
 * Steering itself never fails: degenerate geometry resolves to a zero force.
 * The only errors are configuration mistakes caught when agents, flocks or
 * the simulation are constructed.
 */

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max speed must be positive and finite, got {0}")]
    InvalidMaxSpeed(f32),
    #[error("max force must be positive and finite, got {0}")]
    InvalidMaxForce(f32),
    #[error("radius must be non-negative and finite, got {0}")]
    InvalidRadius(f32),
    #[error("field of view must lie in (0, 2π] radians, got {0}")]
    InvalidFieldOfView(f32),
    #[error("world bounds must be positive, got {width}x{height}")]
    InvalidBounds { width: f32, height: f32 },
    #[error("{name} must be non-negative and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f32 },
    #[error("leader index {index} is out of range for a flock of {len} boids")]
    LeaderOutOfRange { index: usize, len: usize },
    #[error("group {group} names rival {rival}, but only {groups} groups exist")]
    UnknownRival { group: usize, rival: usize, groups: usize },
    #[error("no group {group}; the simulation has {groups}")]
    UnknownGroup { group: usize, groups: usize },
}
