/*
 * Agent Configuration Module
 *
 * Fixed kinematic parameters an agent is constructed with, and the rectangular
 * world it lives in. Values are validated once here so the per-tick code can
 * assume sane limits.
 */

use std::f32::consts::TAU;

use nannou::prelude::*;

use crate::error::ConfigError;

// World rectangle spanning [0, width] x [0, height]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        vec2(self.width / 2.0, self.height / 2.0)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(ConfigError::InvalidBounds { width: self.width, height: self.height })
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentConfig {
    pub max_speed: f32,
    pub max_force: f32,
    pub radius: f32,
    /// Full angular width of the vision cone in radians. A neighbour is
    /// visible when it lies within half this angle of the heading.
    pub field_of_view: f32,
    pub bounds: Bounds,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_speed: 2.5,
            max_force: 0.1,
            radius: 5.0,
            field_of_view: 270.0_f32.to_radians(),
            bounds: Bounds::default(),
        }
    }
}

impl AgentConfig {
    pub fn new(max_speed: f32, max_force: f32, radius: f32, field_of_view: f32, bounds: Bounds) -> Self {
        Self { max_speed, max_force, radius, field_of_view, bounds }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(ConfigError::InvalidMaxSpeed(self.max_speed));
        }
        if !(self.max_force.is_finite() && self.max_force > 0.0) {
            return Err(ConfigError::InvalidMaxForce(self.max_force));
        }
        if !(self.radius.is_finite() && self.radius >= 0.0) {
            return Err(ConfigError::InvalidRadius(self.radius));
        }
        validate_field_of_view(self.field_of_view)?;
        self.bounds.validate()
    }
}

pub fn validate_field_of_view(field_of_view: f32) -> Result<(), ConfigError> {
    // Small tolerance so a full circle computed from degrees still passes
    if field_of_view.is_finite() && field_of_view > 0.0 && field_of_view <= TAU + 1e-4 {
        Ok(())
    } else {
        Err(ConfigError::InvalidFieldOfView(field_of_view))
    }
}
