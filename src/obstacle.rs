/*
 * Obstacle Module
 *
 * Static circular obstacles placed once at startup.
 */

use nannou::prelude::*;

use crate::boid::Neighbor;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub position: Vec2,
    pub radius: f32,
}

impl Obstacle {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self { position, radius }
    }
}

impl Neighbor for Obstacle {
    fn position(&self) -> Vec2 {
        self.position
    }
}
