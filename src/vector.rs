/*
 * Vector Module
 *
 * Small extensions over the `Vec2` value type used throughout the simulation.
 * Every operation that would divide by a length is guarded: a zero-length
 * vector normalizes to the zero vector (or to an explicit fallback supplied
 * by the caller), never to NaN.
 */

use nannou::prelude::*;

// Lengths at or below this are treated as zero
pub const EPSILON: f32 = 1e-6;

// Heading used when an agent has no velocity to derive one from
pub const DEFAULT_HEADING: Vec2 = Vec2::X;

pub trait VectorExt: Sized {
    /// Unit vector in the same direction, or `fallback` when the length is zero.
    fn unit_or(self, fallback: Self) -> Self;

    /// Unit vector in the same direction, or the zero vector.
    fn unit_or_zero(self) -> Self;

    /// Rescales to `length`. The zero vector stays zero.
    fn with_length(self, length: f32) -> Self;

    /// Returns the vector unchanged if its length is at most `max`, otherwise
    /// the same direction scaled down to `max`.
    fn limit(self, max: f32) -> Self;

    fn rotated(self, angle: f32) -> Self;

    // Angle of the vector measured from +x, in radians
    fn heading(self) -> f32;

    /// Unsigned angle between two directions in `[0, π]`. Zero when either
    /// vector has no length.
    fn angle_to(self, other: Self) -> f32;

    fn is_degenerate(self) -> bool;
}

impl VectorExt for Vec2 {
    fn unit_or(self, fallback: Vec2) -> Vec2 {
        let len = self.length();
        if len > EPSILON {
            self / len
        } else {
            fallback
        }
    }

    fn unit_or_zero(self) -> Vec2 {
        self.unit_or(Vec2::ZERO)
    }

    fn with_length(self, length: f32) -> Vec2 {
        self.unit_or_zero() * length
    }

    fn limit(self, max: f32) -> Vec2 {
        // Squared comparison avoids the sqrt for vectors already in range
        let len_sq = self.length_squared();
        if len_sq > max * max && len_sq > EPSILON * EPSILON {
            self * (max / len_sq.sqrt())
        } else {
            self
        }
    }

    fn rotated(self, angle: f32) -> Vec2 {
        let (sin, cos) = angle.sin_cos();
        vec2(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    fn heading(self) -> f32 {
        self.y.atan2(self.x)
    }

    fn angle_to(self, other: Vec2) -> f32 {
        if self.is_degenerate() || other.is_degenerate() {
            return 0.0;
        }
        // Float overshoot can push the dot product just past ±1
        let dot = self.unit_or_zero().dot(other.unit_or_zero()).clamp(-1.0, 1.0);
        dot.acos()
    }

    fn is_degenerate(self) -> bool {
        self.length_squared() <= EPSILON * EPSILON
    }
}

// Unit vector pointing along `angle`
pub fn unit_from_angle(angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    vec2(cos, sin)
}

pub fn distance_to(a: Vec2, b: Vec2) -> f32 {
    (a - b).length()
}
