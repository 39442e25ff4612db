//! Minimal rotation math for eye gaze.
//!
//! Only what the gaze state machine needs: building a rotation from pitch
//! and yaw angles, comparing rotations, and stepping one rotation towards
//! another at a bounded angular speed.

use serde::{Deserialize, Serialize};

/// Threshold above which two unit quaternions are close enough to lerp.
const SLERP_LINEAR_THRESHOLD: f32 = 0.9995;

/// A unit quaternion `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
    /// W (scalar) component.
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Build a rotation that pitches around X by `pitch_deg`, then yaws
    /// around Y by `yaw_deg` (yaw applied last, as for a head-mounted eye).
    pub fn from_pitch_yaw(pitch_deg: f32, yaw_deg: f32) -> Self {
        let half_pitch = pitch_deg.to_radians() * 0.5;
        let half_yaw = yaw_deg.to_radians() * 0.5;
        let pitch = Self {
            x: half_pitch.sin(),
            y: 0.0,
            z: 0.0,
            w: half_pitch.cos(),
        };
        let yaw = Self {
            x: 0.0,
            y: half_yaw.sin(),
            z: 0.0,
            w: half_yaw.cos(),
        };
        yaw * pitch
    }

    /// Four-component dot product.
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Return the normalized quaternion, or identity for a degenerate input.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.dot(self).sqrt();
        if len <= f32::EPSILON || !len.is_finite() {
            return Self::IDENTITY;
        }
        Self {
            x: self.x / len,
            y: self.y / len,
            z: self.z / len,
            w: self.w / len,
        }
    }

    /// Angle in degrees between two rotations.
    pub fn angle_to(self, other: Self) -> f32 {
        let d = self.dot(other).abs().min(1.0);
        (d.acos() * 2.0).to_degrees()
    }

    /// Spherical interpolation from `self` to `other` by `t` in `[0, 1]`.
    #[must_use]
    pub fn slerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut target = other;
        let mut cos_theta = self.dot(other);
        // Take the short way round.
        if cos_theta < 0.0 {
            target = Self {
                x: -other.x,
                y: -other.y,
                z: -other.z,
                w: -other.w,
            };
            cos_theta = -cos_theta;
        }

        if cos_theta > SLERP_LINEAR_THRESHOLD {
            return Self {
                x: self.x + (target.x - self.x) * t,
                y: self.y + (target.y - self.y) * t,
                z: self.z + (target.z - self.z) * t,
                w: self.w + (target.w - self.w) * t,
            }
            .normalized();
        }

        let theta = cos_theta.acos();
        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        Self {
            x: self.x * a + target.x * b,
            y: self.y * a + target.y * b,
            z: self.z * a + target.z * b,
            w: self.w * a + target.w * b,
        }
        .normalized()
    }

    /// Rotate from `self` towards `target` by at most `max_degrees`.
    ///
    /// Returns `target` exactly once it is within reach.
    #[must_use]
    pub fn rotate_towards(self, target: Self, max_degrees: f32) -> Self {
        let angle = self.angle_to(target);
        if angle <= f32::EPSILON || angle <= max_degrees {
            return target;
        }
        if max_degrees <= 0.0 {
            return self;
        }
        self.slerp(target, max_degrees / angle)
    }
}

impl std::ops::Mul for Quat {
    type Output = Self;

    /// Hamilton product `self * rhs`.
    fn mul(self, rhs: Self) -> Self {
        Self {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }
}
