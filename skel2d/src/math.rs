//! Scalar helpers shared by the bone, constraint and timeline code.

use std::f32::consts::PI;

pub const PI2: f32 = PI * 2.0;
pub const DEG_RAD: f32 = PI / 180.0;
pub const RAD_DEG: f32 = 180.0 / PI;

#[inline]
pub fn cos_deg(degrees: f32) -> f32 {
    (degrees * DEG_RAD).cos()
}

#[inline]
pub fn sin_deg(degrees: f32) -> f32 {
    (degrees * DEG_RAD).sin()
}

#[inline]
pub fn atan2_deg(y: f32, x: f32) -> f32 {
    y.atan2(x) * RAD_DEG
}

/// Returns -1, 0 or 1. Unlike `f32::signum`, zero maps to zero.
#[inline]
pub fn signum(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Wraps an angle in degrees into [-180, 180).
#[inline]
pub fn wrap_degrees(degrees: f32) -> f32 {
    let turns = 16384 - (16384.499_999_999_996_f64 - f64::from(degrees) / 360.0) as i32;
    degrees - turns as f32 * 360.0
}

/// Wraps an angle in radians into [-PI, PI].
#[inline]
pub(crate) fn wrap_radians(mut radians: f32) -> f32 {
    if radians > PI {
        radians -= PI2;
    } else if radians < -PI {
        radians += PI2;
    }
    radians
}

#[inline]
pub(crate) fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}
