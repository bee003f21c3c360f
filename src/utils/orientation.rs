//! Azimuth/elevation helpers on top of glam's vector and quaternion types.
//!
//! Coordinates follow the ambisonic convention: `x` points to the front, `y` to the left and
//! `z` upwards. Azimuth is measured counter-clockwise from the front in the horizontal plane,
//! elevation upwards from the horizontal plane. All angles are in radians.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::EulerRot;
pub use glam::{Quat, Vec3};

// -------------------------------------------------------------------------------------------------

/// Distance in radians from the poles below which the aim's heading is taken from the rotation
/// around the vertical axis instead of the aim direction.
const POLE_TOLERANCE: f32 = 1.0e-3;

// -------------------------------------------------------------------------------------------------

/// Unit vector pointing towards the given azimuth and elevation.
pub fn direction_from_azimuth_elevation(azimuth: f32, elevation: f32) -> Vec3 {
    let (sin_azi, cos_azi) = azimuth.sin_cos();
    let (sin_ele, cos_ele) = elevation.sin_cos();
    Vec3::new(cos_ele * cos_azi, cos_ele * sin_azi, sin_ele)
}

/// Azimuth of the given direction in range `-PI..=PI`.
#[inline]
pub fn azimuth(direction: Vec3) -> f32 {
    direction.y.atan2(direction.x)
}

/// Elevation of the given direction in range `-PI/2..=PI/2`.
#[inline]
pub fn elevation(direction: Vec3) -> f32 {
    direction.z.atan2(direction.x.hypot(direction.y))
}

/// Returns a unit length copy, or the front direction for zero length vectors.
pub fn normalized_direction(direction: Vec3) -> Vec3 {
    let length = direction.length();
    if length > f32::EPSILON && length.is_finite() {
        direction / length
    } else {
        Vec3::X
    }
}

// -------------------------------------------------------------------------------------------------

/// Rotation which turns the front direction towards the given azimuth and elevation without any
/// roll: `q_z(azimuth) * q_y(-elevation)`.
pub fn from_azimuth_elevation(azimuth: f32, elevation: f32) -> Quat {
    Quat::from_rotation_z(azimuth) * Quat::from_rotation_y(-elevation)
}

/// Rotation which turns the front direction towards the given direction without any roll.
pub fn looking_at(direction: Vec3) -> Quat {
    let direction = normalized_direction(direction);
    from_azimuth_elevation(azimuth(direction), elevation(direction))
}

/// Returns a unit length copy, or the identity for degenerated quaternions.
pub fn normalized_orientation(orientation: Quat) -> Quat {
    let length = orientation.length();
    if length > f32::EPSILON && length.is_finite() {
        orientation / length
    } else {
        Quat::IDENTITY
    }
}

/// The direction the front axis gets rotated to.
#[inline]
pub fn aim_direction(orientation: Quat) -> Vec3 {
    orientation.mul_vec3(Vec3::X)
}

/// Derived azimuth and elevation of the given orientation's aim.
///
/// At the poles the aim direction has no heading, so the azimuth then is the rotation around
/// the vertical axis. This keeps an azimuth set at elevation ±90° when moving away again.
pub fn azimuth_elevation(orientation: Quat) -> (f32, f32) {
    let elevation = elevation(aim_direction(orientation));
    let azimuth = if FRAC_PI_2 - elevation.abs() > POLE_TOLERANCE {
        let (yaw, _pitch, _roll) = orientation.to_euler(EulerRot::ZYX);
        yaw
    } else {
        wrap_angle(2.0 * orientation.z.atan2(orientation.w))
    };
    (azimuth, elevation)
}

/// Wrap an angle into `-PI..=PI`.
fn wrap_angle(angle: f32) -> f32 {
    if angle > PI {
        angle - TAU
    } else if angle < -PI {
        angle + TAU
    } else {
        angle
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn azimuth_elevation_conversion() {
        for (azimuth, elevation) in [(0.0, 0.0), (90.0, 0.0), (-135.0, 30.0), (45.0, -60.0)] {
            let (azimuth, elevation) = (f32::to_radians(azimuth), f32::to_radians(elevation));
            let q = from_azimuth_elevation(azimuth, elevation);
            assert_abs_diff_eq!(q.length(), 1.0, epsilon = 1e-6);
            let (derived_azimuth, derived_elevation) = azimuth_elevation(q);
            assert_abs_diff_eq!(derived_azimuth, azimuth, epsilon = 1e-5);
            assert_abs_diff_eq!(derived_elevation, elevation, epsilon = 1e-5);
            let expected = direction_from_azimuth_elevation(azimuth, elevation);
            let direction = aim_direction(q);
            assert_abs_diff_eq!(direction.x, expected.x, epsilon = 1e-5);
            assert_abs_diff_eq!(direction.y, expected.y, epsilon = 1e-5);
            assert_abs_diff_eq!(direction.z, expected.z, epsilon = 1e-5);
        }
    }

    #[test]
    fn azimuth_survives_the_poles() {
        for elevation in [90.0, -90.0] {
            for azimuth in [0.0, 45.0, 120.0, -170.0] {
                let q = from_azimuth_elevation(
                    f32::to_radians(azimuth),
                    f32::to_radians(elevation),
                );
                let (derived_azimuth, derived_elevation) = azimuth_elevation(q);
                assert_abs_diff_eq!(derived_azimuth.to_degrees(), azimuth, epsilon = 1e-3);
                assert_abs_diff_eq!(derived_elevation.to_degrees(), elevation, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn looking_at() {
        let target = normalized_direction(Vec3::new(0.0, -1.0, 1.0));
        let direction = aim_direction(super::looking_at(target));
        assert_abs_diff_eq!(direction.dot(target), 1.0, epsilon = 1e-5);
        assert_eq!(normalized_direction(Vec3::ZERO), Vec3::X);
        assert_eq!(
            normalized_orientation(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)),
            Quat::IDENTITY
        );
    }
}
