//! Device-motion to gravity conversion
//!
//! Handheld devices report acceleration in screen axes. The hourglass is drawn
//! rotated so the neck sits on the diagonal, so readings are swapped into grid
//! axes and turned by -135° before they reach the engine.

use crate::config::FALLBACK_GRAVITY;
use nalgebra::{Rotation2, Vector2};
use std::f64::consts::PI;

/// Rotation applied to swapped device axes, in radians
pub const SENSOR_ROTATION: f64 = -3.0 * PI / 4.0;

/// Convert a device acceleration reading (gravity included) to a grid gravity vector.
///
/// Returns the fallback `(1, 1)` if either component is missing, so the engine
/// never sees a zero vector from an absent sensor.
pub fn gravity_from_device_motion(x: Option<f64>, y: Option<f64>) -> Vector2<f64> {
    let (Some(x), Some(y)) = (x, y) else {
        return Vector2::new(FALLBACK_GRAVITY.0, FALLBACK_GRAVITY.1);
    };

    Rotation2::new(SENSOR_ROTATION) * Vector2::new(y, x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_missing_reading_uses_fallback() {
        assert_eq!(gravity_from_device_motion(None, Some(1.0)), Vector2::new(1.0, 1.0));
        assert_eq!(gravity_from_device_motion(Some(1.0), None), Vector2::new(1.0, 1.0));
    }

    #[test]
    fn test_upright_device_points_down_the_diagonal() {
        // Upright phone: gravity reads along -y in screen axes.
        let g = gravity_from_device_motion(Some(0.0), Some(-9.81));
        let expected = 9.81 * std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(g.x, expected, epsilon = 1e-9);
        assert_relative_eq!(g.y, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_preserves_magnitude() {
        let g = gravity_from_device_motion(Some(3.0), Some(4.0));
        assert_relative_eq!(g.norm(), 5.0, epsilon = 1e-9);
    }
}
