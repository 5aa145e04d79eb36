//! Conversions between wire representations and `nalgebra` types.
//!
//! Network interfaces in `comms_if` carry plain arrays so that the simulator bridge (which is not
//! written in Rust) can read them. Positions and velocities are `[x, y, z]`, quaternions are
//! `[w, x, y, z]`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Convert<O> {
    fn convert(&self) -> O;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Convert<Vector3<f64>> for [f64; 3] {
    fn convert(&self) -> Vector3<f64> {
        Vector3::new(self[0], self[1], self[2])
    }
}

impl Convert<[f64; 3]> for Vector3<f64> {
    fn convert(&self) -> [f64; 3] {
        [self[0], self[1], self[2]]
    }
}

impl Convert<UnitQuaternion<f64>> for [f64; 4] {
    /// Normalises the quaternion, a zero quaternion becomes the identity.
    fn convert(&self) -> UnitQuaternion<f64> {
        let q = Quaternion::new(self[0], self[1], self[2], self[3]);

        if q.norm() < std::f64::EPSILON {
            UnitQuaternion::identity()
        } else {
            UnitQuaternion::from_quaternion(q)
        }
    }
}

impl Convert<[f64; 4]> for UnitQuaternion<f64> {
    fn convert(&self) -> [f64; 4] {
        [self.w, self.i, self.j, self.k]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_quaternion_order() {
        let q: UnitQuaternion<f64> = [0.0, 0.0, 0.0, 1.0].convert();
        assert!((q.euler_angles().2.abs() - std::f64::consts::PI).abs() < 1e-9);

        let zero: UnitQuaternion<f64> = [0.0; 4].convert();
        assert_eq!(zero, UnitQuaternion::identity());
    }
}
