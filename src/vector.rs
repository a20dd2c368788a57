//! A plain 3-vector in the local (r, phi, z) basis.

use derive_more::{Add, AddAssign, Neg, Sub, SubAssign};
use serde_derive::{Deserialize, Serialize};
use std::ops::{Div, DivAssign, Mul, MulAssign};

#[derive(
    Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize, Add, Sub, AddAssign, SubAssign,
    Neg,
)]
pub struct Vec3 {
    pub r: f64,
    pub phi: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(r: f64, phi: f64, z: f64) -> Vec3 {
        Vec3 { r, phi, z }
    }

    pub fn zero() -> Vec3 {
        Vec3::default()
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.r * other.r + self.phi * other.phi + self.z * other.z
    }

    /// Cross product, treating (r, phi, z) as a right-handed orthonormal
    /// basis at the particle position.
    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            r: self.phi * other.z - self.z * other.phi,
            phi: self.z * other.r - self.r * other.z,
            z: self.r * other.phi - self.phi * other.r,
        }
    }

    pub fn length2(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length2().sqrt()
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.r * rhs, self.phi * rhs, self.z * rhs)
    }
}

impl MulAssign<f64> for Vec3 {
    fn mul_assign(&mut self, rhs: f64) {
        self.r *= rhs;
        self.phi *= rhs;
        self.z *= rhs;
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;

    fn div(self, rhs: f64) -> Vec3 {
        Vec3::new(self.r / rhs, self.phi / rhs, self.z / rhs)
    }
}

impl DivAssign<f64> for Vec3 {
    fn div_assign(&mut self, rhs: f64) {
        self.r /= rhs;
        self.phi /= rhs;
        self.z /= rhs;
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Vec3 {
        Vec3::new(v[0], v[1], v[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Vec3::new(1., 2., 3.);
        let b = Vec3::new(-1., 0.5, 2.);

        assert_eq!(a + b, Vec3::new(0., 2.5, 5.));
        assert_eq!(a - b, Vec3::new(2., 1.5, 1.));
        assert_eq!(a * 2., Vec3::new(2., 4., 6.));
        assert_eq!(a / 2., Vec3::new(0.5, 1., 1.5));
        assert_eq!(a.dot(b), 6.);
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        let er = Vec3::new(1., 0., 0.);
        let ephi = Vec3::new(0., 1., 0.);
        let ez = Vec3::new(0., 0., 1.);

        assert_eq!(er.cross(ephi), ez);
        assert_eq!(ephi.cross(ez), er);
        assert_eq!(ez.cross(er), ephi);
    }
}
