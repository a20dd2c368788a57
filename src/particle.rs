//! Macro-particle record.

use crate::vector::Vec3;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// One macro-particle.
///
/// Positions are global (r, z) coordinates. `phi` is the transverse
/// Cartesian intermediate used between the half-step coordinate update
/// and the projection back to the (r, z) plane; outside that window it
/// is zero. `sin_theta_r` accumulates the rotation angle of the
/// projection so the velocity basis can be rotated back once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub id: u32,

    pub r: f64,
    pub phi: f64,
    pub z: f64,

    pub r_old: f64,
    pub z_old: f64,

    pub v_r: f64,
    pub v_phi: f64,
    pub v_z: f64,

    pub charge: f64,
    pub mass: f64,

    pub sin_theta_r: f64,

    pub alive: bool,
}

impl Particle {
    pub fn new(id: u32, r: f64, z: f64, velocity: Vec3, charge: f64, mass: f64) -> Particle {
        Particle {
            id,
            r,
            phi: 0.,
            z,
            r_old: r,
            z_old: z,
            v_r: velocity.r,
            v_phi: velocity.phi,
            v_z: velocity.z,
            charge,
            mass,
            sin_theta_r: 0.,
            alive: true,
        }
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.v_r, self.v_phi, self.v_z)
    }

    pub fn set_velocity(&mut self, v: Vec3) {
        self.v_r = v.r;
        self.v_phi = v.phi;
        self.v_z = v.z;
    }
}

/// Serialize the particle as a continuous array instead of a struct:
/// `[r, z, v_r, v_phi, v_z, charge, mass]`.
impl Serialize for Particle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(7))?;
        seq.serialize_element(&self.r)?;
        seq.serialize_element(&self.z)?;
        seq.serialize_element(&self.v_r)?;
        seq.serialize_element(&self.v_phi)?;
        seq.serialize_element(&self.v_z)?;
        seq.serialize_element(&self.charge)?;
        seq.serialize_element(&self.mass)?;
        seq.end()
    }
}
