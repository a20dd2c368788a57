//! Relativistic Boris particle mover.

use crate::constants::MAGN_CONST;
use crate::errors::*;
use crate::geometry::{cell_number, cyl_rng_vol, Geometry};
use crate::grid::Grid3D;
use crate::particle::Particle;
use crate::phys::rel;
use crate::vector::Vec3;

/// Read-only view of the field slices the pusher needs from one tile.
pub struct TileFields<'a> {
    pub geometry: &'a Geometry,
    pub e: &'a Grid3D<Vec3>,
    pub h_at_et: &'a Grid3D<Vec3>,
}

impl<'a> TileFields<'a> {
    pub fn e_at(&self, r: f64, z: f64) -> Vec3 {
        self.weighted(self.e, r, z)
    }

    pub fn h_at(&self, r: f64, z: f64) -> Vec3 {
        self.weighted(self.h_at_et, r, z)
    }

    /// Four-node interpolation with cylindrical ring-volume weights,
    /// the same weighting the azimuthal deposition uses.
    fn weighted(&self, grid: &Grid3D<Vec3>, r: f64, z: f64) -> Vec3 {
        let dr = self.geometry.r_cell_size;
        let dz = self.geometry.z_cell_size;

        let i = cell_number(r, dr).max(0);
        let k = cell_number(z, dz).max(0);

        let li = i - self.geometry.bottom_r_grid_number as isize;
        let lk = k - self.geometry.left_z_grid_number as isize;

        let r1 = r - 0.5 * dr;
        let r2 = (i as f64 + 0.5) * dr;
        let r3 = r + 0.5 * dr;
        let dz1 = (k as f64 + 0.5) * dz - (z - 0.5 * dz);
        let dz2 = (z + 0.5 * dz) - (k as f64 + 0.5) * dz;

        let volume = 2. * crate::constants::PI * r * dr * dz;

        let w11 = cyl_rng_vol(dz1, r1, r2) / volume;
        let w21 = cyl_rng_vol(dz1, r2, r3) / volume;
        let w12 = cyl_rng_vol(dz2, r1, r2) / volume;
        let w22 = cyl_rng_vol(dz2, r2, r3) / volume;

        grid.get(li, lk) * w11
            + grid.get(li + 1, lk) * w21
            + grid.get(li, lk + 1) * w12
            + grid.get(li + 1, lk + 1) * w22
    }
}

/// One Boris step: half electric kick, magnetic rotation, half electric
/// kick. Positions are untouched; the coordinate advance happens in the
/// half-step phases.
pub fn push_particle(p: &mut Particle, fields: &TileFields, time_step: f64) -> Result<()> {
    if !p.alive {
        return Ok(());
    }

    let e = fields.e_at(p.r, p.z);
    let b = fields.h_at(p.r, p.z) * MAGN_CONST;

    let kick = p.charge * time_step / (2. * p.mass);

    let gamma = rel::lorentz_factor(p.velocity().length2())?;
    let u = p.velocity() * gamma;

    let u_minus = u + e * kick;
    let gamma_minus = rel::lorentz_factor_from_u(u_minus.length2());

    let t = b * (kick / gamma_minus);
    let s = t * (2. / (1. + t.length2()));

    let u_prime = u_minus + u_minus.cross(t);
    let u_plus = u_minus + u_prime.cross(s);

    let u_new = u_plus + e * kick;
    let gamma_new = rel::lorentz_factor_from_u(u_new.length2());

    p.set_velocity(u_new / gamma_new);

    Ok(())
}
