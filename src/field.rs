//! FDTD solvers for the staggered E and H fields with PML absorption
//! near the walls.

use crate::geometry::Geometry;
use crate::grid::Grid3D;
use crate::vector::Vec3;
use crate::constants::{EPSILON0, MAGN_CONST};
use lerp::Lerp;

/// Electric field on one tile.
#[derive(Debug, Clone)]
pub struct FieldE {
    pub field: Grid3D<Vec3>,
}

/// Magnetic field on one tile. `field` leapfrogs at half-integer
/// timesteps; `field_at_et` carries its interpolation to the E timestep
/// for the Lorentz force.
#[derive(Debug, Clone)]
pub struct FieldH {
    pub field: Grid3D<Vec3>,
    pub field_at_et: Grid3D<Vec3>,
}

impl FieldE {
    pub fn new(geometry: &Geometry) -> FieldE {
        FieldE {
            field: Grid3D::new(geometry.r_grid_amount, geometry.z_grid_amount, Vec3::zero()),
        }
    }

    /// Advances E by one step from `curl H − j`, then damps the PML
    /// layers.
    pub fn update(
        &mut self,
        geometry: &Geometry,
        time_step: f64,
        field_h: &FieldH,
        current: &Grid3D<Vec3>,
    ) {
        let dr = geometry.r_cell_size;
        let dz = geometry.z_cell_size;
        let nr = geometry.r_grid_amount as isize;
        let nz = geometry.z_grid_amount as isize;

        for i in 0..nr {
            for k in 0..nz {
                let gi = i + geometry.bottom_r_grid_number as isize;

                let h = |ii: isize, kk: isize| field_h.field.get(ii, kk);
                let j = current.get(i, k);

                let curl_r = -(h(i, k).phi - h(i, k - 1).phi) / dz;
                let curl_phi =
                    (h(i, k).r - h(i, k - 1).r) / dz - (h(i, k).z - h(i - 1, k).z) / dr;
                let curl_z = if gi == 0 {
                    // axis cell: the loop integral around r = 0 degenerates
                    4. * h(i, k).phi / dr
                } else {
                    ((gi as f64 + 0.5) * h(i, k).phi - (gi as f64 - 0.5) * h(i - 1, k).phi)
                        / (gi as f64 * dr)
                };

                let mut e = self.field.get(i, k);
                e.r += time_step / EPSILON0 * (curl_r - j.r);
                e.phi += time_step / EPSILON0 * (curl_phi - j.phi);
                e.z += time_step / EPSILON0 * (curl_z - j.z);
                self.field.set(i, k, e);
            }
        }

        damp_pml(&mut self.field, geometry, time_step);
    }
}

impl FieldH {
    pub fn new(geometry: &Geometry) -> FieldH {
        FieldH {
            field: Grid3D::new(geometry.r_grid_amount, geometry.z_grid_amount, Vec3::zero()),
            field_at_et: Grid3D::new(
                geometry.r_grid_amount,
                geometry.z_grid_amount,
                Vec3::zero(),
            ),
        }
    }

    /// Advances H by one step from `curl E` and stores the
    /// half-step average in `field_at_et`.
    pub fn update(&mut self, geometry: &Geometry, time_step: f64, field_e: &FieldE) {
        let dr = geometry.r_cell_size;
        let dz = geometry.z_cell_size;
        let nr = geometry.r_grid_amount as isize;
        let nz = geometry.z_grid_amount as isize;

        for i in 0..nr {
            for k in 0..nz {
                let gi = i + geometry.bottom_r_grid_number as isize;

                let e = |ii: isize, kk: isize| field_e.field.get(ii, kk);

                let curl_r = (e(i, k + 1).phi - e(i, k).phi) / dz;
                let curl_phi =
                    (e(i + 1, k).z - e(i, k).z) / dr - (e(i, k + 1).r - e(i, k).r) / dz;
                let curl_z = ((gi as f64 + 1.) * e(i + 1, k).phi - gi as f64 * e(i, k).phi)
                    / ((gi as f64 + 0.5) * dr);

                let old = self.field.get(i, k);
                let new = Vec3::new(
                    old.r + time_step / MAGN_CONST * curl_r,
                    old.phi + time_step / MAGN_CONST * curl_phi,
                    old.z - time_step / MAGN_CONST * curl_z,
                );

                self.field.set(i, k, new);
                self.field_at_et.set(i, k, (old + new) * 0.5);
            }
        }

        damp_pml(&mut self.field, geometry, time_step);
        damp_pml(&mut self.field_at_et, geometry, time_step);
    }
}

/// Multiplies core values inside the PML layers by `exp(-σ dt)`, with σ
/// graded from `pml_sigma[0]` at the layer's inner boundary to
/// `pml_sigma[1]` at the wall.
fn damp_pml(field: &mut Grid3D<Vec3>, geometry: &Geometry, time_step: f64) {
    let [_, pml_z0, pml_rwall, pml_zwall] = geometry.pml_length;
    if pml_z0 <= 0. && pml_rwall <= 0. && pml_zwall <= 0. {
        return;
    }

    let dr = geometry.r_cell_size;
    let dz = geometry.z_cell_size;
    let [sigma1, sigma2] = geometry.pml_sigma;

    for i in 0..geometry.r_grid_amount as isize {
        for k in 0..geometry.z_grid_amount as isize {
            let r_local = (i as f64 + 0.5) * dr;
            let z_local = (k as f64 + 0.5) * dz;

            let mut sigma: f64 = 0.;

            if pml_z0 > 0. && z_local < pml_z0 {
                sigma = sigma.max(sigma1.lerp(sigma2, 1. - z_local / pml_z0));
            }
            if pml_zwall > 0. && z_local > geometry.z_size - pml_zwall {
                let depth = (z_local - (geometry.z_size - pml_zwall)) / pml_zwall;
                sigma = sigma.max(sigma1.lerp(sigma2, depth));
            }
            if pml_rwall > 0. && r_local > geometry.r_size - pml_rwall {
                let depth = (r_local - (geometry.r_size - pml_rwall)) / pml_rwall;
                sigma = sigma.max(sigma1.lerp(sigma2, depth));
            }

            if sigma > 0. {
                let factor = (-sigma * time_step).exp();
                let v = field.get(i, k);
                field.set(i, k, v * factor);
            }
        }
    }
}
