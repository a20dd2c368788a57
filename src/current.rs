//! Charge-conserving current deposition.
//!
//! The longitudinal and radial components integrate the straight-line
//! trajectory between the old and the new particle position over the
//! four surrounding nodes, splitting the trajectory at every cell
//! boundary it crosses. The azimuthal component is weighted separately
//! from the half-step position with cylindrical ring volumes.

// unit tests live in their own file
#[cfg(test)]
#[path = "./current_test.rs"]
mod current_test;

use crate::constants::{MNZL, PI};
use crate::errors::*;
use crate::geometry::{cell_number, cell_volume, cyl_rng_vol, cyl_vol, Geometry};
use crate::grid::Grid3D;
use crate::species::Specie;
use crate::vector::Vec3;

/// Per-node charge-to-current weight for longitudinal deposition.
fn weight_density_r(charge: f64, radius: f64, dr: f64, dz: f64, delta_t: f64) -> f64 {
    charge / (2. * PI * radius * dr * dz * delta_t * dr)
}

/// Per-node charge-to-current weight for radial deposition.
fn weight_density_z(charge: f64, radius: f64, dr: f64, dz: f64, delta_t: f64) -> f64 {
    charge / (2. * PI * radius * dr * dz * delta_t * dz)
}

/// Weight for the 1-D strict-motion special cases.
fn weight_density_strict(charge: f64, radius: f64, dr: f64, dz: f64, delta_t: f64) -> f64 {
    charge / (2. * PI * radius * dr * dz * delta_t)
}

/// Current grid of one tile. Node indices handed to the deposition
/// methods are global; the grid converts them to tile-local storage,
/// spilling one-cell-out deposits into the overlay halo.
#[derive(Debug, Clone)]
pub struct Current {
    current: Grid3D<Vec3>,
    bottom_r: isize,
    left_z: isize,
}

impl Current {
    pub fn new(geometry: &Geometry) -> Current {
        Current {
            current: Grid3D::new(geometry.r_grid_amount, geometry.z_grid_amount, Vec3::zero()),
            bottom_r: geometry.bottom_r_grid_number as isize,
            left_z: geometry.left_z_grid_number as isize,
        }
    }

    pub fn grid(&self) -> &Grid3D<Vec3> {
        &self.current
    }

    pub fn grid_mut(&mut self) -> &mut Grid3D<Vec3> {
        &mut self.current
    }

    pub fn reset(&mut self) {
        self.current.fill(Vec3::zero());
    }

    fn inc_r(&mut self, i: isize, k: isize, value: f64) {
        self.current
            .inc(i - self.bottom_r, k - self.left_z, Vec3::new(value, 0., 0.));
    }

    fn inc_phi(&mut self, i: isize, k: isize, value: f64) {
        self.current
            .inc(i - self.bottom_r, k - self.left_z, Vec3::new(0., value, 0.));
    }

    fn inc_z(&mut self, i: isize, k: isize, value: f64) {
        self.current
            .inc(i - self.bottom_r, k - self.left_z, Vec3::new(0., 0., value));
    }

    /// Radial and longitudinal deposition with cell-transition
    /// splitting for every alive particle.
    pub fn current_distribution(
        &mut self,
        geometry: &Geometry,
        delta_t: f64,
        species: &[Specie],
    ) -> Result<()> {
        let dr = geometry.r_cell_size;
        let dz = geometry.z_cell_size;

        for specie in species {
            for p in specie.particles() {
                if !p.alive {
                    continue;
                }

                let mut i_n = cell_number(p.r, dr);
                let mut k_n = cell_number(p.z, dz);
                let mut i_o = cell_number(p.r_old, dr);
                let mut k_o = cell_number(p.z_old, dz);

                if i_n < 0 || k_n < 0 || i_o < 0 || k_o < 0 {
                    bail!(ErrorKind::OutOfDomain(p.r, p.z));
                }

                // boundary ties resolve toward the other endpoint's cell
                if p.r_old == (i_o + 1) as f64 * dr {
                    i_o = i_n;
                }
                if p.z_old == (k_o + 1) as f64 * dz {
                    k_o = k_n;
                }
                if p.r == (i_n + 1) as f64 * dr {
                    i_n = i_o;
                }
                if p.z == (k_n + 1) as f64 * dz {
                    k_n = k_o;
                }

                let res_cell = (i_n - i_o).abs() + (k_n - k_o).abs();

                if (p.r - p.r_old).abs() < MNZL || (p.z - p.z_old).abs() < MNZL {
                    self.strict_motion_weighting(geometry, delta_t, p.r, p.z, p.r_old, p.z_old, p.charge)?;
                    continue;
                }

                match res_cell {
                    // charge in four nodes
                    0 => self.simple_current_distribution(
                        geometry, delta_t, p.r, p.z, p.r_old, p.z_old, i_n, k_n, p.charge,
                    ),
                    // single boundary crossing: split in two segments
                    1 => {
                        if i_n != i_o && k_n == k_o {
                            if p.r_old > (i_n + 1) as f64 * dr {
                                // moving inward, toward the axis
                                let a = (p.r_old - p.r) / (p.z_old - p.z);
                                let r_boundary = (i_n + 1) as f64 * dr;
                                let delta_r = r_boundary - p.r;
                                let z_boundary = p.z + delta_r / a;

                                self.simple_current_distribution(
                                    geometry, delta_t, r_boundary, z_boundary, p.r_old, p.z_old,
                                    i_n + 1, k_n, p.charge,
                                );
                                self.simple_current_distribution(
                                    geometry, delta_t, p.r, p.z, r_boundary, z_boundary, i_n, k_n,
                                    p.charge,
                                );
                            } else {
                                // moving outward, toward the wall
                                let a = (p.r - p.r_old) / (p.z - p.z_old);
                                let r_boundary = i_n as f64 * dr;
                                let delta_r = r_boundary - p.r_old;
                                let z_boundary = p.z_old + delta_r / a;

                                self.simple_current_distribution(
                                    geometry, delta_t, r_boundary, z_boundary, p.r_old, p.z_old,
                                    i_n - 1, k_n, p.charge,
                                );
                                self.simple_current_distribution(
                                    geometry, delta_t, p.r, p.z, r_boundary, z_boundary, i_n, k_n,
                                    p.charge,
                                );
                            }
                        } else if i_n == i_o && k_n != k_o {
                            if p.z_old < k_n as f64 * dz {
                                // moving forward, from cell k to k+1
                                let z_boundary = k_n as f64 * dz;
                                let delta_z = z_boundary - p.z_old;
                                let a = (p.r - p.r_old) / (p.z - p.z_old);
                                let r_boundary = p.r_old + a * delta_z;

                                self.simple_current_distribution(
                                    geometry, delta_t, r_boundary, z_boundary, p.r_old, p.z_old,
                                    i_n, k_n - 1, p.charge,
                                );
                                self.simple_current_distribution(
                                    geometry, delta_t, p.r, p.z, r_boundary, z_boundary, i_n, k_n,
                                    p.charge,
                                );
                            } else {
                                // moving backward
                                let z_boundary = (k_n + 1) as f64 * dz;
                                let delta_z = z_boundary - p.z;
                                let a = (p.r_old - p.r) / (p.z_old - p.z);
                                let r_boundary = p.r + a * delta_z;

                                self.simple_current_distribution(
                                    geometry, delta_t, r_boundary, z_boundary, p.r_old, p.z_old,
                                    i_n, k_n + 1, p.charge,
                                );
                                self.simple_current_distribution(
                                    geometry, delta_t, p.r, p.z, r_boundary, z_boundary, i_n, k_n,
                                    p.charge,
                                );
                            }
                        }
                    }
                    // both boundaries crossed: split in three segments,
                    // ordered by which boundary the trajectory hits first
                    2 => {
                        if i_o < i_n {
                            let a = (p.r - p.r_old) / (p.z - p.z_old);
                            if k_o < k_n {
                                // from [i-1][k-1] to [i][k]
                                let r1 = i_n as f64 * dr;
                                let z1 = p.z_old + (r1 - p.r_old) / a;
                                let z2 = k_n as f64 * dz;
                                let r2 = p.r_old + (z2 - p.z_old) * a;

                                if z1 < k_n as f64 * dz {
                                    self.simple_current_distribution(
                                        geometry, delta_t, r1, z1, p.r_old, p.z_old, i_n - 1,
                                        k_n - 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, r2, z2, r1, z1, i_n, k_n - 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, p.r, p.z, r2, z2, i_n, k_n, p.charge,
                                    );
                                } else if z1 > k_n as f64 * dz {
                                    self.simple_current_distribution(
                                        geometry, delta_t, r2, z2, p.r_old, p.z_old, i_n - 1,
                                        k_n - 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, r1, z1, r2, z2, i_n - 1, k_n, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, p.r, p.z, r1, z1, i_n, k_n, p.charge,
                                    );
                                }
                            } else {
                                // from [i-1][k+1] to [i][k]
                                let r1 = i_n as f64 * dr;
                                let z1 = p.z_old + (r1 - p.r_old) / a;
                                let z2 = (k_n + 1) as f64 * dz;
                                let r2 = p.r_old - (p.z_old - z2) * a;

                                if z1 > (k_n + 1) as f64 * dz {
                                    self.simple_current_distribution(
                                        geometry, delta_t, r1, z1, p.r_old, p.z_old, i_n - 1,
                                        k_n + 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, r2, z2, r1, z1, i_n, k_n + 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, p.r, p.z, r2, z2, i_n, k_n, p.charge,
                                    );
                                } else if z1 < (k_n + 1) as f64 * dz {
                                    self.simple_current_distribution(
                                        geometry, delta_t, r2, z2, p.r_old, p.z_old, i_n - 1,
                                        k_n + 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, r1, z1, r2, z2, i_n - 1, k_n, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, p.r, p.z, r1, z1, i_n, k_n, p.charge,
                                    );
                                }
                            }
                        } else if i_o > i_n {
                            if k_o < k_n {
                                // from [i+1][k-1] to [i][k]
                                let a = (p.r - p.r_old) / (p.z - p.z_old);
                                let r1 = (i_n + 1) as f64 * dr;
                                let z1 = p.z_old - (p.r_old - r1) / a;
                                let z2 = k_n as f64 * dz;
                                let r2 = p.r_old - (z2 - p.z_old) * a;

                                if z1 < k_n as f64 * dz {
                                    self.simple_current_distribution(
                                        geometry, delta_t, r1, z1, p.r_old, p.z_old, i_n + 1,
                                        k_n - 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, r2, z2, r1, z1, i_n, k_n - 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, p.r, p.z, r2, z2, i_n, k_n, p.charge,
                                    );
                                } else if z1 > k_n as f64 * dz {
                                    self.simple_current_distribution(
                                        geometry, delta_t, r2, z2, p.r_old, p.z_old, i_n + 1,
                                        k_n - 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, r1, z1, r2, z2, i_n + 1, k_n, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, p.r, p.z, r1, z1, i_n, k_n, p.charge,
                                    );
                                }
                            } else if k_o > k_n {
                                // from [i+1][k+1] to [i][k]
                                let a = (p.r_old - p.r) / (p.z_old - p.z);
                                let r1 = (i_n + 1) as f64 * dr;
                                let z1 = p.z + (r1 - p.r) / a;
                                let z2 = (k_n + 1) as f64 * dz;
                                let r2 = p.r + (z2 - p.z) * a;

                                if z1 > (k_n + 1) as f64 * dz {
                                    self.simple_current_distribution(
                                        geometry, delta_t, r1, z1, p.r_old, p.z_old, i_n + 1,
                                        k_n + 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, r2, z2, r1, z1, i_n, k_n + 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, p.r, p.z, r2, z2, i_n, k_n, p.charge,
                                    );
                                } else if z1 < (k_n + 1) as f64 * dz {
                                    self.simple_current_distribution(
                                        geometry, delta_t, r2, z2, p.r_old, p.z_old, i_n + 1,
                                        k_n + 1, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, r1, z1, r2, z2, i_n + 1, k_n, p.charge,
                                    );
                                    self.simple_current_distribution(
                                        geometry, delta_t, p.r, p.z, r1, z1, i_n, k_n, p.charge,
                                    );
                                }
                            }
                        }
                    }
                    _ => (),
                }
            }
        }

        Ok(())
    }

    /// Closed-form integrals of one straight-line segment over the four
    /// nodes of cell (i_n, k_n).
    #[allow(clippy::too_many_arguments)]
    fn simple_current_distribution(
        &mut self,
        geometry: &Geometry,
        delta_t: f64,
        radius_new: f64,
        longitude_new: f64,
        radius_old: f64,
        longitude_old: f64,
        i_n: isize,
        k_n: isize,
        p_charge: f64,
    ) {
        let dr = geometry.r_cell_size;
        let dz = geometry.z_cell_size;

        let delta_r = radius_new - radius_old;
        let delta_z = longitude_new - longitude_old;

        if delta_r.abs() < MNZL || delta_z.abs() < MNZL {
            return;
        }

        // longitudinal current, j_z: trajectory as r(z) = k z + b
        let k = delta_r / delta_z;
        let b = radius_old;

        if i_n >= 1 {
            let density = weight_density_r(p_charge, i_n as f64 * dr, dr, dz, delta_t);
            let wj = density
                * (dr * delta_z - k * delta_z * delta_z / 2. - delta_z * b
                    + dr * dr / k
                        * ((i_n as f64 + 0.5) * (i_n as f64 + 0.5) - 0.25)
                        * ((k * delta_z + b) / b).ln());
            self.inc_z(i_n, k_n, wj);

            let density = weight_density_r(p_charge, (i_n + 1) as f64 * dr, dr, dz, delta_t);
            let wj = density
                * (k * delta_z * delta_z / 2. + delta_z * b + delta_z * dr
                    + dr * dr / k
                        * (0.25 - (i_n as f64 + 0.5) * (i_n as f64 + 0.5))
                        * ((k * delta_z + b) / b).ln());
            self.inc_z(i_n + 1, k_n, wj);
        } else {
            // axis cell: the inner node weight degenerates to the axis
            // cylinder volume
            let density = p_charge / (2. * PI * dr / 4. * dr * dz * delta_t * dr);
            let wj = density * (dr * delta_z - k * delta_z * delta_z / 2. - delta_z * b);
            self.inc_z(i_n, k_n, wj);

            let density = weight_density_r(p_charge, dr, dr, dz, delta_t);
            let wj = density * (k * delta_z * delta_z / 2. + delta_z * dr + delta_z * b);
            self.inc_z(i_n + 1, k_n, wj);
        }

        // radial current, j_r: trajectory as z(r) = k r + b
        let k = -delta_z / delta_r;
        let r0 = (i_n as f64 + 0.5) * dr;
        let r1 = radius_old;
        let density = weight_density_z(p_charge, r0, dr, dz, delta_t);

        let b = (k_n as f64 + 1.) * dz - longitude_old;
        let wj = density
            * (r0 * k * delta_r
                + k / 2. * delta_r * (radius_old + delta_r / 2.)
                + 0.5 * delta_r * (b - k * (2. * r0 + r1))
                + delta_r * (b - k * r1) * (4. * r0 * r0 - dr * dr)
                    / (8. * radius_old * (radius_old + delta_r))
                + (k * (r0 * r0 / 2. - dr * dr / 8.))
                    * ((radius_old + delta_r) / radius_old).ln());
        self.inc_r(i_n, k_n, wj);

        let b = longitude_old - k_n as f64 * dz;
        let wj = density
            * (-r0 * k * delta_r - k / 2. * delta_r * (radius_old + delta_r / 2.)
                + 0.5 * delta_r * (b + k * (2. * r0 + r1))
                + delta_r * (b + k * r1) * (4. * r0 * r0 - dr * dr)
                    / (8. * radius_old * (radius_old + delta_r))
                - (k * (r0 * r0 / 2. - dr * dr / 8.))
                    * ((radius_old + delta_r) / radius_old).ln());
        self.inc_r(i_n, k_n + 1, wj);
    }

    /// 1-D deposition when the motion along one axis vanishes below
    /// MNZL; handles at most one boundary crossing along the other.
    #[allow(clippy::too_many_arguments)]
    fn strict_motion_weighting(
        &mut self,
        geometry: &Geometry,
        delta_t: f64,
        radius_new: f64,
        longitude_new: f64,
        radius_old: f64,
        longitude_old: f64,
        p_charge: f64,
    ) -> Result<()> {
        let dr = geometry.r_cell_size;
        let dz = geometry.z_cell_size;

        let i_n = cell_number(radius_new, dr);
        let k_n = cell_number(longitude_new, dz);
        let i_o = cell_number(radius_old, dr);
        let k_o = cell_number(longitude_old, dz);

        if i_n < 0 || k_n < 0 || i_o < 0 || k_o < 0 {
            bail!(ErrorKind::OutOfDomain(radius_new, longitude_new));
        }

        if (radius_new - radius_old).abs() < MNZL && (longitude_new - longitude_old).abs() < MNZL {
            return Ok(());
        }

        // strict longitudinal motion
        if (radius_new - radius_old).abs() < MNZL {
            let value_part = 2. * PI * radius_new * dr * dz;
            let r1 = radius_new - 0.5 * dr;
            let r2 = (i_n as f64 + 0.5) * dr;
            let r3 = radius_new + 0.5 * dr;

            let wj_lower = if i_n == 0 {
                p_charge / (delta_t * PI * dr * dr / 4.) * PI * (r2 * r2 - r1 * r1) / value_part
            } else {
                p_charge / (delta_t * 2. * PI * i_n as f64 * dr * dr) * PI * (r2 * r2 - r1 * r1)
                    / value_part
            };
            let wj_upper = p_charge / (delta_t * 2. * PI * (i_n + 1) as f64 * dr * dr)
                * PI
                * (r3 * r3 - r2 * r2)
                / value_part;

            match k_n - k_o {
                0 => {
                    let delta_z = longitude_new - longitude_old;
                    self.inc_z(i_n, k_n, wj_lower * delta_z);
                    self.inc_z(i_n + 1, k_n, wj_upper * delta_z);
                }
                1 => {
                    let delta_z = k_n as f64 * dz - longitude_old;
                    self.inc_z(i_n, k_n - 1, wj_lower * delta_z);
                    self.inc_z(i_n + 1, k_n - 1, wj_upper * delta_z);

                    let delta_z = longitude_new - k_n as f64 * dz;
                    self.inc_z(i_n, k_n, wj_lower * delta_z);
                    self.inc_z(i_n + 1, k_n, wj_upper * delta_z);
                }
                -1 => {
                    let delta_z = (k_n + 1) as f64 * dz - longitude_old;
                    self.inc_z(i_n, k_n + 1, wj_lower * delta_z);
                    self.inc_z(i_n + 1, k_n + 1, wj_upper * delta_z);

                    let delta_z = longitude_new - (k_n + 1) as f64 * dz;
                    self.inc_z(i_n, k_n, wj_lower * delta_z);
                    self.inc_z(i_n + 1, k_n, wj_upper * delta_z);
                }
                _ => (),
            }
        }
        // strict radial motion
        else if (longitude_new - longitude_old).abs() < MNZL {
            let left_delta_z = (k_n as f64 + 1.) * dz - longitude_new;
            let right_delta_z = longitude_new - k_n as f64 * dz;

            let radial_weight = |r0: f64, r_from: f64, delta_r: f64| -> f64 {
                weight_density_strict(p_charge, r0, dr, dz, delta_t)
                    * (delta_r - r0 * r0 / (r_from + delta_r) + r0 * r0 / r_from
                        + dr * dr / (4. * (r_from + delta_r))
                        - dr * dr / (4. * r_from))
            };

            match i_n - i_o {
                0 => {
                    let delta_r = radius_new - radius_old;
                    let wj = radial_weight((i_n as f64 + 0.5) * dr, radius_old, delta_r);
                    self.inc_r(i_n, k_n, wj * left_delta_z);
                    self.inc_r(i_n, k_n + 1, wj * right_delta_z);
                }
                1 => {
                    let boundary = i_n as f64 * dr;
                    let delta_r = boundary - radius_old;
                    let wj = radial_weight((i_n as f64 - 0.5) * dr, radius_old, delta_r);
                    self.inc_r(i_n - 1, k_n, wj * left_delta_z);
                    self.inc_r(i_n - 1, k_n + 1, wj * right_delta_z);

                    let delta_r = radius_new - boundary;
                    let wj = radial_weight((i_n as f64 + 0.5) * dr, boundary, delta_r);
                    self.inc_r(i_n, k_n, wj * left_delta_z);
                    self.inc_r(i_n, k_n + 1, wj * right_delta_z);
                }
                -1 => {
                    let boundary = (i_n + 1) as f64 * dr;
                    let delta_r = boundary - radius_old;
                    let wj = radial_weight((i_n as f64 + 1.5) * dr, radius_old, delta_r);
                    self.inc_r(i_n + 1, k_n, wj * left_delta_z);
                    self.inc_r(i_n + 1, k_n + 1, wj * right_delta_z);

                    let delta_r = radius_new - boundary;
                    let wj = radial_weight((i_n as f64 + 0.5) * dr, boundary, delta_r);
                    self.inc_r(i_n, k_n, wj * left_delta_z);
                    self.inc_r(i_n, k_n + 1, wj * right_delta_z);
                }
                _ => (),
            }
        }

        Ok(())
    }

    /// Azimuthal current from the four-node cylindrical ring weighting
    /// at the particle's half-step position.
    pub fn azimuthal_current_distribution(
        &mut self,
        geometry: &Geometry,
        species: &[Specie],
    ) -> Result<()> {
        let dr = geometry.r_cell_size;
        let dz = geometry.z_cell_size;

        for specie in species {
            for p in specie.particles() {
                if !p.alive {
                    continue;
                }

                let r_i = cell_number(p.r, dr);
                let z_k = cell_number(p.z, dz);
                if r_i < 0 || z_k < 0 {
                    bail!(ErrorKind::OutOfDomain(p.r, p.z));
                }

                let r1 = p.r - 0.5 * dr;
                let r2 = (r_i as f64 + 0.5) * dr;
                let r3 = p.r + 0.5 * dr;
                let dz1 = (z_k as f64 + 0.5) * dz - (p.z - 0.5 * dz);
                let dz2 = (p.z + 0.5 * dz) - (z_k as f64 + 0.5) * dz;

                let ro_v = p.charge / (2. * PI * dz * dr * p.r);
                let v_1 = if p.r > dr {
                    cell_volume(r_i as usize, dr, dz)
                } else {
                    cyl_vol(dz, dr)
                };
                let v_2 = cell_volume(r_i as usize + 1, dr, dz);

                self.inc_phi(r_i, z_k, ro_v * cyl_rng_vol(dz1, r1, r2) / v_1 * p.v_phi);
                self.inc_phi(r_i + 1, z_k, ro_v * cyl_rng_vol(dz1, r2, r3) / v_2 * p.v_phi);
                self.inc_phi(r_i, z_k + 1, ro_v * cyl_rng_vol(dz2, r1, r2) / v_1 * p.v_phi);
                self.inc_phi(r_i + 1, z_k + 1, ro_v * cyl_rng_vol(dz2, r2, r3) / v_2 * p.v_phi);
            }
        }

        Ok(())
    }
}
