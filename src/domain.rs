//! One sub-domain tile: geometry, fields, current and particles, with
//! the phase entry points the driver dispatches over.

use crate::current::Current;
use crate::errors::*;
use crate::field::{FieldE, FieldH};
use crate::geometry::Geometry;
use crate::pusher::{push_particle, TileFields};
use crate::simulation::TimeSim;
use crate::species::Specie;
use rand_pcg::Pcg64;

#[derive(Debug, Clone)]
pub struct Domain {
    pub geometry: Geometry,
    pub field_e: FieldE,
    pub field_h: FieldH,
    pub current: Current,
    pub species: Vec<Specie>,
}

impl Domain {
    pub fn new(geometry: Geometry, species: Vec<Specie>) -> Domain {
        Domain {
            field_e: FieldE::new(&geometry),
            field_h: FieldH::new(&geometry),
            current: Current::new(&geometry),
            geometry,
            species,
        }
    }

    /// Initial spatial and velocity distribution of all species.
    pub fn distribute(&mut self, global_z_size: f64, rng: &mut Pcg64) -> Result<()> {
        let Domain {
            ref geometry,
            ref mut species,
            ..
        } = *self;

        for specie in species.iter_mut() {
            specie.distribute(geometry, global_z_size, rng)?;
        }

        Ok(())
    }

    /// Appends the injection batch of every beam whose schedule is
    /// active.
    pub fn manage_beam(&mut self, time: &TimeSim, rng: &mut Pcg64) {
        let Domain {
            ref geometry,
            ref mut species,
            ..
        } = *self;

        for specie in species.iter_mut() {
            let batch = specie.manage_beam(geometry, time, rng);
            specie.particles_mut().extend(batch);
        }
    }

    pub fn weight_field_h(&mut self, time: &TimeSim) {
        self.field_h.update(&self.geometry, time.step, &self.field_e);
    }

    pub fn weight_field_e(&mut self, time: &TimeSim) {
        self.field_e
            .update(&self.geometry, time.step, &self.field_h, self.current.grid());
    }

    pub fn reset_current(&mut self) {
        self.current.reset();
    }

    /// Boris velocity update for every particle.
    pub fn push_particles(&mut self, time: &TimeSim) -> Result<()> {
        let Domain {
            ref geometry,
            ref field_e,
            ref field_h,
            ref mut species,
            ..
        } = *self;

        let view = TileFields {
            geometry,
            e: &field_e.field,
            h_at_et: &field_h.field_at_et,
        };

        for specie in species.iter_mut() {
            for p in specie.particles_mut().iter_mut() {
                push_particle(p, &view, time.step)?;
            }
        }

        Ok(())
    }

    pub fn dump_particle_positions_to_old(&mut self) {
        for specie in self.species.iter_mut() {
            for p in specie.particles_mut().iter_mut() {
                p.r_old = p.r;
                p.z_old = p.z;
            }
        }
    }

    /// Advances coordinates by `v dt/2` in the Cartesian intermediate
    /// frame.
    pub fn update_particles_coords_at_half(&mut self, time: &TimeSim) {
        let half = time.step / 2.;

        for specie in self.species.iter_mut() {
            for p in specie.particles_mut().iter_mut() {
                if !p.alive {
                    continue;
                }
                p.r += p.v_r * half;
                p.phi += p.v_phi * half;
                p.z += p.v_z * half;
            }
        }
    }

    /// Projects the Cartesian intermediate back onto the (r, z) plane,
    /// accumulating the rotation angle for the velocity basis.
    pub fn particles_back_position_to_rz(&mut self) {
        for specie in self.species.iter_mut() {
            for p in specie.particles_mut().iter_mut() {
                if !p.alive {
                    continue;
                }

                let r_new = (p.r * p.r + p.phi * p.phi).sqrt();
                let sin_step = if r_new > 0. { p.phi / r_new } else { 0. };

                // compose with the rotation of the previous half-step
                let cos_step = (1. - sin_step * sin_step).sqrt();
                let cos_acc = (1. - p.sin_theta_r * p.sin_theta_r).sqrt();
                p.sin_theta_r = p.sin_theta_r * cos_step + cos_acc * sin_step;

                p.r = r_new;
                p.phi = 0.;
            }
        }
    }

    /// Rotates the 3-velocity back into the (r, phi, z) basis of the
    /// projected position.
    pub fn particles_back_velocity_to_rz(&mut self) {
        for specie in self.species.iter_mut() {
            for p in specie.particles_mut().iter_mut() {
                if !p.alive {
                    continue;
                }

                let sin = p.sin_theta_r;
                let cos = (1. - sin * sin).sqrt();

                let v_r = cos * p.v_r + sin * p.v_phi;
                let v_phi = -sin * p.v_r + cos * p.v_phi;
                p.v_r = v_r;
                p.v_phi = v_phi;
                p.sin_theta_r = 0.;
            }
        }
    }

    /// Reflects particles at the walls this tile owns.
    pub fn reflect(&mut self) {
        let Domain {
            ref geometry,
            ref mut species,
            ..
        } = *self;

        let r_max = geometry.top_r_grid_number as f64 * geometry.r_cell_size;
        let z_max = geometry.right_z_grid_number as f64 * geometry.z_cell_size;

        for specie in species.iter_mut() {
            for p in specie.particles_mut().iter_mut() {
                if !p.alive {
                    continue;
                }

                if geometry.walls[0] && p.r < 0. {
                    p.r = -p.r;
                    p.v_r = -p.v_r;
                }
                if geometry.walls[1] && p.r > r_max {
                    p.r = 2. * r_max - p.r;
                    p.v_r = -p.v_r;
                }
                if geometry.walls[2] && p.z < 0. {
                    p.z = -p.z;
                    p.v_z = -p.v_z;
                }
                if geometry.walls[3] && p.z > z_max {
                    p.z = 2. * z_max - p.z;
                    p.v_z = -p.v_z;
                }
            }
        }
    }

    pub fn weight_current_azimuthal(&mut self) -> Result<()> {
        let Domain {
            ref geometry,
            ref mut current,
            ref species,
            ..
        } = *self;

        current.azimuthal_current_distribution(geometry, species)
    }

    pub fn weight_current(&mut self, time: &TimeSim) -> Result<()> {
        let Domain {
            ref geometry,
            ref mut current,
            ref species,
            ..
        } = *self;

        current.current_distribution(geometry, time.step, species)
    }
}

/// The tile grid, row-major over (i, j) = (r, z) tile indices.
#[derive(Debug)]
pub struct DomainGrid {
    pub domains: Vec<Domain>,
    pub areas_by_r: usize,
    pub areas_by_z: usize,
}

impl DomainGrid {
    pub fn new(domains: Vec<Domain>, areas_by_r: usize, areas_by_z: usize) -> DomainGrid {
        assert_eq!(domains.len(), areas_by_r * areas_by_z);
        DomainGrid {
            domains,
            areas_by_r,
            areas_by_z,
        }
    }

    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.areas_by_z + j
    }

    pub fn get(&self, i: usize, j: usize) -> &Domain {
        &self.domains[self.index(i, j)]
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut Domain {
        let idx = self.index(i, j);
        &mut self.domains[idx]
    }

    /// Simultaneous access to a source tile and a later destination
    /// tile (row-major order), as seam reduction needs.
    pub fn source_and_destination(
        &mut self,
        src: usize,
        dst: usize,
    ) -> (&Domain, &mut Domain) {
        assert!(src < dst);
        let (head, tail) = self.domains.split_at_mut(src + 1);
        (&head[src], &mut tail[dst - src - 1])
    }
}
