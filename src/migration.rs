//! Particle migration between tiles and seam reduction of the overlay
//! strips. Both passes run serially between the parallel phases.

use crate::domain::{Domain, DomainGrid};
use crate::errors::*;
use crate::geometry::{cell_number, Geometry};
use crate::particle::Particle;
use log::{debug, error};

/// Collects particles that ran away from their tiles and moves them to
/// the tile owning their actual position. Particles that left the
/// simulation area are erased. Returns `(jumped, removed)`.
pub fn particles_runaway_collector(
    areas: &mut DomainGrid,
    geometry_global: &Geometry,
) -> Result<(usize, usize)> {
    let r_areas = areas.areas_by_r;
    let z_areas = areas.areas_by_z;

    let mut j_c = 0;
    let mut r_c = 0;

    // (destination tile index, specie id, particle)
    let mut jumpers: Vec<(usize, u32, Particle)> = Vec::new();

    for i in 0..r_areas {
        for j in 0..z_areas {
            let sim_area = areas.get_mut(i, j);
            let nr_tile = sim_area.geometry.r_grid_amount;
            let nz_tile = sim_area.geometry.z_grid_amount;
            let dr = sim_area.geometry.r_cell_size;
            let dz = sim_area.geometry.z_cell_size;

            for specie in sim_area.species.iter_mut() {
                let id = specie.id();

                specie.particles_mut().retain(|p| {
                    if !p.alive {
                        return true;
                    }

                    let r_cell = cell_number(p.r, dr);
                    let z_cell = cell_number(p.z, dz);

                    if r_cell < 0 || z_cell < 0 {
                        error!(
                            "particle position is less than 0. Position is: [{}, {}]",
                            p.r, p.z
                        );
                    }

                    // remove out-of-simulation particles
                    if r_cell < 0
                        || z_cell < 0
                        || r_cell >= geometry_global.r_grid_amount as isize
                        || z_cell >= geometry_global.z_grid_amount as isize
                    {
                        r_c += 1;
                        return false;
                    }

                    // move particles between tiles
                    let i_dst = r_cell as usize / nr_tile;
                    let j_dst = z_cell as usize / nz_tile;

                    if i_dst != i || j_dst != j {
                        j_c += 1;
                        jumpers.push((i_dst * z_areas + j_dst, id, *p));
                        return false;
                    }

                    true
                });
            }
        }
    }

    for (dst, id, p) in jumpers {
        for specie in areas.domains[dst].species.iter_mut() {
            if specie.id() == id {
                specie.particles_mut().push(p);
            }
        }
    }

    debug!(
        "amount of particles to jump between areas: {}, amount of particles to remove: {}",
        j_c, r_c
    );

    Ok((j_c, r_c))
}

/// Sums the overlay strips of every tile into the adjacent tile's core:
/// right edge, then top edge, then the diagonal corner, for current,
/// E, H and H-at-E-timestep.
pub fn seam_reduction(areas: &mut DomainGrid) {
    let r_areas = areas.areas_by_r;
    let z_areas = areas.areas_by_z;

    for i in 0..r_areas {
        for j in 0..z_areas {
            let src = areas.index(i, j);

            if i < r_areas - 1 {
                let dst = areas.index(i + 1, j);
                let (source, destination) = areas.source_and_destination(src, dst);
                let nr = source.geometry.r_grid_amount as isize;
                for v in 0..source.geometry.z_grid_amount as isize {
                    add_node(source, destination, (nr, v), (0, v));
                }
            }

            if j < z_areas - 1 {
                let dst = areas.index(i, j + 1);
                let (source, destination) = areas.source_and_destination(src, dst);
                let nz = source.geometry.z_grid_amount as isize;
                for v in 0..source.geometry.r_grid_amount as isize {
                    add_node(source, destination, (v, nz), (v, 0));
                }
            }

            if i < r_areas - 1 && j < z_areas - 1 {
                let dst = areas.index(i + 1, j + 1);
                let (source, destination) = areas.source_and_destination(src, dst);
                let nr = source.geometry.r_grid_amount as isize;
                let nz = source.geometry.z_grid_amount as isize;
                add_node(source, destination, (nr, nz), (0, 0));
            }
        }
    }
}

fn add_node(src: &Domain, dst: &mut Domain, from: (isize, isize), to: (isize, isize)) {
    let j = src.current.grid().get(from.0, from.1);
    dst.current.grid_mut().inc(to.0, to.1, j);

    let e = src.field_e.field.get(from.0, from.1);
    dst.field_e.field.inc(to.0, to.1, e);

    let h = src.field_h.field.get(from.0, from.1);
    dst.field_h.field.inc(to.0, to.1, h);

    let h_at_et = src.field_h.field_at_et.get(from.0, from.1);
    dst.field_h.field_at_et.inc(to.0, to.1, h_at_et);
}
