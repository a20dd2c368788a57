//! Binary Coulomb collisions: per-cell pairing of electrons and ions
//! with a pluggable scatter kernel.

pub mod sentoku;
pub mod ta77;

pub use self::sentoku::SentokuM;
pub use self::ta77::Ta77S;

use crate::errors::*;
use crate::geometry::{cell_number, cell_volume, cyl_vol, Geometry};
use crate::phys::rel;
use crate::species::Specie;
use crate::vector::Vec3;
use itertools::Itertools;
use log::debug;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;
use serde_derive::{Deserialize, Serialize};

/// Which collision operator to run after the field update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionAlgorithm {
    None,
    Ta77s,
    Sentoku,
}

impl Default for CollisionAlgorithm {
    fn default() -> CollisionAlgorithm {
        CollisionAlgorithm::None
    }
}

/// Everything a kernel needs to know about one collision partner.
#[derive(Debug, Clone, Copy)]
pub struct PairMember {
    pub velocity: Vec3,
    /// macro charge and mass, entering the kinematics
    pub charge: f64,
    pub mass: f64,
    /// rest charge and mass of one real particle, entering the Coulomb
    /// logarithm and the scattering variance
    pub rest_charge: f64,
    pub rest_mass: f64,
}

/// Per-cell plasma environment collected before pairing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellEnv {
    pub electron_density: f64,
    pub ion_density: f64,
    /// electron temperature, J
    pub electron_temperature: f64,
}

/// A binary scatter kernel. Returns `None` when one of its gates fails
/// and the pair is left untouched.
pub trait ScatterKernel {
    fn scatter(
        &self,
        a: PairMember,
        b: PairMember,
        env: &CellEnv,
        time_step: f64,
        rng: &mut Pcg64,
    ) -> Result<Option<(Vec3, Vec3)>>;
}

type CellSlot = (usize, usize); // (specie index, particle index)

/// Runs the collision pass over one tile. Particles are sorted into
/// cells, each cell's lists are shuffled, and pairs are scattered with
/// the kernel.
pub fn run_collisions<K: ScatterKernel>(
    geometry: &Geometry,
    species: &mut [Specie],
    kernel: &K,
    time_step: f64,
    rng: &mut Pcg64,
) -> Result<()> {
    let nr = geometry.r_grid_amount;
    let nz = geometry.z_grid_amount;

    let mut map_el2cell: Vec<Vec<CellSlot>> = vec![Vec::new(); nr * nz];
    let mut map_ion2cell: Vec<Vec<CellSlot>> = vec![Vec::new(); nr * nz];

    for (si, specie) in species.iter().enumerate() {
        let negative = specie.rest_charge() < 0.;
        for (pi, p) in specie.particles().iter().enumerate() {
            if !p.alive {
                continue;
            }

            let i = cell_number(p.r, geometry.r_cell_size)
                - geometry.bottom_r_grid_number as isize;
            let k = cell_number(p.z, geometry.z_cell_size)
                - geometry.left_z_grid_number as isize;
            if i < 0 || k < 0 || i >= nr as isize || k >= nz as isize {
                continue;
            }

            let cell = i as usize * nz + k as usize;
            if negative {
                map_el2cell[cell].push((si, pi));
            } else {
                map_ion2cell[cell].push((si, pi));
            }
        }
    }

    for cell in 0..nr * nz {
        map_el2cell[cell].shuffle(rng);
        map_ion2cell[cell].shuffle(rng);

        let global_i = cell / nz + geometry.bottom_r_grid_number;
        let env = cell_environment(
            geometry,
            species,
            global_i,
            &map_el2cell[cell],
            &map_ion2cell[cell],
        );

        collide_cell(
            species,
            kernel,
            &env,
            &map_el2cell[cell],
            &map_ion2cell[cell],
            time_step,
            rng,
        )?;
    }

    Ok(())
}

fn cell_environment(
    geometry: &Geometry,
    species: &[Specie],
    global_i: usize,
    electrons: &[CellSlot],
    ions: &[CellSlot],
) -> CellEnv {
    let dr = geometry.r_cell_size;
    let dz = geometry.z_cell_size;
    let volume = if global_i == 0 {
        cyl_vol(dz, dr)
    } else {
        cell_volume(global_i, dr, dz)
    };

    let mut env = CellEnv::default();

    let mut kinetic = 0.;
    let mut reals = 0.;
    for &(si, pi) in electrons {
        let rest_mass = species[si].rest_mass();
        let p = &species[si].particles()[pi];
        let weight = p.mass / rest_mass;
        env.electron_density += weight / volume;

        if let Ok(gamma) = rel::lorentz_factor(p.velocity().length2()) {
            kinetic += weight * (gamma - 1.) * rest_mass * crate::constants::LIGHT_VEL_POW_2;
            reals += weight;
        }
    }
    if reals > 0. {
        env.electron_temperature = 2. / 3. * kinetic / reals;
    }

    for &(si, pi) in ions {
        let rest_mass = species[si].rest_mass();
        let p = &species[si].particles()[pi];
        env.ion_density += p.mass / rest_mass / volume;
    }

    env
}

#[allow(clippy::too_many_arguments)]
fn collide_cell<K: ScatterKernel>(
    species: &mut [Specie],
    kernel: &K,
    env: &CellEnv,
    electrons: &[CellSlot],
    ions: &[CellSlot],
    time_step: f64,
    rng: &mut Pcg64,
) -> Result<()> {
    let n_e = electrons.len();
    let n_i = ions.len();

    let mut pair = |a: CellSlot, b: CellSlot, rng: &mut Pcg64| -> Result<()> {
        collide_pair(species, kernel, env, a, b, time_step, rng)
    };

    // like-like, even-sized lists: consecutive pairs
    if n_i % 2 == 0 {
        for (&a, &b) in ions.iter().tuples() {
            pair(a, b, rng)?;
        }
    }
    if n_e % 2 == 0 {
        for (&a, &b) in electrons.iter().tuples() {
            pair(a, b, rng)?;
        }
    }

    // like-like, odd-sized lists: triangle over the first three, the
    // rest pairs consecutively
    if n_i % 2 != 0 && n_i >= 3 {
        pair(ions[0], ions[1], rng)?;
        pair(ions[1], ions[2], rng)?;
        pair(ions[2], ions[0], rng)?;

        for (&a, &b) in ions[3..].iter().tuples() {
            pair(a, b, rng)?;
        }
    }
    if n_e % 2 != 0 && n_e >= 3 {
        pair(electrons[0], electrons[1], rng)?;
        pair(electrons[1], electrons[2], rng)?;
        pair(electrons[2], electrons[0], rng)?;

        for (&a, &b) in electrons[3..].iter().tuples() {
            pair(a, b, rng)?;
        }
    }

    // electron-ion pairing
    if n_i == n_e {
        for k in 0..n_e {
            pair(electrons[k], ions[k], rng)?;
        }
    } else if n_i > n_e && n_e > 0 {
        unequal_pairing(ions, electrons, &mut pair, rng)?;
    } else if n_e > n_i && n_i > 0 {
        unequal_pairing(electrons, ions, &mut pair, rng)?;
    }

    Ok(())
}

/// Distributes the big list over the small one: the first small-list
/// members take `c + 1` partners each, the rest take `c`.
fn unequal_pairing<F>(
    big: &[CellSlot],
    small: &[CellSlot],
    pair: &mut F,
    rng: &mut Pcg64,
) -> Result<()>
where
    F: FnMut(CellSlot, CellSlot, &mut Pcg64) -> Result<()>,
{
    let n_big = big.len();
    let n_small = small.len();

    let c = n_big / n_small;
    let c_r = n_big as f64 / n_small as f64 - c as f64;

    let big_1st_group = (((c + 1) as f64) * c_r * n_small as f64).round() as usize;
    let small_1st_group = (c_r * n_small as f64).round() as usize;
    let big_2nd_group = n_big - big_1st_group;

    for bi in 0..big_1st_group.min(n_big) {
        let si = (bi / (c + 1)).min(n_small - 1);
        pair(small[si], big[bi], rng)?;
    }
    for bi in 0..big_2nd_group {
        let si = (bi / c + small_1st_group).min(n_small - 1);
        pair(small[si], big[bi + big_1st_group], rng)?;
    }

    Ok(())
}

fn collide_pair<K: ScatterKernel>(
    species: &mut [Specie],
    kernel: &K,
    env: &CellEnv,
    a: CellSlot,
    b: CellSlot,
    time_step: f64,
    rng: &mut Pcg64,
) -> Result<()> {
    let member = |species: &[Specie], slot: CellSlot| -> PairMember {
        let specie = &species[slot.0];
        let p = &specie.particles()[slot.1];
        PairMember {
            velocity: p.velocity(),
            charge: p.charge,
            mass: p.mass,
            rest_charge: specie.rest_charge(),
            rest_mass: specie.rest_mass(),
        }
    };

    let pa = member(species, a);
    let pb = member(species, b);

    match kernel.scatter(pa, pb, env, time_step, rng) {
        Ok(Some((v_a, v_b))) => {
            species[a.0].particles_mut()[a.1].set_velocity(v_a);
            species[b.0].particles_mut()[b.1].set_velocity(v_b);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(Error(ErrorKind::NumericUnderflow, _)) => {
            debug!("collision variance underflowed, skipping pair");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use crate::species::SpecieP;
    use rand::SeedableRng;

    struct CountingKernel;

    impl ScatterKernel for CountingKernel {
        fn scatter(
            &self,
            a: PairMember,
            b: PairMember,
            _env: &CellEnv,
            _time_step: f64,
            _rng: &mut Pcg64,
        ) -> Result<Option<(Vec3, Vec3)>> {
            // count collisions through the phi component
            Ok(Some((
                a.velocity + Vec3::new(0., 1., 0.),
                b.velocity + Vec3::new(0., 1., 0.),
            )))
        }
    }

    fn geometry() -> Geometry {
        Geometry::new(1.0, 1.0, 0, 10, 0, 10, 0., 0., 0., 0., 0., [true; 4]).unwrap()
    }

    fn species_with(n_electrons: usize, n_ions: usize) -> Vec<Specie> {
        // all particles in cell (5, 5)
        let make = |n: usize, charge: f64, mass: f64, id: u32, name: &str| {
            Specie::Background(SpecieP {
                id,
                name: name.to_string(),
                charge,
                mass,
                macro_amount: n,
                left_density: 1e20,
                right_density: 1e20,
                temperature: 100.,
                particles: (0..n)
                    .map(|k| {
                        Particle::new(
                            id,
                            0.55,
                            0.55,
                            Vec3::new(1e5 + k as f64, 0., 0.),
                            charge * 1e10,
                            mass * 1e10,
                        )
                    })
                    .collect(),
            })
        };

        vec![
            make(n_electrons, -1.6e-19, 9.1e-31, 0, "electrons"),
            make(n_ions, 1.6e-19, 1.67e-27, 1, "ions"),
        ]
    }

    fn collision_count(species: &[Specie]) -> f64 {
        species
            .iter()
            .flat_map(|s| s.particles().iter())
            .map(|p| p.v_phi)
            .sum()
    }

    #[test]
    fn even_lists_pair_everyone_once_like_like() {
        let geometry = geometry();
        let mut species = species_with(4, 0);
        let mut rng = Pcg64::seed_from_u64(3);

        run_collisions(&geometry, &mut species, &CountingKernel, 1e-12, &mut rng).unwrap();

        // 2 like-like pairs touch each electron exactly once
        for p in species[0].particles() {
            assert_eq!(p.v_phi, 1.);
        }
    }

    #[test]
    fn odd_list_uses_the_triangle() {
        let geometry = geometry();
        let mut species = species_with(3, 0);
        let mut rng = Pcg64::seed_from_u64(3);

        run_collisions(&geometry, &mut species, &CountingKernel, 1e-12, &mut rng).unwrap();

        // triangle (0,1)(1,2)(2,0): every particle collides twice
        for p in species[0].particles() {
            assert_eq!(p.v_phi, 2.);
        }
    }

    #[test]
    fn equal_counts_pair_electrons_with_ions() {
        let geometry = geometry();
        let mut species = species_with(2, 2);
        let mut rng = Pcg64::seed_from_u64(3);

        run_collisions(&geometry, &mut species, &CountingKernel, 1e-12, &mut rng).unwrap();

        // one like-like pass plus one electron-ion pass each
        assert_eq!(collision_count(&species), 8.);
    }

    #[test]
    fn unequal_counts_share_the_big_list() {
        let geometry = geometry();
        let mut species = species_with(2, 6);
        let mut rng = Pcg64::seed_from_u64(3);

        run_collisions(&geometry, &mut species, &CountingKernel, 1e-12, &mut rng).unwrap();

        // every ion gets exactly one electron-ion collision
        // (6 = 2 * 3, no fractional group), plus 3 like-like ion pairs
        // and 1 like-like electron pair
        assert_eq!(collision_count(&species), 2. * (6. + 3. + 1.));
    }

    #[test]
    fn unequal_mapping_never_reuses_outside_bounds() {
        let geometry = geometry();
        // fractional ratio 7 / 3
        let mut species = species_with(3, 7);
        let mut rng = Pcg64::seed_from_u64(3);

        // must not panic on index arithmetic
        run_collisions(&geometry, &mut species, &CountingKernel, 1e-12, &mut rng).unwrap();
    }

    #[test]
    fn dead_particles_do_not_collide() {
        let geometry = geometry();
        let mut species = species_with(2, 0);
        species[0].particles_mut()[0].alive = false;
        let mut rng = Pcg64::seed_from_u64(3);

        run_collisions(&geometry, &mut species, &CountingKernel, 1e-12, &mut rng).unwrap();

        // a single electron remains: nothing to pair with
        assert_eq!(collision_count(&species), 0.);
    }
}
