//! Phase-ordered parallel driver over the tile grid.

use crate::collisions::{run_collisions, CollisionAlgorithm, ScatterKernel, SentokuM, Ta77S};
use crate::constants::{EL_CHARGE, EL_MASS};
use crate::domain::{Domain, DomainGrid};
use crate::errors::*;
use crate::geometry::Geometry;
use crate::migration;
use crate::output::{DataWriter, OutEngine};
use crate::settings::Settings;
use crate::species::{BeamP, Specie, SpecieP};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use rayon::prelude::*;

/// Simulation clock.
#[derive(Debug, Clone, Copy)]
pub struct TimeSim {
    pub current: f64,
    pub step: f64,
    pub end: f64,
}

/// Deterministic per-tile per-phase RNG substream seed.
pub fn substream_seed(base: u64, step: u64, phase: u64, tile: u64) -> u64 {
    splitmix64(base ^ splitmix64(step ^ splitmix64(phase ^ splitmix64(tile))))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Main data structure representing the simulation.
pub struct Simulation {
    geometry_global: Geometry,
    time: TimeSim,
    areas: DomainGrid,
    writers: Vec<DataWriter>,
    engine: Option<OutEngine>,
    collisions: CollisionAlgorithm,
    seed: u64,
    step_number: u64,
}

impl Simulation {
    /// Builds the tile grid, species and writers from the settings.
    pub fn new(settings: &Settings) -> Result<Simulation> {
        let g = &settings.geometry;

        let mut geometry_global = Geometry::new(
            g.r_size,
            g.z_size,
            0,
            g.r_grid_amount,
            0,
            g.z_grid_amount,
            g.pml_length[1],
            g.pml_length[3],
            g.pml_length[2],
            g.pml_sigma[0],
            g.pml_sigma[1],
            g.walls,
        )?;
        geometry_global.areas_by_r = g.areas_by_r;
        geometry_global.areas_by_z = g.areas_by_z;

        let time = TimeSim {
            current: settings.time.start,
            step: settings.time.step,
            end: settings.time.end,
        };

        let r_areas = g.areas_by_r;
        let z_areas = g.areas_by_z;
        let nr_tile = g.r_grid_amount / r_areas;
        let nz_tile = g.z_grid_amount / z_areas;
        let tile_r_size = g.r_size / r_areas as f64;
        let tile_z_size = g.z_size / z_areas as f64;

        let mut domains = Vec::with_capacity(r_areas * z_areas);

        for i in 0..r_areas {
            for j in 0..z_areas {
                // the axis tile always reflects; the other walls only
                // exist on the outermost tiles when configured
                let walls = [
                    i == 0,
                    i == r_areas - 1 && g.walls[1],
                    j == 0 && g.walls[2],
                    j == z_areas - 1 && g.walls[3],
                ];

                // overlap of the global PML layers with this tile
                let pml_z0 = (g.pml_length[1] - j as f64 * tile_z_size)
                    .max(0.)
                    .min(tile_z_size);
                let pml_zwall = (g.pml_length[3] - (z_areas - 1 - j) as f64 * tile_z_size)
                    .max(0.)
                    .min(tile_z_size);
                let pml_rwall = (g.pml_length[2] - (r_areas - 1 - i) as f64 * tile_r_size)
                    .max(0.)
                    .min(tile_r_size);

                let geometry = Geometry::new(
                    tile_r_size,
                    tile_z_size,
                    i * nr_tile,
                    (i + 1) * nr_tile,
                    j * nz_tile,
                    (j + 1) * nz_tile,
                    pml_z0,
                    pml_zwall,
                    pml_rwall,
                    g.pml_sigma[0],
                    g.pml_sigma[1],
                    walls,
                )?;

                let mut species = Vec::new();

                let mut p_id_counter = 0;
                for sp in &settings.particle_species {
                    species.push(Specie::Background(SpecieP {
                        id: p_id_counter,
                        name: sp.name.clone(),
                        charge: sp.charge * EL_CHARGE,
                        mass: sp.mass * EL_MASS,
                        macro_amount: sp.macro_amount / (r_areas * z_areas),
                        left_density: sp.left_density,
                        right_density: sp.right_density,
                        temperature: sp.temperature,
                        particles: Vec::new(),
                    }));
                    p_id_counter += 1;
                }

                let mut b_id_counter = 1000;
                for bm in &settings.particle_beams {
                    species.push(Specie::Beam(BeamP {
                        id: b_id_counter,
                        name: format!("beam_{}", bm.name),
                        charge: bm.charge * EL_CHARGE,
                        mass: bm.mass * EL_MASS,
                        macro_amount: bm.macro_amount,
                        start_time: bm.start_time,
                        bunch_radius: bm.bunch_radius,
                        density: bm.density,
                        bunches_amount: bm.bunches_amount,
                        bunch_length: bm.bunch_length,
                        bunches_distance: bm.bunches_distance,
                        velocity: bm.velocity,
                        particles: Vec::new(),
                    }));
                    b_id_counter += 1;
                }

                domains.push(Domain::new(geometry, species));
            }
        }

        let areas = DomainGrid::new(domains, r_areas, z_areas);

        let writers = settings
            .probes
            .iter()
            .map(DataWriter::new)
            .collect::<Result<Vec<_>>>()?;

        // a dead output backend only costs the probe data
        let engine = if writers.is_empty() {
            None
        } else {
            match OutEngine::new(settings) {
                Ok(engine) => Some(engine),
                Err(e) => {
                    warn!("output disabled: {}", e);
                    None
                }
            }
        };

        Ok(Simulation {
            geometry_global,
            time,
            areas,
            writers,
            engine,
            collisions: settings.collisions.algorithm,
            seed: settings.rng_seed,
            step_number: 0,
        })
    }

    /// Initial spatial and velocity distribution over all tiles.
    pub fn distribute(&mut self) -> Result<()> {
        info!("preparation to calculation");

        let seed = self.seed;
        let global_z_size = self.geometry_global.z_size;

        self.areas
            .domains
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(idx, domain)| {
                let mut rng = Pcg64::seed_from_u64(substream_seed(seed, 0, 99, idx as u64));
                domain.distribute(global_z_size, &mut rng)
            })
    }

    pub fn time(&self) -> &TimeSim {
        &self.time
    }

    pub fn finished(&self) -> bool {
        self.time.current >= self.time.end
    }

    pub fn step_count(&self) -> u64 {
        ((self.time.end - self.time.current) / self.time.step).ceil() as u64
    }

    /// One full tick: three parallel phases with migration and seam
    /// reduction at the barriers, the collision pass, then the writers.
    pub fn do_timestep(&mut self) -> Result<f64> {
        debug!("processing areas at time: {}", self.time.current);

        self.phase_a()?;
        migration::particles_runaway_collector(&mut self.areas, &self.geometry_global)?;
        migration::seam_reduction(&mut self.areas);

        self.phase_b()?;
        migration::particles_runaway_collector(&mut self.areas, &self.geometry_global)?;
        migration::seam_reduction(&mut self.areas);

        self.phase_c()?;

        self.collision_pass()?;

        let step = self.step_number as usize;
        if let Some(ref mut engine) = self.engine {
            for writer in &self.writers {
                if let Err(e) = writer.go(engine, &self.areas, &self.geometry_global, step) {
                    warn!("{}", e);
                }
            }
        }

        self.time.current += self.time.step;
        self.step_number += 1;

        Ok(self.time.current)
    }

    fn phase_a(&mut self) -> Result<()> {
        let time = self.time;
        let seed = self.seed;
        let step = self.step_number;

        self.areas
            .domains
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(idx, domain)| {
                let mut rng = Pcg64::seed_from_u64(substream_seed(seed, step, 0, idx as u64));

                domain.manage_beam(&time, &mut rng);
                domain.weight_field_h(&time);
                domain.reset_current();
                domain.push_particles(&time)?;
                domain.dump_particle_positions_to_old();
                domain.update_particles_coords_at_half(&time);
                domain.particles_back_position_to_rz();
                domain.reflect();

                Ok(())
            })
    }

    fn phase_b(&mut self) -> Result<()> {
        let time = self.time;

        self.areas.domains.par_iter_mut().try_for_each(|domain| {
            domain.weight_current_azimuthal()?;
            domain.update_particles_coords_at_half(&time);
            domain.particles_back_position_to_rz();
            domain.reflect();

            Ok(())
        })
    }

    fn phase_c(&mut self) -> Result<()> {
        let time = self.time;

        self.areas.domains.par_iter_mut().try_for_each(|domain| {
            domain.weight_current(&time)?;
            domain.particles_back_velocity_to_rz();
            domain.weight_field_e(&time);

            Ok(())
        })
    }

    fn collision_pass(&mut self) -> Result<()> {
        match self.collisions {
            CollisionAlgorithm::None => Ok(()),
            CollisionAlgorithm::Ta77s => self.collide_with(&Ta77S),
            CollisionAlgorithm::Sentoku => self.collide_with(&SentokuM),
        }
    }

    fn collide_with<K: ScatterKernel + Sync>(&mut self, kernel: &K) -> Result<()> {
        let time = self.time;
        let seed = self.seed;
        let step = self.step_number;

        self.areas
            .domains
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(idx, domain)| {
                let mut rng = Pcg64::seed_from_u64(substream_seed(seed, step, 3, idx as u64));

                let Domain {
                    ref geometry,
                    ref mut species,
                    ..
                } = *domain;

                run_collisions(geometry, species, kernel, time.step, &mut rng)
            })
    }
}

impl Iterator for Simulation {
    type Item = Result<f64>;

    fn next(&mut self) -> Option<Result<f64>> {
        if self.finished() {
            None
        } else {
            Some(self.do_timestep())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use crate::settings::{
        CollisionsSettings, GeometrySettings, OutputSettings, TimeSettings,
    };
    use crate::vector::Vec3;

    fn settings(areas_by_z: usize) -> Settings {
        Settings {
            geometry: GeometrySettings {
                r_size: 1.0,
                z_size: 1.0,
                r_grid_amount: 10,
                z_grid_amount: 10,
                areas_by_r: 1,
                areas_by_z,
                walls: [true, true, true, true],
                pml_length: [0.; 4],
                pml_sigma: [0.; 2],
            },
            time: TimeSettings {
                start: 0.,
                end: 1e-9,
                step: 1e-12,
            },
            particle_species: Vec::new(),
            particle_beams: Vec::new(),
            output_data: OutputSettings {
                data_root: "/tmp/picopic-driver-test".to_string(),
                compress: false,
                compress_level: 0,
                format: Default::default(),
            },
            probes: Vec::new(),
            collisions: CollisionsSettings::default(),
            rng_seed: 42,
        }
    }

    fn electron(r: f64, z: f64, v: Vec3) -> Specie {
        Specie::Background(SpecieP {
            id: 0,
            name: "electrons".to_string(),
            charge: -EL_CHARGE,
            mass: EL_MASS,
            macro_amount: 1,
            left_density: 1e17,
            right_density: 1e17,
            temperature: 1.,
            particles: vec![Particle::new(0, r, z, v, -EL_CHARGE, EL_MASS)],
        })
    }

    fn total_j_z(areas: &DomainGrid) -> f64 {
        let mut sum = 0.;
        for domain in &areas.domains {
            let nr = domain.geometry.r_grid_amount as isize;
            let nz = domain.geometry.z_grid_amount as isize;
            for i in -1..=nr {
                for k in -1..=nz {
                    sum += domain.current.grid().get(i, k).z;
                }
            }
        }
        sum
    }

    #[test]
    fn free_electron_streams_linearly() {
        let mut sim = Simulation::new(&settings(1)).unwrap();
        sim.areas.domains[0]
            .species
            .push(electron(0.45, 0.2, Vec3::new(0., 0., 1e6)));

        for _ in 0..1000 {
            sim.do_timestep().unwrap();
        }

        let p = &sim.areas.domains[0].species[0].particles()[0];
        assert!(
            (p.z - (0.2 + 1e-3)).abs() < 1e-9,
            "z drifted to {}",
            p.z
        );
        assert!((p.r - 0.45).abs() < 1e-9);

        // a purely longitudinal trajectory deposits no j_r and no j_phi
        let domain = &sim.areas.domains[0];
        for i in -1..=10 {
            for k in -1..=10 {
                assert_eq!(domain.current.grid().get(i, k).r, 0.);
                assert_eq!(domain.current.grid().get(i, k).phi, 0.);
            }
        }
    }

    #[test]
    fn crossing_electron_migrates_and_current_matches_single_tile() {
        // two tiles along z
        let mut split = Simulation::new(&settings(2)).unwrap();
        split.areas.domains[0]
            .species
            .push(electron(0.45, 0.49996, Vec3::new(0., 0., 1e8)));
        split.areas.domains[1]
            .species
            .push(Specie::Background(SpecieP {
                id: 0,
                name: "electrons".to_string(),
                charge: -EL_CHARGE,
                mass: EL_MASS,
                macro_amount: 0,
                left_density: 1e17,
                right_density: 1e17,
                temperature: 1.,
                particles: Vec::new(),
            }));

        split.do_timestep().unwrap();

        assert!(split.areas.domains[0].species[0].particles().is_empty());
        assert_eq!(split.areas.domains[1].species[0].particles().len(), 1);

        // single-tile reference of the same trajectory
        let mut whole = Simulation::new(&settings(1)).unwrap();
        whole.areas.domains[0]
            .species
            .push(electron(0.45, 0.49996, Vec3::new(0., 0., 1e8)));
        whole.do_timestep().unwrap();

        let split_sum = total_j_z(&split.areas);
        let whole_sum = total_j_z(&whole.areas);
        assert!(
            (split_sum - whole_sum).abs() <= whole_sum.abs() * 1e-9,
            "split {} vs whole {}",
            split_sum,
            whole_sum
        );
    }

    #[test]
    fn clock_advances_until_the_end() {
        let mut s = settings(1);
        // dyadic step so the clock accumulates exactly
        s.time.step = 2f64.powi(-40);
        s.time.end = 5. * 2f64.powi(-40);
        let mut sim = Simulation::new(&s).unwrap();

        let mut steps = 0;
        while !sim.finished() {
            sim.do_timestep().unwrap();
            steps += 1;
        }

        assert_eq!(steps, 5);
        assert!(sim.time().current >= sim.time().end);
    }

    #[test]
    fn substreams_differ_between_tiles_and_phases() {
        let a = substream_seed(1, 2, 0, 0);
        let b = substream_seed(1, 2, 0, 1);
        let c = substream_seed(1, 2, 3, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn identical_seeds_reproduce_trajectories() {
        let run = |seed: u64| -> Vec<(f64, f64)> {
            let mut s = settings(1);
            s.rng_seed = seed;
            s.time.end = 5e-12;
            let mut sim = Simulation::new(&s).unwrap();
            sim.areas.domains[0]
                .species
                .push(electron(0.45, 0.2, Vec3::new(1e5, 2e5, 1e6)));

            while !sim.finished() {
                sim.do_timestep().unwrap();
            }

            sim.areas.domains[0].species[0]
                .particles()
                .iter()
                .map(|p| (p.r, p.z))
                .collect()
        };

        assert_eq!(run(7), run(7));
    }
}
