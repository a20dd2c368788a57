//! Particle species: thermal background plasma and injected beams.

use crate::errors::*;
use crate::geometry::{cyl_rng_vol, Geometry};
use crate::particle::Particle;
use crate::phys::thermal;
use crate::simulation::TimeSim;
use crate::vector::Vec3;
use lerp::Lerp;
use rand::Rng;
use rand_pcg::Pcg64;

/// Background plasma specie with a linear density profile along z and a
/// Maxwell–Jüttner velocity distribution.
#[derive(Debug, Clone)]
pub struct SpecieP {
    pub id: u32,
    pub name: String,
    /// rest charge of one real particle, signed, C
    pub charge: f64,
    /// rest mass of one real particle, kg
    pub mass: f64,
    /// macro-particles for this tile
    pub macro_amount: usize,
    pub left_density: f64,
    pub right_density: f64,
    /// temperature, eV
    pub temperature: f64,
    pub particles: Vec<Particle>,
}

/// Beam specie with a time-gated injection schedule.
#[derive(Debug, Clone)]
pub struct BeamP {
    pub id: u32,
    pub name: String,
    pub charge: f64,
    pub mass: f64,
    /// macro-particles per bunch train (whole beam)
    pub macro_amount: usize,
    pub start_time: f64,
    pub bunch_radius: f64,
    pub density: f64,
    pub bunches_amount: usize,
    pub bunch_length: f64,
    pub bunches_distance: f64,
    pub velocity: f64,
    pub particles: Vec<Particle>,
}

/// A species bound to one tile is either a background plasma specie or
/// a beam.
#[derive(Debug, Clone)]
pub enum Specie {
    Background(SpecieP),
    Beam(BeamP),
}

impl Specie {
    pub fn id(&self) -> u32 {
        match self {
            Specie::Background(s) => s.id,
            Specie::Beam(b) => b.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Specie::Background(s) => &s.name,
            Specie::Beam(b) => &b.name,
        }
    }

    pub fn rest_charge(&self) -> f64 {
        match self {
            Specie::Background(s) => s.charge,
            Specie::Beam(b) => b.charge,
        }
    }

    pub fn rest_mass(&self) -> f64 {
        match self {
            Specie::Background(s) => s.mass,
            Specie::Beam(b) => b.mass,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        match self {
            Specie::Background(s) => &s.particles,
            Specie::Beam(b) => &b.particles,
        }
    }

    pub fn particles_mut(&mut self) -> &mut Vec<Particle> {
        match self {
            Specie::Background(s) => &mut s.particles,
            Specie::Beam(b) => &mut b.particles,
        }
    }

    /// Initial spatial and velocity distribution. Beams start empty and
    /// are filled by their injection schedule.
    pub fn distribute(
        &mut self,
        geometry: &Geometry,
        global_z_size: f64,
        rng: &mut Pcg64,
    ) -> Result<()> {
        match self {
            Specie::Background(s) => s.distribute(geometry, global_z_size, rng),
            Specie::Beam(_) => Ok(()),
        }
    }

    /// Returns the injection batch for this tick; empty for background
    /// species and outside the beam schedule.
    pub fn manage_beam(
        &mut self,
        geometry: &Geometry,
        time: &TimeSim,
        rng: &mut Pcg64,
    ) -> Vec<Particle> {
        match self {
            Specie::Background(_) => Vec::new(),
            Specie::Beam(b) => b.injection_batch(geometry, time, rng),
        }
    }
}

impl SpecieP {
    fn distribute(&mut self, geometry: &Geometry, global_z_size: f64, rng: &mut Pcg64) -> Result<()> {
        let r_bot = geometry.bottom_r();
        let r_top = r_bot + geometry.r_size;
        let z_left = geometry.left_z();
        let z_right = z_left + geometry.z_size;

        let left_density = self.left_density;
        let right_density = self.right_density;
        let density_at = move |z: f64| -> f64 { left_density.lerp(right_density, z / global_z_size) };

        let density_max = density_at(z_left).max(density_at(z_right));
        if density_max <= 0. || self.macro_amount == 0 {
            return Ok(());
        }

        let z_mid = 0.5 * (z_left + z_right);
        let real_amount = density_at(z_mid) * cyl_rng_vol(z_right - z_left, r_bot, r_top);
        let weight = real_amount / self.macro_amount as f64;

        self.particles.reserve(self.macro_amount);

        for _ in 0..self.macro_amount {
            // uniform per unit volume in the cylindrical shell; the
            // half-open draw keeps the axis cell index non-negative
            let u: f64 = 1. - rng.gen_range(0., 1.);
            let r = (r_bot * r_bot + u * (r_top * r_top - r_bot * r_bot)).sqrt();

            // rejection against the linear profile
            let z = loop {
                let z = z_right - rng.gen_range(0., 1.) * (z_right - z_left);
                let accept: f64 = rng.gen_range(0., 1.);
                if accept * density_max <= density_at(z) {
                    break z;
                }
            };

            let velocity = thermal::maxwell_juttner(rng, self.temperature, self.mass);

            self.particles.push(Particle::new(
                self.id,
                r,
                z,
                velocity,
                self.charge * weight,
                self.mass * weight,
            ));
        }

        Ok(())
    }
}

impl BeamP {
    /// Macro-particles entering this tile's slice of the beam footprint
    /// during the current step.
    fn injection_batch(&self, geometry: &Geometry, time: &TimeSim, rng: &mut Pcg64) -> Vec<Particle> {
        // beams enter through the z = 0 boundary
        if geometry.left_z_grid_number != 0 {
            return Vec::new();
        }

        let r_bot = geometry.bottom_r();
        if r_bot >= self.bunch_radius {
            return Vec::new();
        }

        let t_rel = time.current - self.start_time;
        if t_rel < 0. {
            return Vec::new();
        }

        let bunch_period = (self.bunch_length + self.bunches_distance) / self.velocity;
        let bunch_number = (t_rel / bunch_period).floor() as usize;
        if bunch_number >= self.bunches_amount {
            return Vec::new();
        }

        let t_in_bunch = t_rel - bunch_number as f64 * bunch_period;
        if t_in_bunch >= self.bunch_length / self.velocity {
            return Vec::new();
        }

        let macro_per_bunch = self.macro_amount / self.bunches_amount;
        let injection_steps = (self.bunch_length / (self.velocity * time.step)).ceil().max(1.);
        let macro_per_step = (macro_per_bunch as f64 / injection_steps).max(1.);

        // share of the bunch cross-section covered by this tile
        let r_top = (r_bot + geometry.r_size).min(self.bunch_radius);
        let area_fraction =
            (r_top * r_top - r_bot * r_bot) / (self.bunch_radius * self.bunch_radius);
        let amount = (macro_per_step * area_fraction).round() as usize;
        if amount == 0 {
            return Vec::new();
        }

        let real_per_bunch = self.density
            * cyl_rng_vol(self.bunch_length, 0., self.bunch_radius);
        let weight = real_per_bunch / macro_per_bunch as f64;

        let slab = self.velocity * time.step;

        (0..amount)
            .map(|_| {
                let u: f64 = 1. - rng.gen_range(0., 1.);
                let r = (r_bot * r_bot + u * (r_top * r_top - r_bot * r_bot)).sqrt();
                let z = (1. - rng.gen_range(0., 1.)) * slab;

                Particle::new(
                    self.id,
                    r,
                    z,
                    Vec3::new(0., 0., self.velocity),
                    self.charge * weight,
                    self.mass * weight,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn tile_geometry() -> Geometry {
        Geometry::new(0.1, 0.4, 0, 16, 0, 64, 0., 0., 0., 0., 0., [true, true, true, true]).unwrap()
    }

    fn beam() -> BeamP {
        BeamP {
            id: 1000,
            name: "beam_electrons".to_string(),
            charge: -1.6e-19,
            mass: 9.1e-31,
            macro_amount: 1000,
            start_time: 0.,
            bunch_radius: 0.02,
            density: 1e16,
            bunches_amount: 2,
            bunch_length: 0.01,
            bunches_distance: 0.01,
            velocity: 2.8e8,
            particles: Vec::new(),
        }
    }

    #[test]
    fn background_distribute_fills_tile() {
        let geometry = tile_geometry();
        let mut rng = Pcg64::seed_from_u64(7);
        let mut specie = Specie::Background(SpecieP {
            id: 0,
            name: "electrons".to_string(),
            charge: -1.6e-19,
            mass: 9.1e-31,
            macro_amount: 500,
            left_density: 1e17,
            right_density: 2e17,
            temperature: 1.,
            particles: Vec::new(),
        });

        specie.distribute(&geometry, 0.4, &mut rng).unwrap();

        assert_eq!(specie.particles().len(), 500);
        for p in specie.particles() {
            assert!(p.r >= 0. && p.r <= 0.1);
            assert!(p.z >= 0. && p.z <= 0.4);
            assert!(p.alive);
            assert!(p.charge < 0.);
            assert!(p.mass > 0.);
        }
    }

    #[test]
    fn zero_density_distributes_nothing() {
        let geometry = tile_geometry();
        let mut rng = Pcg64::seed_from_u64(7);
        let mut specie = Specie::Background(SpecieP {
            id: 0,
            name: "ions".to_string(),
            charge: 1.6e-19,
            mass: 1.67e-27,
            macro_amount: 100,
            left_density: 0.,
            right_density: 0.,
            temperature: 1.,
            particles: Vec::new(),
        });

        specie.distribute(&geometry, 0.4, &mut rng).unwrap();
        assert!(specie.particles().is_empty());
    }

    #[test]
    fn beam_injects_only_when_scheduled() {
        let geometry = tile_geometry();
        let mut rng = Pcg64::seed_from_u64(11);
        let mut b = beam();
        b.start_time = 1e-9;

        let early = TimeSim {
            current: 0.,
            step: 1e-12,
            end: 1e-8,
        };
        assert!(b.injection_batch(&geometry, &early, &mut rng).is_empty());

        let active = TimeSim {
            current: 1e-9,
            step: 1e-12,
            end: 1e-8,
        };
        let batch = b.injection_batch(&geometry, &active, &mut rng);
        assert!(!batch.is_empty());
        for p in &batch {
            assert!(p.r <= b.bunch_radius);
            assert!(p.z <= b.velocity * active.step);
            assert_eq!(p.v_z, b.velocity);
            assert_eq!(p.id, 1000);
        }
    }

    #[test]
    fn beam_skips_tiles_outside_footprint() {
        // tile starting above the bunch radius
        let geometry =
            Geometry::new(0.1, 0.4, 16, 32, 0, 64, 0., 0., 0., 0., 0., [false; 4]).unwrap();
        let mut rng = Pcg64::seed_from_u64(11);
        let b = beam();

        let active = TimeSim {
            current: 0.,
            step: 1e-12,
            end: 1e-8,
        };
        assert!(b.injection_batch(&geometry, &active, &mut rng).is_empty());
    }

    #[test]
    fn beam_pauses_between_bunches() {
        let geometry = tile_geometry();
        let mut rng = Pcg64::seed_from_u64(11);
        let b = beam();

        // in the gap after the first bunch
        let gap_time = b.bunch_length / b.velocity * 1.5;
        let gap = TimeSim {
            current: gap_time,
            step: 1e-12,
            end: 1e-8,
        };
        assert!(b.injection_batch(&geometry, &gap, &mut rng).is_empty());
    }
}
