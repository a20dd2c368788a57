//! Relativistic binary scatter kernel after Sentoku and Kemp,
//! DOI: 10.1002/ctpp.201700121, with the Takizuka–Abe angle sampling.
//!
//! Velocities are Lorentz-boosted into the center-of-momentum frame,
//! the pair momenta are rotated there, and the result is boosted back.

use super::{CellEnv, PairMember, ScatterKernel};
use crate::constants::{LIGHT_VEL_POW_2, MNZL, PI};
use crate::errors::*;
use crate::phys::{plasma, rel};
use crate::vector::Vec3;
use rand::Rng;
use rand_distr::StandardNormal;
use rand_pcg::Pcg64;

pub struct SentokuM;

impl ScatterKernel for SentokuM {
    fn scatter(
        &self,
        pa: PairMember,
        pb: PairMember,
        env: &CellEnv,
        time_step: f64,
        rng: &mut Pcg64,
    ) -> Result<Option<(Vec3, Vec3)>> {
        // the a-particle must carry the smaller macro weight
        let w_ratio = pa.mass * pb.rest_mass / (pb.mass * pa.rest_mass);
        let swap = w_ratio > 1.;
        let (a, b) = if swap { (pb, pa) } else { (pa, pb) };

        let v_a = a.velocity;
        let v_b = b.velocity;

        let gamma_a = rel::lorentz_factor(v_a.length2())?;
        let gamma_b = rel::lorentz_factor(v_b.length2())?;

        // velocity of the center-of-momentum frame
        let v_cm = (v_a * (gamma_a * a.mass) + v_b * (gamma_b * b.mass))
            / (gamma_a * a.mass + gamma_b * b.mass);
        let gamma_cm = rel::lorentz_factor(v_cm.length2())?;

        let v_a_cm = boost_into(v_a, v_cm, gamma_cm);
        let v_b_cm = boost_into(v_b, v_cm, gamma_cm);

        let gamma_a_cm = rel::lorentz_factor(v_a_cm.length2())?;
        let gamma_b_cm = rel::lorentz_factor(v_b_cm.length2())?;

        let p_a_cm = v_a_cm * (a.mass * gamma_a_cm);
        let p_b_cm = v_b_cm * (b.mass * gamma_b_cm);
        let p_cm = p_a_cm;

        // relative velocity in the rest frame of the pair
        let v_rel = (v_a_cm - v_b_cm) / (1. - v_a_cm.dot(v_b_cm) / LIGHT_VEL_POW_2);
        let p_rel = p_b_cm - p_a_cm;

        // collision gates
        if p_rel.length2() == 0. {
            return Ok(None);
        }
        if v_rel.length2() < MNZL {
            return Ok(None);
        }
        if env.electron_density <= 0. {
            return Ok(None);
        }
        if !env.electron_temperature.is_normal() {
            return Ok(None);
        }

        let density_lowest = env.electron_density.min(env.ion_density);

        let debye = plasma::debye_length(env.electron_density, env.electron_temperature);
        let l_coulomb =
            plasma::coulomb_logarithm(a.rest_mass, b.rest_mass, debye, v_rel.length());
        if l_coulomb <= 0. {
            return Ok(None);
        }

        // TA77 angle sampling in the CM frame
        let m_ab = a.mass * b.mass / (a.mass + b.mass);
        let variance = a.rest_charge * a.rest_charge * b.rest_charge * b.rest_charge
            * density_lowest
            * l_coulomb
            / (8. * PI
                * crate::constants::EPSILON0
                * crate::constants::EPSILON0
                * m_ab
                * p_cm.length2()
                * v_rel.length())
            * time_step;

        if variance == 0. || !variance.is_finite() {
            bail!(ErrorKind::NumericUnderflow);
        }

        let normal: f64 = rng.sample(StandardNormal);
        let delta = normal * variance.sqrt();

        let sin_theta = 2. * delta / (1. + delta * delta);
        let cos_theta = 1. - 2. * delta * delta / (1. + delta * delta);

        let phi_angle = rng.gen_range(0., 2. * PI);
        let sin_phi = phi_angle.sin();
        let cos_phi = phi_angle.cos();

        // momentum transfer in the CM frame
        let p_cm_abs = p_cm.length();
        let p_cm_prp = (p_cm.r * p_cm.r + p_cm.phi * p_cm.phi).sqrt();

        let d_p = if p_cm_prp < MNZL {
            Vec3::new(
                p_cm_abs * sin_theta * cos_phi,
                p_cm_abs * sin_theta * sin_phi,
                -p_cm_abs * (1. - cos_theta),
            )
        } else {
            Vec3::new(
                p_cm.r * p_cm.z / p_cm_prp * sin_theta * cos_phi
                    - p_cm.phi * p_cm_abs / p_cm_prp * sin_theta * sin_phi
                    - p_cm.r * (1. - cos_theta),
                p_cm.phi * p_cm.z / p_cm_prp * sin_theta * cos_phi
                    + p_cm.r * p_cm_abs / p_cm_prp * sin_theta * sin_phi
                    - p_cm.phi * (1. - cos_theta),
                -p_cm_prp * sin_theta * cos_phi - p_cm.z * (1. - cos_theta),
            )
        };

        let p_a_bar_cm = p_a_cm + d_p;
        let p_b_bar_cm = p_b_cm - d_p;

        // back to velocities; the rotation preserves |p| so the Lorentz
        // factors follow from the scattered momenta
        let v_a_bar_cm = velocity_from_momentum(p_a_bar_cm, a.mass);
        let v_b_bar_cm = velocity_from_momentum(p_b_bar_cm, b.mass);

        let v_a_bar = boost_back(v_a_bar_cm, v_cm, gamma_cm);
        let v_b_bar = boost_back(v_b_bar_cm, v_cm, gamma_cm);

        if swap {
            Ok(Some((v_b_bar, v_a_bar)))
        } else {
            Ok(Some((v_a_bar, v_b_bar)))
        }
    }
}

/// Transforms a lab-frame velocity into the frame moving at `v_cm`.
fn boost_into(v: Vec3, v_cm: Vec3, gamma_cm: f64) -> Vec3 {
    let v_cm_len2 = v_cm.length2();
    if v_cm_len2 < MNZL {
        return v;
    }

    let projected = v_cm * (v_cm.dot(v) * (gamma_cm - 1.) / v_cm_len2);
    (projected + v - v_cm * gamma_cm) / (gamma_cm * (1. - v_cm.dot(v) / LIGHT_VEL_POW_2))
}

/// Inverse of `boost_into`.
fn boost_back(v: Vec3, v_cm: Vec3, gamma_cm: f64) -> Vec3 {
    let v_cm_len2 = v_cm.length2();
    if v_cm_len2 < MNZL {
        return v;
    }

    let projected = v_cm * (v_cm.dot(v) * (gamma_cm - 1.) / v_cm_len2);
    (projected + v + v_cm * gamma_cm) / (gamma_cm * (1. + v_cm.dot(v) / LIGHT_VEL_POW_2))
}

fn velocity_from_momentum(p: Vec3, mass: f64) -> Vec3 {
    let gamma = (1. + p.length2() / (mass * mass * LIGHT_VEL_POW_2)).sqrt();
    p / (mass * gamma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EL_CHARGE, EL_MASS, EL_VOLT, LIGHT_VEL, PROTON_MASS};
    use rand::SeedableRng;

    fn electron(v: Vec3) -> PairMember {
        PairMember {
            velocity: v,
            charge: -EL_CHARGE * 1e10,
            mass: EL_MASS * 1e10,
            rest_charge: -EL_CHARGE,
            rest_mass: EL_MASS,
        }
    }

    fn ion(v: Vec3) -> PairMember {
        PairMember {
            velocity: v,
            charge: EL_CHARGE * 1e10,
            mass: PROTON_MASS * 1e10,
            rest_charge: EL_CHARGE,
            rest_mass: PROTON_MASS,
        }
    }

    fn hot_env() -> CellEnv {
        CellEnv {
            electron_density: 1e20,
            ion_density: 1e20,
            electron_temperature: 1000. * EL_VOLT,
        }
    }

    #[test]
    fn particles_at_rest_do_not_scatter() {
        let mut rng = Pcg64::seed_from_u64(5);
        let res = SentokuM
            .scatter(
                electron(Vec3::zero()),
                electron(Vec3::zero()),
                &hot_env(),
                1e-12,
                &mut rng,
            )
            .unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn scattering_keeps_both_velocities_subluminal() {
        let mut rng = Pcg64::seed_from_u64(5);

        for k in 0..100 {
            let a = electron(Vec3::new(0.3 * LIGHT_VEL, 0., 1e6 * k as f64));
            let b = ion(Vec3::new(0., 0., -1e6));

            if let Some((v_a, v_b)) = SentokuM
                .scatter(a, b, &hot_env(), 1e-12, &mut rng)
                .unwrap()
            {
                assert!(v_a.length() < LIGHT_VEL);
                assert!(v_b.length() < LIGHT_VEL);
            }
        }
    }

    #[test]
    fn identical_velocities_gate_off() {
        let mut rng = Pcg64::seed_from_u64(5);
        let v = Vec3::new(1e6, 2e6, 3e6);

        let res = SentokuM
            .scatter(electron(v), electron(v), &hot_env(), 1e-12, &mut rng)
            .unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn abnormal_temperature_gates_off() {
        let mut rng = Pcg64::seed_from_u64(5);
        let mut env = hot_env();
        env.electron_temperature = f64::NAN;

        let res = SentokuM
            .scatter(
                electron(Vec3::new(1e6, 0., 0.)),
                ion(Vec3::new(-1e6, 0., 0.)),
                &env,
                1e-12,
                &mut rng,
            )
            .unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn head_on_electron_pair_stays_symmetric_in_energy() {
        let mut rng = Pcg64::seed_from_u64(23);
        let a = electron(Vec3::new(1e7, 0., 0.));
        let b = electron(Vec3::new(-1e7, 0., 0.));

        let (v_a, v_b) = SentokuM
            .scatter(a, b, &hot_env(), 1e-12, &mut rng)
            .unwrap()
            .expect("gates should pass");

        // equal masses, CM at rest: the pair scatters back-to-back with
        // equal speeds
        assert!((v_a.length() - v_b.length()).abs() / v_a.length() < 1e-9);
    }
}
