//! Classical binary scatter kernel after Takizuka and Abe (1977),
//! DOI: 10.1016/0021-9991(77)90099-7.

use super::{CellEnv, PairMember, ScatterKernel};
use crate::constants::{MNZL, PI};
use crate::errors::*;
use crate::phys::plasma;
use crate::vector::Vec3;
use rand::Rng;
use rand_distr::StandardNormal;
use rand_pcg::Pcg64;

pub struct Ta77S;

impl ScatterKernel for Ta77S {
    fn scatter(
        &self,
        a: PairMember,
        b: PairMember,
        env: &CellEnv,
        time_step: f64,
        rng: &mut Pcg64,
    ) -> Result<Option<(Vec3, Vec3)>> {
        let u = a.velocity - b.velocity;
        let u_len2 = u.length2();

        if u_len2 < MNZL {
            return Ok(None);
        }
        if env.electron_density <= 0. {
            return Ok(None);
        }
        if !env.electron_temperature.is_normal() {
            return Ok(None);
        }

        let density_lowest = env.electron_density.min(env.ion_density);
        if density_lowest <= 0. {
            return Ok(None);
        }

        let u_len = u_len2.sqrt();
        let debye = plasma::debye_length(env.electron_density, env.electron_temperature);
        let l_coulomb = plasma::coulomb_logarithm(a.rest_mass, b.rest_mass, debye, u_len);
        if l_coulomb <= 0. {
            return Ok(None);
        }

        // variance of the small-angle deflection over one timestep
        let m_ab = a.rest_mass * b.rest_mass / (a.rest_mass + b.rest_mass);
        let variance = plasma::collision_frequency(
            a.rest_charge,
            b.rest_charge,
            density_lowest,
            l_coulomb,
            m_ab * u_len,
            u_len,
        ) * time_step;

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

        let d_u = rotate_relative_velocity(u, u_len, sin_theta, cos_theta, sin_phi, cos_phi);

        // split the deflection by the macro masses so that momentum is
        // conserved exactly
        let mass_sum = a.mass + b.mass;
        let v_a = a.velocity + d_u * (b.mass / mass_sum);
        let v_b = b.velocity - d_u * (a.mass / mass_sum);

        Ok(Some((v_a, v_b)))
    }
}

/// Change of the relative velocity under a rotation by (theta, phi)
/// around itself.
fn rotate_relative_velocity(
    u: Vec3,
    u_len: f64,
    sin_theta: f64,
    cos_theta: f64,
    sin_phi: f64,
    cos_phi: f64,
) -> Vec3 {
    let u_perp = (u.r * u.r + u.phi * u.phi).sqrt();

    if u_perp < MNZL {
        // relative velocity along z
        Vec3::new(
            u_len * sin_theta * cos_phi,
            u_len * sin_theta * sin_phi,
            -u_len * (1. - cos_theta),
        )
    } else {
        Vec3::new(
            u.r / u_perp * u.z * sin_theta * cos_phi - u.phi / u_perp * u_len * sin_theta * sin_phi
                - u.r * (1. - cos_theta),
            u.phi / u_perp * u.z * sin_theta * cos_phi
                + u.r / u_perp * u_len * sin_theta * sin_phi
                - u.phi * (1. - cos_theta),
            -u_perp * sin_theta * cos_phi - u.z * (1. - cos_theta),
        )
    }
}
