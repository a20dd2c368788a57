//! Physics helpers: relativistic kinematics, plasma parameters and
//! thermal velocity sampling.

pub mod rel {
    use crate::constants::LIGHT_VEL_POW_2;
    use crate::errors::*;

    /// Lorentz factor from a squared velocity.
    ///
    /// Takes the squared velocity to spare the caller a square root.
    /// Fails when the velocity reaches or exceeds the speed of light,
    /// which indicates an upstream numerical blowup.
    pub fn lorentz_factor(sq_velocity: f64) -> Result<f64> {
        let beta2 = sq_velocity / LIGHT_VEL_POW_2;

        if !(beta2 < 1.) {
            bail!(ErrorKind::Superluminal(sq_velocity.sqrt()));
        }

        let gamma = 1. / (1. - beta2).sqrt();
        if !gamma.is_finite() {
            bail!(ErrorKind::Superluminal(sq_velocity.sqrt()));
        }

        Ok(gamma)
    }

    /// Lorentz factor from the squared magnitude of the momentum per
    /// unit rest mass, `u = γv`. Never fails: `1 + u²/c²` is positive.
    pub fn lorentz_factor_from_u(sq_u: f64) -> f64 {
        (1. + sq_u / LIGHT_VEL_POW_2).sqrt()
    }
}

pub mod plasma {
    use crate::constants::{EL_CHARGE, EPSILON0, PI};

    /// Debye length for electron density (m^-3) and temperature (J).
    pub fn debye_length(density: f64, temperature: f64) -> f64 {
        (EPSILON0 * temperature / density).sqrt() / EL_CHARGE
    }

    /// Coulomb logarithm from the reduced mass of the pair, the Debye
    /// length and the relative velocity. Bounded below by the caller:
    /// negative values gate the collision off.
    pub fn coulomb_logarithm(mass_a: f64, mass_b: f64, debye: f64, v_rel: f64) -> f64 {
        let m_ab = mass_a * mass_b / (mass_a + mass_b);
        // closest-approach impact parameter for 90 degree deflection
        let b90 = EL_CHARGE * EL_CHARGE / (4. * PI * EPSILON0 * m_ab * v_rel * v_rel);

        (debye / b90).ln()
    }

    /// Collision frequency entering the scattering-angle variance:
    /// `q_a² q_b² n lnΛ / (8 π ε₀² p² v)`.
    pub fn collision_frequency(
        charge_a: f64,
        charge_b: f64,
        density: f64,
        l_coulomb: f64,
        p_rel: f64,
        v_rel: f64,
    ) -> f64 {
        charge_a * charge_a * charge_b * charge_b * density * l_coulomb
            / (8. * PI * EPSILON0 * EPSILON0 * p_rel * p_rel * v_rel)
    }
}

pub mod thermal {
    use crate::constants::{EL_VOLT, LIGHT_VEL, PI};
    use crate::vector::Vec3;
    use rand::Rng;
    use rand_distr::StandardNormal;

    /// Samples a thermal 3-velocity for a particle of rest mass `mass`
    /// (kg) at temperature `temperature` (eV) from the Maxwell–Jüttner
    /// distribution.
    ///
    /// Uses the Sobol rejection method in the relativistic regime and a
    /// plain Maxwell–Boltzmann draw when `kT/mc²` is small, where the
    /// Sobol acceptance rate collapses.
    pub fn maxwell_juttner<R: Rng>(rng: &mut R, temperature: f64, mass: f64) -> Vec3 {
        let t_joule = temperature * EL_VOLT;
        let theta = t_joule / (mass * LIGHT_VEL * LIGHT_VEL);

        if theta < 0.1 {
            let v_th = (t_joule / mass).sqrt();
            let x: f64 = rng.sample(StandardNormal);
            let y: f64 = rng.sample(StandardNormal);
            let z: f64 = rng.sample(StandardNormal);
            return Vec3::new(x * v_th, y * v_th, z * v_th);
        }

        // Sobol method: draw u = γβ until the acceptance condition holds
        let u = loop {
            let x1: f64 = rng.gen_range(f64::EPSILON, 1.);
            let x2: f64 = rng.gen_range(f64::EPSILON, 1.);
            let x3: f64 = rng.gen_range(f64::EPSILON, 1.);
            let x4: f64 = rng.gen_range(f64::EPSILON, 1.);

            let u = -theta * (x1 * x2 * x3).ln();
            let eta = -theta * (x1 * x2 * x3 * x4).ln();

            if eta * eta - u * u > 1. {
                break u;
            }
        };

        let speed = u * LIGHT_VEL / (1. + u * u).sqrt();

        // isotropic direction
        let cos_theta = rng.gen_range(-1.0f64, 1.);
        let sin_theta = (1. - cos_theta * cos_theta).sqrt();
        let phi = rng.gen_range(0., 2. * PI);

        Vec3::new(
            speed * sin_theta * phi.cos(),
            speed * sin_theta * phi.sin(),
            speed * cos_theta,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EL_MASS, LIGHT_VEL};
    use crate::errors::ErrorKind;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn lorentz_factor_at_rest() {
        assert_eq!(rel::lorentz_factor(0.).unwrap(), 1.);
    }

    #[test]
    fn lorentz_factor_rejects_superluminal() {
        let err = rel::lorentz_factor(LIGHT_VEL * LIGHT_VEL).unwrap_err();
        match err.kind() {
            ErrorKind::Superluminal(_) => (),
            other => panic!("unexpected error kind: {:?}", other),
        }
    }

    #[test]
    fn lorentz_factor_from_u_is_total() {
        assert_eq!(rel::lorentz_factor_from_u(0.), 1.);
        assert!(rel::lorentz_factor_from_u(1e20).is_finite());
    }

    #[test]
    fn debye_length_scales_with_density() {
        let t = 1.6e-19 * 100.; // 100 eV in joule
        let low = plasma::debye_length(1e18, t);
        let high = plasma::debye_length(1e22, t);
        assert!(low > high);
        assert!(high > 0.);
    }

    #[test]
    fn coulomb_logarithm_is_positive_for_hot_plasma() {
        let t = 1.6e-19 * 1000.;
        let debye = plasma::debye_length(1e20, t);
        let l = plasma::coulomb_logarithm(EL_MASS, EL_MASS, debye, 1e7);
        assert!(l > 0.);
    }

    #[test]
    fn maxwell_juttner_stays_subluminal() {
        let mut rng = Pcg64::seed_from_u64(42);

        // cold branch
        for _ in 0..100 {
            let v = thermal::maxwell_juttner(&mut rng, 10., EL_MASS);
            assert!(v.length() < LIGHT_VEL);
        }

        // relativistic branch, kT ~ mc²
        for _ in 0..100 {
            let v = thermal::maxwell_juttner(&mut rng, 511e3, EL_MASS);
            assert!(v.length() < LIGHT_VEL);
        }
    }
}
