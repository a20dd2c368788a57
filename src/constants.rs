//! Physical and mathematical constants.

pub const PI: f64 = 3.141_592_653_589_793_2;
/// Vacuum permittivity (electric constant), F*m^-1
pub const EPSILON0: f64 = 8.85e-12;
/// Electron mass, kg
pub const EL_MASS: f64 = 9.1e-31;
/// Proton mass, kg
pub const PROTON_MASS: f64 = 1.67e-27;
/// Elementary charge, coulomb
pub const EL_CHARGE: f64 = 1.6e-19;
/// Light speed in vacuum, m/s
pub const LIGHT_VEL: f64 = 3.0e8;
pub const LIGHT_VEL_POW_2: f64 = LIGHT_VEL * LIGHT_VEL;
/// Vacuum permeability (magnetic constant), m*kg*s^-2*A^-2
pub const MAGN_CONST: f64 = 1.26e-6;
/// Boltzmann constant, J/K
pub const BOLTZMANN: f64 = 1.380_648_52e-23;
/// Electronvolt, J
pub const EL_VOLT: f64 = 1.6e-19;
/// Minimal Non-Zeroing Limit. Smaller distances or velocities are
/// treated as zero.
pub const MNZL: f64 = 1e-15;
