//! JSON parameter file handling.

use crate::collisions::CollisionAlgorithm;
use crate::constants::LIGHT_VEL;
use crate::errors::*;
use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::io::prelude::*;

/// Structure that holds settings, which are defined externally in a
/// JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub geometry: GeometrySettings,
    pub time: TimeSettings,
    #[serde(default)]
    pub particle_species: Vec<SpecieSettings>,
    #[serde(default)]
    pub particle_beams: Vec<BeamSettings>,
    pub output_data: OutputSettings,
    #[serde(default)]
    pub probes: Vec<ProbeSettings>,
    #[serde(default)]
    pub collisions: CollisionsSettings,
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,
}

fn default_rng_seed() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometrySettings {
    pub r_size: f64,
    pub z_size: f64,
    pub r_grid_amount: usize,
    pub z_grid_amount: usize,
    pub areas_by_r: usize,
    pub areas_by_z: usize,
    /// [r=0, r=wall, z=0, z=wall]
    pub walls: [bool; 4],
    /// physical PML thicknesses: [r=0 (unused), z=0, r=wall, z=wall]
    #[serde(default)]
    pub pml_length: [f64; 4],
    #[serde(default)]
    pub pml_sigma: [f64; 2],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSettings {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

/// Background plasma specie. `charge` is in elementary charges,
/// `mass` in electron masses, `temperature` in eV, densities in m^-3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecieSettings {
    pub name: String,
    pub charge: f64,
    pub mass: f64,
    pub macro_amount: usize,
    pub left_density: f64,
    pub right_density: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeamSettings {
    pub name: String,
    pub charge: f64,
    pub mass: f64,
    pub macro_amount: usize,
    pub start_time: f64,
    pub bunch_radius: f64,
    pub density: f64,
    pub bunches_amount: usize,
    pub bunch_length: f64,
    pub bunches_distance: f64,
    /// injection velocity, m/s
    pub velocity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    pub data_root: String,
    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub compress_level: u32,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Binary,
}

impl Default for OutputFormat {
    fn default() -> OutputFormat {
        OutputFormat::Plain
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSettings {
    pub component: String,
    #[serde(default)]
    pub specie: Option<String>,
    pub shape: ProbeShape,
    /// [r_start, z_start, r_end, z_end] in global cells
    pub size: [usize; 4],
    /// dump every `schedule` steps
    pub schedule: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeShape {
    Rec,
    Vec,
    Dot,
    Mpframe,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollisionsSettings {
    #[serde(default)]
    pub algorithm: CollisionAlgorithm,
}

/// Reads the content of a file into a string and returns it.
fn read_from_file(filename: &str) -> Result<String> {
    let mut f = File::open(filename).chain_err(|| "unable to open parameter file")?;
    let mut content = String::new();

    f.read_to_string(&mut content)
        .chain_err(|| "unable to read parameter file")?;

    Ok(content)
}

/// Reads a JSON parameter file, parses and validates it.
pub fn read_parameter_file(param_file: &str) -> Result<Settings> {
    let json_string = read_from_file(param_file)?;

    let settings: Settings = serde_json::from_str(&json_string)
        .chain_err(|| ErrorKind::Config("unable to parse parameter file".to_string()))?;

    check_settings(&settings)?;

    Ok(settings)
}

pub fn check_settings(s: &Settings) -> Result<()> {
    let g = &s.geometry;

    if g.r_size <= 0. || g.z_size <= 0. {
        bail!(ErrorKind::Config(format!(
            "geometry size is invalid, must be bigger than 0: [{}, {}]",
            g.r_size, g.z_size
        )));
    }
    if g.r_grid_amount == 0 || g.z_grid_amount == 0 {
        bail!(ErrorKind::Config("grid amount must be bigger than 0".to_string()));
    }
    if g.areas_by_r == 0 || g.areas_by_z == 0 {
        bail!(ErrorKind::Config("area amount must be bigger than 0".to_string()));
    }
    if g.r_grid_amount % g.areas_by_r != 0 || g.z_grid_amount % g.areas_by_z != 0 {
        bail!(ErrorKind::Config(format!(
            "grid amount [{}, {}] must divide evenly into areas [{}, {}]",
            g.r_grid_amount, g.z_grid_amount, g.areas_by_r, g.areas_by_z
        )));
    }

    if s.time.step <= 0. || s.time.end <= s.time.start {
        bail!(ErrorKind::Config("time settings are inconsistent".to_string()));
    }

    for sp in &s.particle_species {
        if sp.mass <= 0. {
            bail!(ErrorKind::Config(format!("specie `{}' has non-positive mass", sp.name)));
        }
        if sp.temperature < 0. {
            bail!(ErrorKind::Config(format!(
                "specie `{}' has negative temperature",
                sp.name
            )));
        }
    }

    for bm in &s.particle_beams {
        if bm.velocity <= 0. || bm.velocity >= LIGHT_VEL {
            bail!(ErrorKind::Config(format!(
                "beam `{}' velocity must be in (0, c), got {}",
                bm.name, bm.velocity
            )));
        }
        if bm.bunches_amount == 0 || bm.bunch_length <= 0. || bm.bunch_radius <= 0. {
            bail!(ErrorKind::Config(format!("beam `{}' bunch geometry is invalid", bm.name)));
        }
    }

    for probe in &s.probes {
        if probe.schedule == 0 {
            bail!(ErrorKind::Config("probe schedule must be bigger than 0".to_string()));
        }
        let [r_start, z_start, r_end, z_end] = probe.size;
        if r_end > g.r_grid_amount || z_end > g.z_grid_amount {
            bail!(ErrorKind::Config(format!(
                "probe window [{} {} {} {}] exceeds the grid",
                r_start, z_start, r_end, z_end
            )));
        }
        if r_start > r_end || z_start > z_end {
            bail!(ErrorKind::Config("probe window is inverted".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "geometry": {
                "r_size": 0.1, "z_size": 0.4,
                "r_grid_amount": 32, "z_grid_amount": 128,
                "areas_by_r": 2, "areas_by_z": 4,
                "walls": [true, true, true, true],
                "pml_length": [0.0, 0.01, 0.01, 0.01],
                "pml_sigma": [1e-5, 7e-2]
            },
            "time": { "start": 0.0, "end": 3e-11, "step": 1e-13 },
            "particle_species": [
                { "name": "electrons", "charge": -1, "mass": 1,
                  "macro_amount": 1024,
                  "left_density": 1e17, "right_density": 1.05e17,
                  "temperature": 1.0 }
            ],
            "particle_beams": [
                { "name": "electrons", "charge": -1, "mass": 1,
                  "macro_amount": 2048, "start_time": 0.0,
                  "bunch_radius": 0.02, "density": 1e16,
                  "bunches_amount": 2, "bunch_length": 0.01,
                  "bunches_distance": 0.01, "velocity": 2.8e8 }
            ],
            "output_data": { "data_root": "/tmp/picopic", "compress": false, "compress_level": 0 },
            "probes": [
                { "component": "e_r", "shape": "rec",
                  "size": [0, 0, 32, 128], "schedule": 5 },
                { "component": "j_z", "shape": "dot",
                  "size": [10, 10, 10, 10], "schedule": 1 }
            ],
            "collisions": { "algorithm": "sentoku" },
            "rng_seed": 42
        }"#
    }

    #[test]
    fn parses_a_full_parameter_file() {
        let s: Settings = serde_json::from_str(minimal_json()).unwrap();
        check_settings(&s).unwrap();

        assert_eq!(s.geometry.r_grid_amount, 32);
        assert_eq!(s.particle_species.len(), 1);
        assert_eq!(s.particle_beams.len(), 1);
        assert_eq!(s.probes.len(), 2);
        assert_eq!(s.probes[0].shape, ProbeShape::Rec);
        assert_eq!(s.collisions.algorithm, CollisionAlgorithm::Sentoku);
        assert_eq!(s.rng_seed, 42);
        assert_eq!(s.output_data.format, OutputFormat::Plain);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = minimal_json().replace("\"rng_seed\": 42", "\"rngseed\": 42");
        let res: ::std::result::Result<Settings, _> = serde_json::from_str(&json);
        assert!(res.is_err());
    }

    #[test]
    fn uneven_tiling_is_rejected() {
        let json = minimal_json().replace("\"areas_by_r\": 2", "\"areas_by_r\": 3");
        let s: Settings = serde_json::from_str(&json).unwrap();
        assert!(check_settings(&s).is_err());
    }

    #[test]
    fn superluminal_beam_is_rejected() {
        let json = minimal_json().replace("\"velocity\": 2.8e8", "\"velocity\": 4e8");
        let s: Settings = serde_json::from_str(&json).unwrap();
        assert!(check_settings(&s).is_err());
    }

    #[test]
    fn inverted_probe_window_is_rejected() {
        let json = minimal_json().replace("[0, 0, 32, 128]", "[5, 0, 2, 128]");
        let s: Settings = serde_json::from_str(&json).unwrap();
        assert!(check_settings(&s).is_err());
    }
}
