//! Probe data writers: merging tile grids into global frames and
//! persisting them through a plaintext or binary engine.

use crate::domain::DomainGrid;
use crate::errors::*;
use crate::geometry::Geometry;
use crate::particle::Particle;
use crate::settings::{OutputFormat, ProbeSettings, ProbeShape, Settings};
use log::warn;
use ndarray::Array2;
use serde_derive::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write as IoWrite};
use std::path::PathBuf;

/// Field and current components a probe can address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldComponent {
    ER,
    EPhi,
    EZ,
    HR,
    HPhi,
    HZ,
    JR,
    JPhi,
    JZ,
}

impl FieldComponent {
    pub fn from_name(name: &str) -> Result<FieldComponent> {
        Ok(match name {
            "e_r" => FieldComponent::ER,
            "e_phi" => FieldComponent::EPhi,
            "e_z" => FieldComponent::EZ,
            "h_r" => FieldComponent::HR,
            "h_phi" => FieldComponent::HPhi,
            "h_z" => FieldComponent::HZ,
            "j_r" => FieldComponent::JR,
            "j_phi" => FieldComponent::JPhi,
            "j_z" => FieldComponent::JZ,
            other => bail!(ErrorKind::Config(format!(
                "unknown probe component `{}'",
                other
            ))),
        })
    }
}

/// One frame handed to the output engine.
#[derive(Debug, Serialize)]
pub enum FrameData {
    Rec(Array2<f64>),
    Vec(Vec<f64>),
    Dot(f64),
    Particles(Vec<Particle>),
}

/// Output backend: one file per probe per dumped step, or a single
/// self-describing MessagePack stream with the config as metadata.
pub enum OutEngine {
    Plain { root: PathBuf },
    Binary { out: BufWriter<File> },
}

impl OutEngine {
    pub fn new(settings: &Settings) -> Result<OutEngine> {
        let output = &settings.output_data;

        if output.compress {
            warn!("compression is not supported by the output engine");
        }

        let root = PathBuf::from(&output.data_root);
        create_dir_all(&root)
            .chain_err(|| ErrorKind::Output(format!("cannot create `{}'", root.display())))?;

        match output.format {
            OutputFormat::Plain => Ok(OutEngine::Plain { root }),
            OutputFormat::Binary => {
                let path = root.join("data.mpk");
                let file = File::create(&path)
                    .chain_err(|| ErrorKind::Output(format!("cannot create `{}'", path.display())))?;
                let mut out = BufWriter::new(file);

                let metadata = serde_json::to_string(settings)?;
                rmp_serde::encode::write(&mut out, &("metadata", metadata))
                    .chain_err(|| ErrorKind::Output("cannot write metadata".to_string()))?;

                Ok(OutEngine::Binary { out })
            }
        }
    }

    pub fn write_frame(&mut self, group: &str, step: usize, data: &FrameData) -> Result<()> {
        match self {
            OutEngine::Plain { root } => {
                let dir = root.join(group);
                create_dir_all(&dir)
                    .chain_err(|| ErrorKind::Output(format!("cannot create `{}'", dir.display())))?;

                let path = dir.join(format!("{}.dat", step));
                let file = File::create(&path)
                    .chain_err(|| ErrorKind::Output(format!("cannot create `{}'", path.display())))?;
                let mut out = BufWriter::new(file);

                let res = match data {
                    FrameData::Rec(frame) => {
                        let mut res = Ok(());
                        for row in frame.outer_iter() {
                            let line: Vec<String> = row.iter().map(|v| format!("{:e}", v)).collect();
                            res = writeln!(out, "{}", line.join(" "));
                            if res.is_err() {
                                break;
                            }
                        }
                        res
                    }
                    FrameData::Vec(values) => {
                        let line: Vec<String> = values.iter().map(|v| format!("{:e}", v)).collect();
                        writeln!(out, "{}", line.join(" "))
                    }
                    FrameData::Dot(value) => writeln!(out, "{:e}", value),
                    FrameData::Particles(particles) => {
                        let mut res = Ok(());
                        for p in particles {
                            res = writeln!(
                                out,
                                "{:e} {:e} {:e} {:e} {:e}",
                                p.r, p.z, p.v_r, p.v_phi, p.v_z
                            );
                            if res.is_err() {
                                break;
                            }
                        }
                        res
                    }
                };

                res.chain_err(|| ErrorKind::Output(format!("cannot write `{}'", path.display())))
            }
            OutEngine::Binary { out } => rmp_serde::encode::write(out, &(group, step, data))
                .chain_err(|| ErrorKind::Output("cannot append record".to_string())),
        }
    }
}

/// One configured probe bound to its schedule.
pub struct DataWriter {
    component: String,
    field: Option<FieldComponent>,
    specie: Option<String>,
    shape: ProbeShape,
    size: [usize; 4],
    schedule: usize,
}

impl DataWriter {
    pub fn new(probe: &ProbeSettings) -> Result<DataWriter> {
        let field = match probe.shape {
            ProbeShape::Mpframe => {
                if probe.specie.is_none() {
                    bail!(ErrorKind::Config(
                        "mpframe probe requires a specie".to_string()
                    ));
                }
                None
            }
            _ => Some(FieldComponent::from_name(&probe.component)?),
        };

        Ok(DataWriter {
            component: probe.component.clone(),
            field,
            specie: probe.specie.clone(),
            shape: probe.shape,
            size: probe.size,
            schedule: probe.schedule,
        })
    }

    fn group(&self) -> String {
        match &self.specie {
            Some(specie) => format!("{}/{}", self.component, specie),
            None => self.component.clone(),
        }
    }

    /// Dumps the probe when the schedule divides the step number.
    pub fn go(
        &self,
        engine: &mut OutEngine,
        areas: &DomainGrid,
        geometry_global: &Geometry,
        step: usize,
    ) -> Result<()> {
        if step % self.schedule != 0 {
            return Ok(());
        }

        let data = match self.shape {
            ProbeShape::Rec => {
                let component = self.field.expect("validated at construction");
                FrameData::Rec(merge_domains(areas, component, self.size))
            }
            ProbeShape::Vec => {
                let component = self.field.expect("validated at construction");
                let frame = merge_domains(areas, component, self.size);
                FrameData::Vec(frame.iter().cloned().collect())
            }
            ProbeShape::Dot => {
                let component = self.field.expect("validated at construction");
                let window = [
                    self.size[0],
                    self.size[1],
                    self.size[0] + 1,
                    self.size[1] + 1,
                ];
                let frame = merge_domains(areas, component, window);
                FrameData::Dot(frame[(0, 0)])
            }
            ProbeShape::Mpframe => {
                let specie = self.specie.as_ref().expect("validated at construction");
                FrameData::Particles(merge_particle_domains(
                    areas,
                    geometry_global,
                    specie,
                    self.size,
                ))
            }
        };

        engine.write_frame(&self.group(), step, &data)
    }
}

/// Gathers one component over the probe window from every tile core
/// into a global frame.
fn merge_domains(areas: &DomainGrid, component: FieldComponent, size: [usize; 4]) -> Array2<f64> {
    let [r_start, z_start, r_end, z_end] = size;
    let mut frame = Array2::zeros((r_end - r_start, z_end - z_start));

    for domain in &areas.domains {
        let geometry = &domain.geometry;

        for li in 0..geometry.r_grid_amount {
            let gi = li + geometry.bottom_r_grid_number;
            if gi < r_start || gi >= r_end {
                continue;
            }
            for lk in 0..geometry.z_grid_amount {
                let gk = lk + geometry.left_z_grid_number;
                if gk < z_start || gk >= z_end {
                    continue;
                }

                frame[(gi - r_start, gk - z_start)] =
                    component_value(domain, component, li as isize, lk as isize);
            }
        }
    }

    frame
}

fn component_value(
    domain: &crate::domain::Domain,
    component: FieldComponent,
    i: isize,
    k: isize,
) -> f64 {
    match component {
        FieldComponent::ER => domain.field_e.field.get(i, k).r,
        FieldComponent::EPhi => domain.field_e.field.get(i, k).phi,
        FieldComponent::EZ => domain.field_e.field.get(i, k).z,
        FieldComponent::HR => domain.field_h.field.get(i, k).r,
        FieldComponent::HPhi => domain.field_h.field.get(i, k).phi,
        FieldComponent::HZ => domain.field_h.field.get(i, k).z,
        FieldComponent::JR => domain.current.grid().get(i, k).r,
        FieldComponent::JPhi => domain.current.grid().get(i, k).phi,
        FieldComponent::JZ => domain.current.grid().get(i, k).z,
    }
}

/// Gathers the particles of one specie inside the probe window.
fn merge_particle_domains(
    areas: &DomainGrid,
    geometry_global: &Geometry,
    specie: &str,
    size: [usize; 4],
) -> Vec<Particle> {
    let dr = geometry_global.r_cell_size;
    let dz = geometry_global.z_cell_size;

    let r_range = size[0] as f64 * dr..size[2] as f64 * dr;
    let z_range = size[1] as f64 * dz..size[3] as f64 * dz;

    let mut frame = Vec::new();
    for domain in &areas.domains {
        for sp in &domain.species {
            if sp.name() != specie {
                continue;
            }
            frame.extend(
                sp.particles()
                    .iter()
                    .filter(|p| p.alive && r_range.contains(&p.r) && z_range.contains(&p.z))
                    .cloned(),
            );
        }
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::settings::ProbeShape;
    use crate::vector::Vec3;

    fn probe(shape: ProbeShape, component: &str, schedule: usize) -> ProbeSettings {
        ProbeSettings {
            component: component.to_string(),
            specie: None,
            shape,
            size: [0, 0, 4, 4],
            schedule,
        }
    }

    fn single_tile() -> DomainGrid {
        let geometry =
            Geometry::new(0.4, 0.4, 0, 4, 0, 4, 0., 0., 0., 0., 0., [true; 4]).unwrap();
        DomainGrid::new(vec![Domain::new(geometry, Vec::new())], 1, 1)
    }

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("picopic-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn unknown_component_is_a_config_error() {
        assert!(FieldComponent::from_name("b_r").is_err());
        assert!(FieldComponent::from_name("e_r").is_ok());
    }

    #[test]
    fn mpframe_without_specie_is_rejected() {
        let p = probe(ProbeShape::Mpframe, "position", 1);
        assert!(DataWriter::new(&p).is_err());
    }

    #[test]
    fn schedule_gates_the_dump() {
        let root = temp_root("schedule");
        let mut areas = single_tile();
        areas.domains[0]
            .field_e
            .field
            .set(1, 1, Vec3::new(5., 0., 0.));
        let global = areas.domains[0].geometry.clone();

        let mut engine = OutEngine::Plain { root: root.clone() };
        let writer = DataWriter::new(&probe(ProbeShape::Rec, "e_r", 5)).unwrap();

        writer.go(&mut engine, &areas, &global, 3).unwrap();
        assert!(!root.join("e_r").join("3.dat").exists());

        writer.go(&mut engine, &areas, &global, 5).unwrap();
        assert!(root.join("e_r").join("5.dat").exists());

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn merge_covers_both_tiles() {
        let mut domains = Vec::new();
        for j in 0..2 {
            let geometry = Geometry::new(
                0.4,
                0.2,
                0,
                4,
                j * 2,
                (j + 1) * 2,
                0.,
                0.,
                0.,
                0.,
                0.,
                [true; 4],
            )
            .unwrap();
            let mut domain = Domain::new(geometry, Vec::new());
            domain
                .field_e
                .field
                .set(0, 0, Vec3::new(j as f64 + 1., 0., 0.));
            domains.push(domain);
        }
        let areas = DomainGrid::new(domains, 1, 2);

        let frame = merge_domains(&areas, FieldComponent::ER, [0, 0, 4, 4]);

        assert_eq!(frame[(0, 0)], 1.);
        assert_eq!(frame[(0, 2)], 2.);
        assert_eq!(frame[(1, 1)], 0.);
    }

    #[test]
    fn binary_engine_appends_records() {
        let root = temp_root("binary");
        std::fs::create_dir_all(&root).unwrap();
        let path = root.join("data.mpk");
        let file = File::create(&path).unwrap();
        let mut engine = OutEngine::Binary {
            out: BufWriter::new(file),
        };

        let frame = FrameData::Dot(1.25);
        engine.write_frame("j_z", 10, &frame).unwrap();

        if let OutEngine::Binary { out } = &mut engine {
            out.flush().unwrap();
        }
        assert!(std::fs::metadata(&path).unwrap().len() > 0);

        std::fs::remove_dir_all(&root).ok();
    }
}
