//! Cylindrical (r, z) sub-domain geometry.

use crate::constants::PI;
use crate::errors::*;

/// Geometry of one sub-domain: physical extent, position inside the
/// global grid, cell sizes, wall flags and PML layers.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub r_size: f64,
    pub z_size: f64,

    pub bottom_r_grid_number: usize,
    pub top_r_grid_number: usize,
    pub left_z_grid_number: usize,
    pub right_z_grid_number: usize,

    pub r_grid_amount: usize,
    pub z_grid_amount: usize,

    pub r_cell_size: f64,
    pub z_cell_size: f64,

    /// wall flags: [r=0, r=wall, z=0, z=wall]
    pub walls: [bool; 4],

    /// comparative pml lengths on walls: [r=0, z=0, r=wall, z=wall]
    pub pml_length: [f64; 4],
    pub pml_sigma: [f64; 2],

    pub is_near_z_axis: bool,

    pub areas_by_r: usize,
    pub areas_by_z: usize,
}

impl Geometry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        r_size: f64,
        z_size: f64,
        bottom_r_grid_number: usize,
        top_r_grid_number: usize,
        left_z_grid_number: usize,
        right_z_grid_number: usize,
        pml_l_z0: f64,
        pml_l_zwall: f64,
        pml_l_rwall: f64,
        pml_sigma1: f64,
        pml_sigma2: f64,
        walls: [bool; 4],
    ) -> Result<Geometry> {
        let r_grid_amount = top_r_grid_number - bottom_r_grid_number;
        let z_grid_amount = right_z_grid_number - left_z_grid_number;

        if r_grid_amount == 0 || z_grid_amount == 0 {
            bail!(ErrorKind::Config(
                "geometry has zero grid cells along r or z".to_string()
            ));
        }

        let mut geometry = Geometry {
            r_size,
            z_size,
            bottom_r_grid_number,
            top_r_grid_number,
            left_z_grid_number,
            right_z_grid_number,
            r_grid_amount,
            z_grid_amount,
            r_cell_size: r_size / r_grid_amount as f64,
            z_cell_size: z_size / z_grid_amount as f64,
            walls,
            pml_length: [0.; 4],
            pml_sigma: [0.; 2],
            is_near_z_axis: bottom_r_grid_number == 0,
            areas_by_r: 1,
            areas_by_z: 1,
        };

        geometry.set_pml(pml_l_z0, pml_l_zwall, pml_l_rwall, pml_sigma1, pml_sigma2)?;

        Ok(geometry)
    }

    fn set_pml(
        &mut self,
        comparative_l_z0: f64,
        comparative_l_zwall: f64,
        comparative_l_rwall: f64,
        sigma1: f64,
        sigma2: f64,
    ) -> Result<()> {
        if comparative_l_z0 > self.z_size
            || comparative_l_zwall > self.z_size
            || comparative_l_rwall > self.r_size
        {
            bail!(ErrorKind::Config(format!(
                "PML length exceeds geometry size: [{}, {}, {}] vs [{}, {}]",
                comparative_l_z0, comparative_l_zwall, comparative_l_rwall, self.r_size, self.z_size
            )));
        }
        if comparative_l_z0 < 0. || comparative_l_zwall < 0. || comparative_l_rwall < 0. {
            bail!(ErrorKind::Config("PML length is negative".to_string()));
        }

        self.pml_length = [0., comparative_l_z0, comparative_l_rwall, comparative_l_zwall];
        self.pml_sigma = [sigma1, sigma2];

        Ok(())
    }

    /// Physical radius of the tile's bottom edge in the global domain.
    pub fn bottom_r(&self) -> f64 {
        self.bottom_r_grid_number as f64 * self.r_cell_size
    }

    /// Physical longitude of the tile's left edge in the global domain.
    pub fn left_z(&self) -> f64 {
        self.left_z_grid_number as f64 * self.z_cell_size
    }
}

/// Volume of the cylindrical shell around node `i`:
/// `( π (dr(i+0.5))² − π (dr(i−0.5))² ) dz`.
pub fn cell_volume(i: usize, dr: f64, dz: f64) -> f64 {
    PI * dz * dr * dr * 2.0 * i as f64
}

/// Volume of the cylindrical ring with the inner cylinder at `r1` cut out.
pub fn cyl_rng_vol(z: f64, r1: f64, r2: f64) -> f64 {
    PI * z * (r2 * r2 - r1 * r1)
}

/// Volume of the on-axis cylinder.
pub fn cyl_vol(z: f64, r: f64) -> f64 {
    PI * z * r * r / 4.
}

/// Cell number along one axis for a coordinate.
///
/// A coordinate exactly on a cell boundary belongs to the lower cell;
/// callers reconcile boundary ties against the old position.
pub fn cell_number(position: f64, delta: f64) -> isize {
    (position / delta).ceil() as isize - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry::new(
            0.6,
            1.2,
            10,
            20,
            11,
            31,
            0.01,
            0.01,
            0.01,
            0.01,
            0.01,
            [true, true, true, true],
        )
        .unwrap()
    }

    #[test]
    fn constructor() {
        let geometry = geometry();

        assert_eq!(geometry.r_grid_amount, 10);
        assert_eq!(geometry.z_grid_amount, 20);

        assert_eq!(geometry.r_cell_size, 0.06);
        assert_eq!(geometry.z_cell_size, 0.06);

        for i in 1..4 {
            assert_eq!(geometry.pml_length[i], 0.01);
        }
        for i in 0..2 {
            assert_eq!(geometry.pml_sigma[i], 0.01);
        }

        assert!(!geometry.is_near_z_axis);
    }

    #[test]
    fn axis_proximity_follows_bottom_offset() {
        let g = Geometry::new(0.1, 0.1, 0, 4, 0, 4, 0., 0., 0., 0., 0., [false; 4]).unwrap();
        assert!(g.is_near_z_axis);
    }

    #[test]
    fn oversized_pml_is_a_config_error() {
        let res = Geometry::new(0.1, 0.1, 0, 4, 0, 4, 0.5, 0., 0., 1., 1., [false; 4]);
        assert!(res.is_err());
    }

    #[test]
    fn cell_number_examples() {
        // example from the deposition weighting: dr = 0.5, r = 0.4 -> cell 0
        assert_eq!(cell_number(0.4, 0.5), 0);
        assert_eq!(cell_number(0.6, 0.5), 1);
        // boundary belongs to the lower cell
        assert_eq!(cell_number(0.5, 0.5), 0);
        assert_eq!(cell_number(1.0, 0.5), 1);
    }

    #[test]
    fn cell_volumes() {
        let dr = 0.1;
        let dz = 0.2;

        assert_eq!(cell_volume(0, dr, dz), 0.);
        assert!((cell_volume(3, dr, dz) - PI * dz * dr * dr * 6.).abs() < 1e-15);
        assert!((cyl_rng_vol(1., 1., 2.) - PI * 3.).abs() < 1e-12);
        assert!((cyl_vol(1., 2.) - PI).abs() < 1e-12);
    }
}
