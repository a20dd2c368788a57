//! 2D cylindrical (r, z) relativistic particle-in-cell plasma simulator
//! with binary Coulomb collisions.
//!
//! The crate is organized around a grid of sub-domain tiles. Each tile
//! owns its geometry, staggered E/H field grids, a current grid and the
//! macro-particles living inside it. The driver in [`simulation`]
//! advances all tiles in parallel phases, reconciling particle ownership
//! and seam overlays between phases.
#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;

pub mod collisions;
pub mod constants;
pub mod current;
pub mod domain;
pub mod field;
pub mod geometry;
pub mod grid;
pub mod migration;
pub mod output;
pub mod particle;
pub mod phys;
pub mod pusher;
pub mod settings;
pub mod simulation;
pub mod species;
pub mod vector;

pub mod errors {
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
            Json(::serde_json::Error);
        }

        errors {
            Config(reason: String) {
                description("configuration error")
                display("configuration error: {}", reason)
            }
            OutOfDomain(r: f64, z: f64) {
                description("particle left the computational domain")
                display("negative cell index for particle position [{}, {}]", r, z)
            }
            Superluminal(velocity: f64) {
                description("superluminal particle velocity")
                display("Lorentz factor is complex, velocity is: {}", velocity)
            }
            NumericUnderflow {
                description("numeric underflow in collision variance")
                display("collision variance underflowed to zero or NaN")
            }
            Output(reason: String) {
                description("output error")
                display("output error: {}", reason)
            }
        }
    }
}
