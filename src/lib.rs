//! Bioactivity prediction against *Plasmodium falciparum* dihydroorotate
//! dehydrogenase (PfDHODH).
//!
//! SMILES strings are parsed into molecular graphs, turned into hashed
//! atom-pair fingerprints and scored by a pre-trained tree-ensemble regressor.
//! Predictions come out as pIC50 and as IC50 in nanomolar.

use tracing_subscriber::EnvFilter;

mod element;
pub use element::*;

mod parse;
pub use parse::*;

mod molecule;
pub use molecule::*;

mod fingerprint;
pub use fingerprint::*;

mod error;
pub use error::*;

mod model;
pub use model::*;

mod input;
pub use input::*;

mod potency;
pub use potency::*;

mod predict;
pub use predict::*;

pub mod config;
pub mod report;
pub mod web;

pub type MoleculeGraph = petgraph::graph::UnGraph<Atom, Bond>;

/// Install a global `tracing` subscriber. `RUST_LOG` takes precedence over `level`.
/// Calling this more than once is harmless.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
