//! Subcommand modules for the `cophy` binary.

pub mod cluster;
pub mod enumerate;
pub mod median;
pub mod pdv;
pub mod pvalue;
pub mod recon;
pub mod sample;
pub mod sif;
pub mod support;
pub mod utils;
