//! Cophylogenetic reconciliation under the Duplication-Transfer-Loss model.
//!
//! [`dtl::reconcile`] builds the reconciliation graph of an [`Instance`];
//! everything else reads that graph.

pub mod cluster;
pub mod config;
pub mod diameter;
pub mod dtl;
pub mod error;
pub mod graph;
pub mod histogram;
pub mod input;
pub mod median;
pub mod pvalue;
pub mod sif;
pub mod support;
pub mod tree;

pub use config::{ClusterConfig, Config, CostParams, MonteCarloConfig, PdvOptions, Scorer, SplitMode};
pub use dtl::{reconcile, reconcile_with_cancel, Reconciliation};
pub use error::{ReconError, Result};
pub use graph::{Event, EventKind, MappingNode, Mpr, MprSampler, ReconGraph};
pub use histogram::{Density, Histogram};
pub use input::Instance;
pub use tree::RecTree;
