//! Core L2T STARS orchestration modules

pub mod environment;
pub mod prior;
pub mod fusion;
pub mod brdf;
pub mod pipeline;

// Re-export main types
pub use environment::{derive_environment, Environment};
pub use prior::{complete_group, resolve_prior, Prior, PriorLayers, VariablePrior};
pub use fusion::{DataFusionRequest, FusionInvoker};
pub use brdf::{BrdfInvoker, BrdfRequest};
pub use pipeline::{run_from_runconfig, run_l2t_stars};
