//! Finite-element stress analysis of a rectangular plane-stress domain with a
//! polygonal cut-out.
//!
//! The domain is rasterized into a regular `nely x nelx` grid of bilinear
//! quads; cells inside the hole boundary are void and carry no stiffness.
//! [`analyze`] returns the peak element stress under a distributed deck load
//! together with the remaining solid area.

pub mod analysis;
pub mod boundary;
pub mod config;
pub mod datatypes;
pub mod dofs;
pub mod element;
pub mod error;
pub mod mesher;
pub mod post_processor;
pub mod solver;
pub mod stress;

pub use analysis::analyze;
pub use config::{AnalysisConfig, SolverKind, SupportPolicy};
pub use datatypes::{AnalysisReport, Edge};
pub use error::{FeaError, Result};
