//! Context-sensitive points-to analysis
//!
//! - `domain`: contexts, PAG, function templates, points-to sets
//! - `infrastructure`: PAG builder and propagation solver
//! - `application`: `PointerAnalysis` facade (run + queries)

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{PointerAnalysis, PtaStats, TypeDiff, ValueRef};
