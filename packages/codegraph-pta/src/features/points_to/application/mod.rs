//! Points-to application layer: the analysis facade and its diagnostics

pub mod pointer_analysis;
pub mod type_diff;

pub use pointer_analysis::{PointerAnalysis, PtaStats, ValueRef};
pub use type_diff::{detect_type_diffs, TypeDiff};
