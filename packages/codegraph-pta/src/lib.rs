/*
 * Codegraph PTA - call graph and pointer analysis over an ArkTS-style IR
 *
 * Feature-First Architecture:
 * - shared/      : IR models (types, values, statements, scene)
 * - features/    : call_graph (CHA/RTA), points_to (PAG + solver)
 * - config/      : PtaConfig
 */

#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use config::{CallGraphKind, PtaConfig, MAX_K_LIMIT};
pub use errors::{PtaError, Result};
pub use features::call_graph::{build_call_graph, default_entries, CallGraph, FuncID};
pub use features::points_to::{PointerAnalysis, PtaStats, TypeDiff, ValueRef};
pub use shared::models::{MethodSignature, Scene};
