//! Call graph feature
//!
//! - `domain`: functions, call sites, call graph
//! - `ports`: resolution strategy trait
//! - `infrastructure`: CHA / RTA and the direct builder

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{CallGraph, CallGraphNodeKind, CallSiteID, FuncID};
pub use infrastructure::{build_call_graph, default_entries};
pub use ports::CallGraphAlgorithm;
