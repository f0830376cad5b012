//! Call graph infrastructure: CHA / RTA resolution and the direct builder

pub mod algorithms;
pub mod direct_builder;

pub use algorithms::{ClassHierarchyAnalysis, RapidTypeAnalysis};
pub use direct_builder::{build_call_graph, default_entries, node_kind, DirectCallGraphBuilder};
