//! Call graph domain model

pub mod call_graph;
pub mod call_site;

pub use call_graph::{
    CallEdgeKind, CallEdgeRecord, CallGraph, CallGraphEdge, CallGraphNode, CallGraphNodeKind,
    FuncID,
};
pub use call_site::{CallSite, CallSiteID, DynCallKind, DynCallSite};
