//! Points-to domain model
//!
//! - `context`: k-limited call strings and their interning table
//! - `pag`: pointer-assignment graph
//! - `func_pag`: per-function PAG templates
//! - `pts_set` / `pts_data`: points-to sets with diff tracking

pub mod context;
pub mod func_pag;
pub mod pag;
pub mod pts_data;
pub mod pts_set;

pub use context::{Context, ContextCache, ContextElem, ContextID, EMPTY_CONTEXT};
pub use func_pag::{FuncPag, FuncPagEdge, TemplateNode};
pub use pag::{NodeID, Pag, PagEdgeKind, PagNode, PagValue};
pub use pts_data::DiffPtData;
pub use pts_set::PtsSet;
