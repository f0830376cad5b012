//! Vertical feature slices

pub mod call_graph;
pub mod points_to;
