//! Points-to infrastructure: PAG construction and the propagation solver

pub mod pag_builder;
pub mod solver;

pub use pag_builder::PagBuilder;
pub use solver::{DynUpdates, Solver, SolverStats};
