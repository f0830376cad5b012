//! Common test utilities for codegraph-pta
//!
//! Scene fixtures and domain-specific assertions shared by the integration
//! tests.

#![allow(dead_code)]

mod assertions;
mod builders;

pub use assertions::*;
pub use builders::*;
