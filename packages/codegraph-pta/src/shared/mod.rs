//! Shared types used across features

pub mod models;
