//! Shared IR models consumed by call-graph and points-to analyses

pub mod builder;
pub mod cfg;
pub mod ir;
pub mod scene;

pub use builder::{MethodBuilder, SceneBuilder, THIS_LOCAL};
pub use cfg::{BasicBlock, Cfg, Method, StmtRef};
pub use ir::{
    Constant, FieldSignature, InvokeExpr, Local, MethodSignature, Stmt, Type, Value,
    ARRAY_ELEMENT_FIELD,
};
pub use scene::{Class, Scene, SceneData};
