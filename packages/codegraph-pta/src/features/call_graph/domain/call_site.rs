//! Call sites registered in the call graph

use serde::Serialize;

use crate::shared::models::{Local, StmtRef, Value};

use super::call_graph::FuncID;

/// Call site identifier; also the element type of call-string contexts
pub type CallSiteID = u32;

/// Statically resolved call
#[derive(Debug, Clone, Serialize)]
pub struct CallSite {
    pub id: CallSiteID,
    pub stmt: StmtRef,
    pub caller: FuncID,
    pub callee: FuncID,
    pub args: Vec<Value>,
    /// Receiver local for constructor / super calls
    pub receiver: Option<Local>,
    /// Local receiving the result
    pub result: Option<Local>,
}

/// How a dynamic call is resolved once its base points to something
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DynCallKind {
    /// Dispatch `method_name` on the receiver object's class
    Virtual { method_name: String },
    /// Call the function object the base points to; `this_arg` becomes the receiver
    Pointer { this_arg: Option<Local> },
}

/// Call whose target depends on what its base local points to
#[derive(Debug, Clone, Serialize)]
pub struct DynCallSite {
    pub id: CallSiteID,
    pub stmt: StmtRef,
    pub caller: FuncID,
    /// Receiver (virtual) or function-valued local (pointer)
    pub base: Local,
    pub kind: DynCallKind,
    pub args: Vec<Value>,
    pub result: Option<Local>,
}
