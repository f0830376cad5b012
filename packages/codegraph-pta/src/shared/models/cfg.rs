//! Method bodies: control flow graph of basic blocks
//!
//! The analyses are flow-insensitive, so statements are addressed by their
//! position in the flattened block order (`StmtRef`).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ir::{MethodSignature, Stmt, Type};

/// Basic block: straight-line statements plus successor block indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub succs: Vec<usize>,
}

/// Control flow graph of a method body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
}

impl Cfg {
    /// Single-block body
    pub fn from_stmts(stmts: Vec<Stmt>) -> Self {
        Self {
            blocks: vec![BasicBlock {
                stmts,
                succs: Vec::new(),
            }],
        }
    }

    /// Statements in flattened block order, with their index
    pub fn stmts(&self) -> impl Iterator<Item = (usize, &Stmt)> {
        self.blocks
            .iter()
            .flat_map(|block| block.stmts.iter())
            .enumerate()
    }

    /// Statement at a flattened index
    pub fn stmt(&self, index: usize) -> Option<&Stmt> {
        self.stmts().nth(index).map(|(_, stmt)| stmt)
    }

    pub fn stmt_count(&self) -> usize {
        self.blocks.iter().map(|b| b.stmts.len()).sum()
    }
}

/// Statement address: owning method + flattened index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtRef {
    pub method: MethodSignature,
    pub index: usize,
}

impl StmtRef {
    pub fn new(method: MethodSignature, index: usize) -> Self {
        Self { method, index }
    }
}

impl fmt::Display for StmtRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.method, self.index)
    }
}

/// Method declaration with optional body
///
/// SDK declarations and abstract methods have no body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub signature: MethodSignature,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default = "default_return_type")]
    pub return_type: Type,
    #[serde(default)]
    pub body: Option<Cfg>,
    /// Declared in SDK stubs regardless of file location
    #[serde(default)]
    pub sdk: bool,
}

fn default_return_type() -> Type {
    Type::Void
}

impl Method {
    #[inline]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}
