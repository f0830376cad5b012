//! Typed three-address IR consumed by the analyses
//!
//! Produced by the front end (parsing + type inference), consumed read-only by
//! call-graph construction and pointer analysis:
//! - Signatures: `MethodSignature`, `FieldSignature`
//! - Types: declared or inferred static types
//! - Values / invoke expressions / statements

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-field used for array element accesses (`a[i]`)
pub const ARRAY_ELEMENT_FIELD: &str = "[*]";

/// Method identity: declaring class + method name
///
/// Free functions live in a synthetic per-file class (e.g. `%dflt`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSignature {
    pub class: String,
    pub name: String,
}

impl MethodSignature {
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }

    /// Parse `Class.method` (the last `.` separates the method name)
    pub fn parse(text: &str) -> Option<Self> {
        let (class, name) = text.rsplit_once('.')?;
        if class.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(class, name))
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name == "constructor"
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.name)
    }
}

/// Field identity: declaring class (as seen at the access site) + field name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldSignature {
    pub class: String,
    pub name: String,
}

impl FieldSignature {
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }

    pub fn array_element() -> Self {
        Self::new("", ARRAY_ELEMENT_FIELD)
    }
}

impl fmt::Display for FieldSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.class.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.class, self.name)
        }
    }
}

/// Static type of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Class(String),
    Function(MethodSignature),
    Array(Box<Type>),
    Number,
    String,
    Boolean,
    Void,
    Any,
    Unknown,
}

impl Type {
    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    /// Class name for class types
    #[inline]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Class(name) => write!(f, "{}", name),
            Type::Function(sig) => write!(f, "fn {}", sig),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Boolean => write!(f, "boolean"),
            Type::Void => write!(f, "void"),
            Type::Any => write!(f, "any"),
            Type::Unknown => write!(f, "unknown"),
        }
    }
}

/// Method-local variable (identified by name within its method)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Local {
    pub name: String,
    pub ty: Type,
}

impl Local {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Literal constant; carries no points-to information
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    Undefined,
    Null,
    Bool(bool),
    Number(i64),
    Str(String),
}

/// Operand / expression appearing in a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Local(Local),
    Constant(Constant),
    /// `new C()` (allocation only; the constructor call is a separate `Special` invoke)
    New { class: String },
    /// `new T[n]` / array literal
    NewArray { elem: Type },
    InstanceField { base: Local, field: FieldSignature },
    StaticField { field: FieldSignature },
    ArrayElement { base: Local },
    /// Formal parameter reference (`x = parameterN`)
    Parameter { index: usize, ty: Type },
    /// Formal receiver reference (`this = this: C`)
    This { ty: Type },
    /// Function object (`f = someFunction`)
    FunctionRef(MethodSignature),
    Cast { op: Local, ty: Type },
}

impl Value {
    pub fn local(name: impl Into<String>, ty: Type) -> Self {
        Value::Local(Local::new(name, ty))
    }

    #[inline]
    pub fn as_local(&self) -> Option<&Local> {
        match self {
            Value::Local(local) => Some(local),
            _ => None,
        }
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }

    /// Short tag used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Local(_) => "local",
            Value::Constant(_) => "constant",
            Value::New { .. } => "new",
            Value::NewArray { .. } => "new-array",
            Value::InstanceField { .. } => "instance-field",
            Value::StaticField { .. } => "static-field",
            Value::ArrayElement { .. } => "array-element",
            Value::Parameter { .. } => "parameter",
            Value::This { .. } => "this",
            Value::FunctionRef(_) => "function-ref",
            Value::Cast { .. } => "cast",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(local) => write!(f, "{}", local),
            Value::Constant(c) => write!(f, "{:?}", c),
            Value::New { class } => write!(f, "new {}", class),
            Value::NewArray { elem } => write!(f, "new {}[]", elem),
            Value::InstanceField { base, field } => write!(f, "{}.{}", base, field.name),
            Value::StaticField { field } => write!(f, "{}", field),
            Value::ArrayElement { base } => write!(f, "{}[*]", base),
            Value::Parameter { index, .. } => write!(f, "parameter{}", index),
            Value::This { ty } => write!(f, "this: {}", ty),
            Value::FunctionRef(sig) => write!(f, "&{}", sig),
            Value::Cast { op, ty } => write!(f, "<{}>{}", ty, op),
        }
    }
}

/// Call expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeExpr {
    /// Statically bound call without receiver (static methods, free functions)
    Static {
        method: MethodSignature,
        args: Vec<Value>,
    },
    /// Statically bound call with receiver (constructors, `super.m()`)
    Special {
        base: Local,
        method: MethodSignature,
        args: Vec<Value>,
    },
    /// Virtual call; `method.class` is the receiver's static type
    Instance {
        base: Local,
        method: MethodSignature,
        args: Vec<Value>,
    },
    /// Call through a function-valued local
    Pointer { ptr: Local, args: Vec<Value> },
}

impl InvokeExpr {
    pub fn args(&self) -> &[Value] {
        match self {
            InvokeExpr::Static { args, .. }
            | InvokeExpr::Special { args, .. }
            | InvokeExpr::Instance { args, .. }
            | InvokeExpr::Pointer { args, .. } => args,
        }
    }

    /// Declared callee, when the expression names one
    pub fn method(&self) -> Option<&MethodSignature> {
        match self {
            InvokeExpr::Static { method, .. }
            | InvokeExpr::Special { method, .. }
            | InvokeExpr::Instance { method, .. } => Some(method),
            InvokeExpr::Pointer { .. } => None,
        }
    }

    /// Receiver (or function pointer) local
    pub fn base(&self) -> Option<&Local> {
        match self {
            InvokeExpr::Static { .. } => None,
            InvokeExpr::Special { base, .. } | InvokeExpr::Instance { base, .. } => Some(base),
            InvokeExpr::Pointer { ptr, .. } => Some(ptr),
        }
    }
}

impl fmt::Display for InvokeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args()
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self {
            InvokeExpr::Static { method, .. } => write!(f, "staticinvoke {}({})", method, args),
            InvokeExpr::Special { base, method, .. } => {
                write!(f, "specialinvoke {}.<{}>({})", base, method, args)
            }
            InvokeExpr::Instance { base, method, .. } => {
                write!(f, "instanceinvoke {}.<{}>({})", base, method, args)
            }
            InvokeExpr::Pointer { ptr, .. } => write!(f, "ptrinvoke {}({})", ptr, args),
        }
    }
}

/// IR statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Assign { lhs: Value, rhs: Value },
    AssignInvoke { lhs: Local, invoke: InvokeExpr },
    Invoke(InvokeExpr),
    Return(Option<Value>),
    Nop,
}

impl Stmt {
    #[inline]
    pub fn invoke(&self) -> Option<&InvokeExpr> {
        match self {
            Stmt::AssignInvoke { invoke, .. } | Stmt::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }

    /// Local receiving the call result, for `x = call(...)`
    #[inline]
    pub fn invoke_result(&self) -> Option<&Local> {
        match self {
            Stmt::AssignInvoke { lhs, .. } => Some(lhs),
            _ => None,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { lhs, rhs } => write!(f, "{} = {}", lhs, rhs),
            Stmt::AssignInvoke { lhs, invoke } => write!(f, "{} = {}", lhs, invoke),
            Stmt::Invoke(invoke) => write!(f, "{}", invoke),
            Stmt::Return(Some(v)) => write!(f, "return {}", v),
            Stmt::Return(None) => write!(f, "return"),
            Stmt::Nop => write!(f, "nop"),
        }
    }
}
