//! Fluent builders for assembling scenes without a front end
//!
//! ```
//! use codegraph_pta::shared::models::{MethodBuilder, SceneBuilder};
//!
//! let scene = SceneBuilder::new()
//!     .class("A", None)
//!     .method(
//!         MethodBuilder::static_fn("Main", "main")
//!             .new_obj("a", "A")
//!             .build(),
//!     )
//!     .build();
//! assert_eq!(scene.method_count(), 1);
//! ```

use rustc_hash::FxHashMap;

use super::cfg::{Cfg, Method};
use super::ir::{
    FieldSignature, InvokeExpr, Local, MethodSignature, Stmt, Type, Value,
};
use super::scene::{Class, Scene};

/// Name of the receiver local emitted for instance methods
pub const THIS_LOCAL: &str = "this";

/// Builder for [`Scene`]
#[derive(Debug, Default)]
pub struct SceneBuilder {
    scene: Scene,
    pending_methods: Vec<Method>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(self, name: &str, super_class: Option<&str>) -> Self {
        self.class_in_file(name, super_class, "")
    }

    pub fn class_in_file(mut self, name: &str, super_class: Option<&str>, file: &str) -> Self {
        let mut class = Class::new(name, super_class.map(str::to_string));
        class.file = file.to_string();
        self.scene.insert_class(class);
        self
    }

    pub fn field(mut self, class: &str, field: &str) -> Self {
        if let Some(c) = self.scene.class(class) {
            let mut c = c.clone();
            if !c.fields.iter().any(|f| f == field) {
                c.fields.push(field.to_string());
            }
            self.scene.insert_class(c);
        }
        self
    }

    pub fn sdk_path(mut self, prefix: &str) -> Self {
        self.scene.add_sdk_path(prefix);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.pending_methods.push(method);
        self
    }

    pub fn build(mut self) -> Scene {
        // Methods go in after classes so class method lists are complete
        for method in self.pending_methods.drain(..) {
            self.scene.insert_method(method);
        }
        self.scene
    }
}

/// Builder for a single-block [`Method`]
#[derive(Debug)]
pub struct MethodBuilder {
    signature: MethodSignature,
    is_static: bool,
    return_type: Type,
    sdk: bool,
    has_body: bool,
    locals: FxHashMap<String, Type>,
    stmts: Vec<Stmt>,
}

impl MethodBuilder {
    fn new(class: &str, name: &str, is_static: bool) -> Self {
        Self {
            signature: MethodSignature::new(class, name),
            is_static,
            return_type: Type::Void,
            sdk: false,
            has_body: true,
            locals: FxHashMap::default(),
            stmts: Vec::new(),
        }
    }

    /// Instance method; starts with `this = this: <class>`
    pub fn instance(class: &str, name: &str) -> Self {
        let mut builder = Self::new(class, name, false);
        let ty = Type::class(class);
        builder.locals.insert(THIS_LOCAL.to_string(), ty.clone());
        builder.stmts.push(Stmt::Assign {
            lhs: Value::local(THIS_LOCAL, ty.clone()),
            rhs: Value::This { ty },
        });
        builder
    }

    /// Static method or free function
    pub fn static_fn(class: &str, name: &str) -> Self {
        Self::new(class, name, true)
    }

    /// Instance method without the receiver assignment
    pub fn instance_without_this(class: &str, name: &str) -> Self {
        Self::new(class, name, false)
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.return_type = ty;
        self
    }

    /// Declaration only (SDK stubs, abstract methods)
    pub fn declaration(mut self) -> Self {
        self.has_body = false;
        self
    }

    pub fn sdk(mut self) -> Self {
        self.sdk = true;
        self.has_body = false;
        self
    }

    /// Declare the type of a local used later
    pub fn local(mut self, name: &str, ty: Type) -> Self {
        self.locals.insert(name.to_string(), ty);
        self
    }

    fn var(&self, name: &str) -> Local {
        let ty = self.locals.get(name).cloned().unwrap_or(Type::Any);
        Local::new(name, ty)
    }

    fn declare_if_absent(&mut self, name: &str, ty: Type) {
        self.locals.entry(name.to_string()).or_insert(ty);
    }

    fn field_of(&self, base: &Local, field: &str) -> FieldSignature {
        FieldSignature::new(base.ty.class_name().unwrap_or(""), field)
    }

    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.stmts.push(stmt);
        self
    }

    /// `name = parameter<index>`
    pub fn param(mut self, index: usize, name: &str) -> Self {
        let local = self.var(name);
        self.stmts.push(Stmt::Assign {
            rhs: Value::Parameter {
                index,
                ty: local.ty.clone(),
            },
            lhs: Value::Local(local),
        });
        self
    }

    /// `lhs = new <class>`
    pub fn new_obj(mut self, lhs: &str, class: &str) -> Self {
        self.declare_if_absent(lhs, Type::class(class));
        let local = self.var(lhs);
        self.stmts.push(Stmt::Assign {
            lhs: Value::Local(local),
            rhs: Value::New {
                class: class.to_string(),
            },
        });
        self
    }

    /// `lhs = new <elem>[]`
    pub fn new_array(mut self, lhs: &str, elem: Type) -> Self {
        self.declare_if_absent(lhs, Type::Array(Box::new(elem.clone())));
        let local = self.var(lhs);
        self.stmts.push(Stmt::Assign {
            lhs: Value::Local(local),
            rhs: Value::NewArray { elem },
        });
        self
    }

    /// `lhs = rhs`
    pub fn assign(mut self, lhs: &str, rhs: &str) -> Self {
        let (l, r) = (self.var(lhs), self.var(rhs));
        self.stmts.push(Stmt::Assign {
            lhs: Value::Local(l),
            rhs: Value::Local(r),
        });
        self
    }

    /// `lhs = <ty> op`
    pub fn cast(mut self, lhs: &str, op: &str, ty: Type) -> Self {
        self.declare_if_absent(lhs, ty.clone());
        let (l, o) = (self.var(lhs), self.var(op));
        self.stmts.push(Stmt::Assign {
            lhs: Value::Local(l),
            rhs: Value::Cast { op: o, ty },
        });
        self
    }

    /// `lhs = base.field`
    pub fn load(mut self, lhs: &str, base: &str, field: &str) -> Self {
        let base = self.var(base);
        let field = self.field_of(&base, field);
        let l = self.var(lhs);
        self.stmts.push(Stmt::Assign {
            lhs: Value::Local(l),
            rhs: Value::InstanceField { base, field },
        });
        self
    }

    /// `base.field = src`
    pub fn store(mut self, base: &str, field: &str, src: &str) -> Self {
        let base = self.var(base);
        let field = self.field_of(&base, field);
        let s = self.var(src);
        self.stmts.push(Stmt::Assign {
            lhs: Value::InstanceField { base, field },
            rhs: Value::Local(s),
        });
        self
    }

    /// `lhs = base[*]`
    pub fn load_elem(mut self, lhs: &str, base: &str) -> Self {
        let (l, b) = (self.var(lhs), self.var(base));
        self.stmts.push(Stmt::Assign {
            lhs: Value::Local(l),
            rhs: Value::ArrayElement { base: b },
        });
        self
    }

    /// `base[*] = src`
    pub fn store_elem(mut self, base: &str, src: &str) -> Self {
        let (b, s) = (self.var(base), self.var(src));
        self.stmts.push(Stmt::Assign {
            lhs: Value::ArrayElement { base: b },
            rhs: Value::Local(s),
        });
        self
    }

    /// `lhs = Class.field`
    pub fn load_static(mut self, lhs: &str, class: &str, field: &str) -> Self {
        let l = self.var(lhs);
        self.stmts.push(Stmt::Assign {
            lhs: Value::Local(l),
            rhs: Value::StaticField {
                field: FieldSignature::new(class, field),
            },
        });
        self
    }

    /// `Class.field = src`
    pub fn store_static(mut self, class: &str, field: &str, src: &str) -> Self {
        let s = self.var(src);
        self.stmts.push(Stmt::Assign {
            lhs: Value::StaticField {
                field: FieldSignature::new(class, field),
            },
            rhs: Value::Local(s),
        });
        self
    }

    /// `lhs = <function object>`
    pub fn func_ref(mut self, lhs: &str, target: MethodSignature) -> Self {
        self.declare_if_absent(lhs, Type::Function(target.clone()));
        let l = self.var(lhs);
        self.stmts.push(Stmt::Assign {
            lhs: Value::Local(l),
            rhs: Value::FunctionRef(target),
        });
        self
    }

    fn args(&self, args: &[&str]) -> Vec<Value> {
        args.iter().map(|a| Value::Local(self.var(a))).collect()
    }

    fn push_invoke(&mut self, lhs: Option<&str>, invoke: InvokeExpr) {
        match lhs {
            Some(name) => {
                let l = self.var(name);
                self.stmts.push(Stmt::AssignInvoke { lhs: l, invoke });
            }
            None => self.stmts.push(Stmt::Invoke(invoke)),
        }
    }

    pub fn call_static(mut self, lhs: Option<&str>, method: MethodSignature, args: &[&str]) -> Self {
        let invoke = InvokeExpr::Static {
            method,
            args: self.args(args),
        };
        self.push_invoke(lhs, invoke);
        self
    }

    pub fn call_special(
        mut self,
        lhs: Option<&str>,
        base: &str,
        method: MethodSignature,
        args: &[&str],
    ) -> Self {
        let invoke = InvokeExpr::Special {
            base: self.var(base),
            method,
            args: self.args(args),
        };
        self.push_invoke(lhs, invoke);
        self
    }

    /// Virtual call; the declared class is taken from the receiver's type
    pub fn call_virtual(mut self, lhs: Option<&str>, base: &str, method: &str, args: &[&str]) -> Self {
        let base = self.var(base);
        let class = match &base.ty {
            Type::Class(c) => c.clone(),
            Type::Function(_) => "Function".to_string(),
            _ => String::new(),
        };
        let invoke = InvokeExpr::Instance {
            method: MethodSignature::new(class, method),
            base,
            args: self.args(args),
        };
        self.push_invoke(lhs, invoke);
        self
    }

    pub fn call_ptr(mut self, lhs: Option<&str>, ptr: &str, args: &[&str]) -> Self {
        let invoke = InvokeExpr::Pointer {
            ptr: self.var(ptr),
            args: self.args(args),
        };
        self.push_invoke(lhs, invoke);
        self
    }

    pub fn ret(mut self, name: &str) -> Self {
        let l = self.var(name);
        self.stmts.push(Stmt::Return(Some(Value::Local(l))));
        self
    }

    pub fn ret_void(mut self) -> Self {
        self.stmts.push(Stmt::Return(None));
        self
    }

    pub fn build(self) -> Method {
        Method {
            signature: self.signature,
            is_static: self.is_static,
            return_type: self.return_type,
            body: self.has_body.then(|| Cfg::from_stmts(self.stmts)),
            sdk: self.sdk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_method_starts_with_this() {
        let method = MethodBuilder::instance("A", "m").ret(THIS_LOCAL).build();
        let body = method.body.unwrap();
        assert!(matches!(
            body.stmt(0),
            Some(Stmt::Assign { rhs: Value::This { .. }, .. })
        ));
        assert_eq!(body.stmt_count(), 2);
    }

    #[test]
    fn test_field_signature_uses_base_class() {
        let method = MethodBuilder::static_fn("Main", "main")
            .new_obj("o", "Box")
            .new_obj("v", "Item")
            .store("o", "item", "v")
            .build();
        let body = method.body.unwrap();
        match body.stmt(2) {
            Some(Stmt::Assign {
                lhs: Value::InstanceField { field, .. },
                ..
            }) => assert_eq!(field, &FieldSignature::new("Box", "item")),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_sdk_declaration_has_no_body() {
        let method = MethodBuilder::instance("Router", "push").sdk().build();
        assert!(method.sdk);
        assert!(method.body.is_none());
    }
}
