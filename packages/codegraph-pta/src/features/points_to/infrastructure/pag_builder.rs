//! PAG construction
//!
//! Translates method bodies into per-function templates (`FuncPag`), then
//! instantiates each template once per reachable (context, function) pair and
//! wires call edges between caller and callee instances:
//!
//! ```text
//!   arg_i  --Copy-->  param_i        (callee context)
//!   ret    --Copy-->  result local   (caller context)
//!   recv   --This-->  this           (callee context)
//! ```
//!
//! Dynamic call sites (virtual and function-pointer calls) are indexed by their
//! base node; the solver reports newly discovered pointees through
//! [`PagBuilder::add_dynamic_call_edge`]. Every mutating operation returns the
//! source nodes of newly created edges so the solver can propagate along them.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, warn};

use crate::errors::{PtaError, Result};
use crate::features::call_graph::domain::{CallGraph, CallSiteID, DynCallKind, FuncID};
use crate::features::call_graph::infrastructure::node_kind;
use crate::features::points_to::domain::{
    ContextCache, ContextID, FuncPag, NodeID, Pag, PagEdgeKind, PagValue, TemplateNode,
    EMPTY_CONTEXT,
};
use crate::shared::models::{
    InvokeExpr, Local, Method, MethodSignature, Scene, Stmt, StmtRef, Type, Value,
    ARRAY_ELEMENT_FIELD,
};

/// Bindings for one caller-instance / callee-instance pair
struct CallBinding<'b> {
    caller_ctx: ContextID,
    caller: FuncID,
    callee_ctx: ContextID,
    callee: FuncID,
    args: &'b [Value],
    result: Option<&'b Local>,
    /// Node flowing into the callee's `this`
    receiver: Option<NodeID>,
    /// Fail when the callee has no receiver assignment
    require_this: bool,
}

/// Split `f.call(t, a..)` / `f.apply(t, arr)` into receiver and arguments
fn reflective_call_args(name: &str, args: &[Value]) -> Option<(Option<Local>, Vec<Value>)> {
    let this_arg = args.first().and_then(Value::as_local).cloned();
    match name {
        "call" => Some((this_arg, args.iter().skip(1).cloned().collect())),
        // Array spreading is not modelled; only the receiver is bound
        "apply" => Some((this_arg, Vec::new())),
        _ => None,
    }
}

pub struct PagBuilder<'a> {
    scene: &'a Scene,
    contexts: ContextCache,
    func_pags: FxHashMap<FuncID, FuncPag>,
    handled: FxHashSet<(ContextID, FuncID)>,
    reachable: VecDeque<(ContextID, FuncID)>,
    dyn_sites_by_base: FxHashMap<NodeID, Vec<(ContextID, CallSiteID)>>,
    new_dyn_bases: Vec<NodeID>,
    sdk_objects: usize,
}

impl<'a> PagBuilder<'a> {
    pub fn new(scene: &'a Scene, k_limit: usize) -> Result<Self> {
        Ok(Self {
            scene,
            contexts: ContextCache::new(k_limit)?,
            func_pags: FxHashMap::default(),
            handled: FxHashSet::default(),
            reachable: VecDeque::new(),
            dyn_sites_by_base: FxHashMap::default(),
            new_dyn_bases: Vec::new(),
            sdk_objects: 0,
        })
    }

    pub fn contexts(&self) -> &ContextCache {
        &self.contexts
    }

    pub fn func_pag(&self, func: FuncID) -> Option<&FuncPag> {
        self.func_pags.get(&func)
    }

    /// Instantiated (context, function) pairs
    pub fn reachable_count(&self) -> usize {
        self.handled.len()
    }

    pub fn is_handled(&self, ctx: ContextID, func: FuncID) -> bool {
        self.handled.contains(&(ctx, func))
    }

    pub fn sdk_object_count(&self) -> usize {
        self.sdk_objects
    }

    #[inline]
    pub fn is_dyn_base(&self, node: NodeID) -> bool {
        self.dyn_sites_by_base.contains_key(&node)
    }

    /// Base nodes of dynamic call sites registered since the last call
    pub fn take_new_dyn_bases(&mut self) -> Vec<NodeID> {
        std::mem::take(&mut self.new_dyn_bases)
    }

    pub fn has_pending(&self) -> bool {
        !self.reachable.is_empty() || !self.new_dyn_bases.is_empty()
    }

    /// Register an analysis root in the empty context
    pub fn add_entry(&mut self, cg: &mut CallGraph, entry: &MethodSignature) -> Option<FuncID> {
        if self.scene.method(entry).is_none() {
            warn!("Entry {} not found in scene", entry);
            return None;
        }
        let func = cg.add_node(entry, node_kind(self.scene, entry));
        self.reachable.push_back((EMPTY_CONTEXT, func));
        Some(func)
    }

    /// Instantiate everything queued as reachable
    pub fn handle_reachable(&mut self, pag: &mut Pag, cg: &mut CallGraph) -> Result<Vec<NodeID>> {
        let mut changed = Vec::new();
        while let Some((ctx, func)) = self.reachable.pop_front() {
            changed.extend(self.instantiate(ctx, func, pag, cg)?);
        }
        Ok(changed)
    }

    fn method_of(&self, cg: &CallGraph, func: FuncID) -> Result<&'a Method> {
        let scene: &'a Scene = self.scene;
        let sig = cg.method(func).ok_or(PtaError::UnknownFunction(func))?;
        scene
            .method(sig)
            .ok_or_else(|| PtaError::missing_callee(format!("f{}", func), sig))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Templates
    // ═══════════════════════════════════════════════════════════════════════

    /// Build the template of `func` if not built yet
    pub fn build_func_pag(&mut self, func: FuncID, cg: &mut CallGraph) -> Result<()> {
        if self.func_pags.contains_key(&func) {
            return Ok(());
        }
        let method = self.method_of(cg, func)?;
        let mut fpag = FuncPag::new(func, method.signature.clone());
        if let Some(body) = &method.body {
            for (index, stmt) in body.stmts() {
                self.translate_stmt(&mut fpag, method, index, stmt, cg)?;
            }
        }
        debug!(
            "FuncPag {} built: {} edges, {} calls, {} dynamic calls",
            method.signature,
            fpag.edge_count(),
            fpag.call_sites.len(),
            fpag.dyn_call_sites.len()
        );
        self.func_pags.insert(func, fpag);
        Ok(())
    }

    fn translate_stmt(
        &mut self,
        fpag: &mut FuncPag,
        method: &Method,
        index: usize,
        stmt: &Stmt,
        cg: &mut CallGraph,
    ) -> Result<()> {
        let func = fpag.func;
        match stmt {
            Stmt::Assign { lhs, rhs } => self.translate_assign(fpag, index, lhs, rhs),
            Stmt::AssignInvoke { lhs, invoke } => {
                self.translate_invoke(fpag, method, index, invoke, Some(lhs), cg)
            }
            Stmt::Invoke(invoke) => self.translate_invoke(fpag, method, index, invoke, None, cg),
            Stmt::Return(Some(Value::Local(local))) => {
                let ret = TemplateNode::new(PagValue::Return { func }, method.return_type.clone());
                fpag.add_edge(TemplateNode::local(func, local), ret, PagEdgeKind::Copy, index);
                Ok(())
            }
            Stmt::Return(Some(Value::Constant(_))) | Stmt::Return(None) | Stmt::Nop => Ok(()),
            Stmt::Return(Some(other)) => {
                error!("Malformed return in {}: {}", method.signature, other);
                Err(PtaError::MalformedReturn {
                    method: method.signature.to_string(),
                    value: other.to_string(),
                })
            }
        }
    }

    fn translate_assign(&self, fpag: &mut FuncPag, index: usize, lhs: &Value, rhs: &Value) -> Result<()> {
        let func = fpag.func;
        match lhs {
            Value::Local(l) => {
                let dst = TemplateNode::local(func, l);
                let (src, kind) = match rhs {
                    Value::Local(r) => (TemplateNode::local(func, r), PagEdgeKind::Copy),
                    Value::Cast { op, .. } => (TemplateNode::local(func, op), PagEdgeKind::Copy),
                    Value::New { class } => (
                        TemplateNode::new(PagValue::Alloc { func, stmt: index }, Type::class(class.as_str())),
                        PagEdgeKind::Address,
                    ),
                    Value::NewArray { elem } => (
                        TemplateNode::new(
                            PagValue::Alloc { func, stmt: index },
                            Type::Array(Box::new(elem.clone())),
                        ),
                        PagEdgeKind::Address,
                    ),
                    Value::InstanceField { base, field } => {
                        (TemplateNode::field_ref(func, base, &field.name), PagEdgeKind::Load)
                    }
                    Value::ArrayElement { base } => (
                        TemplateNode::field_ref(func, base, ARRAY_ELEMENT_FIELD),
                        PagEdgeKind::Load,
                    ),
                    Value::StaticField { field } => (
                        TemplateNode::new(PagValue::StaticField { field: field.clone() }, Type::Unknown),
                        PagEdgeKind::Copy,
                    ),
                    Value::Parameter { index: i, ty } => (
                        TemplateNode::new(PagValue::Param { func, index: *i }, ty.clone()),
                        PagEdgeKind::Copy,
                    ),
                    Value::This { ty } => {
                        fpag.this_local = Some(l.clone());
                        (TemplateNode::new(PagValue::This { func }, ty.clone()), PagEdgeKind::Copy)
                    }
                    Value::FunctionRef(target) => (
                        TemplateNode::new(
                            PagValue::FuncObject {
                                method: target.clone(),
                            },
                            Type::Function(target.clone()),
                        ),
                        PagEdgeKind::Address,
                    ),
                    Value::Constant(_) => return Ok(()),
                };
                fpag.add_edge(src, dst, kind, index);
                Ok(())
            }
            Value::InstanceField { base, field } => {
                let dst = TemplateNode::field_ref(func, base, &field.name);
                self.translate_store(fpag, index, dst, PagEdgeKind::Write, rhs)
            }
            Value::ArrayElement { base } => {
                let dst = TemplateNode::field_ref(func, base, ARRAY_ELEMENT_FIELD);
                self.translate_store(fpag, index, dst, PagEdgeKind::Write, rhs)
            }
            Value::StaticField { field } => {
                let dst = TemplateNode::new(PagValue::StaticField { field: field.clone() }, Type::Unknown);
                self.translate_store(fpag, index, dst, PagEdgeKind::Copy, rhs)
            }
            other => {
                error!("Unsupported assignment target: {}", other);
                Err(PtaError::unsupported_value(format!("{} ({})", other, other.kind_name())))
            }
        }
    }

    fn translate_store(
        &self,
        fpag: &mut FuncPag,
        index: usize,
        dst: TemplateNode,
        kind: PagEdgeKind,
        rhs: &Value,
    ) -> Result<()> {
        match rhs {
            Value::Local(src) => {
                fpag.add_edge(TemplateNode::local(fpag.func, src), dst, kind, index);
                Ok(())
            }
            Value::Constant(_) => Ok(()),
            other => {
                error!("Unsupported stored value: {}", other);
                Err(PtaError::unsupported_value(format!("{} ({})", other, other.kind_name())))
            }
        }
    }

    fn translate_invoke(
        &mut self,
        fpag: &mut FuncPag,
        method: &Method,
        index: usize,
        invoke: &InvokeExpr,
        result: Option<&Local>,
        cg: &mut CallGraph,
    ) -> Result<()> {
        let func = fpag.func;
        let stmt = StmtRef::new(method.signature.clone(), index);
        match invoke {
            InvokeExpr::Static { method: callee, args }
            | InvokeExpr::Special {
                method: callee,
                args,
                ..
            } => {
                if self.scene.method(callee).is_none() {
                    error!("Call at {} targets {}, which is not in the scene", stmt, callee);
                    return Err(PtaError::missing_callee(&stmt, callee));
                }
                let callee_id = cg.add_node(callee, node_kind(self.scene, callee));
                let cs = cg.add_call_site(
                    stmt,
                    func,
                    callee_id,
                    args.clone(),
                    invoke.base().cloned(),
                    result.cloned(),
                );
                fpag.call_sites.push(cs);
            }
            InvokeExpr::Instance { base, method: callee, args } if base.ty.is_function() => {
                if callee.name == "bind" {
                    if let Some(lhs) = result {
                        fpag.add_edge(
                            TemplateNode::local(func, base),
                            TemplateNode::local(func, lhs),
                            PagEdgeKind::Copy,
                            index,
                        );
                    }
                    return Ok(());
                }
                match reflective_call_args(&callee.name, args) {
                    Some((this_arg, call_args)) => {
                        let cs = cg.add_dyn_call_site(
                            stmt,
                            func,
                            base.clone(),
                            DynCallKind::Pointer { this_arg },
                            call_args,
                            result.cloned(),
                        );
                        fpag.dyn_call_sites.push(cs);
                    }
                    None => warn!("Unsupported call {} on function value at {}", callee.name, stmt),
                }
            }
            InvokeExpr::Instance { base, method: callee, args } => {
                let cs = cg.add_dyn_call_site(
                    stmt,
                    func,
                    base.clone(),
                    DynCallKind::Virtual {
                        method_name: callee.name.clone(),
                    },
                    args.clone(),
                    result.cloned(),
                );
                fpag.dyn_call_sites.push(cs);
            }
            InvokeExpr::Pointer { ptr, args } => {
                let cs = cg.add_dyn_call_site(
                    stmt,
                    func,
                    ptr.clone(),
                    DynCallKind::Pointer { this_arg: None },
                    args.clone(),
                    result.cloned(),
                );
                fpag.dyn_call_sites.push(cs);
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Instantiation
    // ═══════════════════════════════════════════════════════════════════════

    fn instantiate_node(pag: &mut Pag, ctx: ContextID, node: &TemplateNode) -> NodeID {
        let ctx = if node.value.is_context_insensitive() {
            EMPTY_CONTEXT
        } else {
            ctx
        };
        match &node.base {
            Some(base) => {
                let base_id = Self::instantiate_node(pag, ctx, base);
                pag.get_or_new_field_node(ctx, node.value.clone(), node.ty.clone(), base_id)
            }
            None => pag.get_or_new_node(ctx, node.value.clone(), node.ty.clone()),
        }
    }

    /// Instantiate `func` in `ctx` (once per pair)
    pub fn instantiate(
        &mut self,
        ctx: ContextID,
        func: FuncID,
        pag: &mut Pag,
        cg: &mut CallGraph,
    ) -> Result<Vec<NodeID>> {
        if !self.handled.insert((ctx, func)) {
            return Ok(Vec::new());
        }
        self.build_func_pag(func, cg)?;
        let Some(fpag) = self.func_pags.get(&func).cloned() else {
            return Ok(Vec::new());
        };

        let mut changed = Vec::new();
        for edge in &fpag.edges {
            let src = Self::instantiate_node(pag, ctx, &edge.src);
            let dst = Self::instantiate_node(pag, ctx, &edge.dst);
            if pag.add_edge(src, dst, edge.kind) {
                changed.push(src);
                // Field edges are resolved from their base's points-to set
                let field = match edge.kind {
                    PagEdgeKind::Load => Some(src),
                    PagEdgeKind::Write => Some(dst),
                    _ => None,
                };
                if let Some(base) = field.and_then(|f| pag.node(f)).and_then(|n| n.field_base) {
                    changed.push(base);
                }
            }
        }

        for &cs in &fpag.call_sites {
            changed.extend(self.process_call_site(ctx, cs, pag, cg)?);
        }

        for &cs in &fpag.dyn_call_sites {
            let Some(site) = cg.dyn_call_site(cs) else {
                continue;
            };
            let base = Self::instantiate_node(pag, ctx, &TemplateNode::local(func, &site.base));
            let sites = self.dyn_sites_by_base.entry(base).or_default();
            if !sites.contains(&(ctx, cs)) {
                sites.push((ctx, cs));
            }
            self.new_dyn_bases.push(base);
        }

        debug!(
            "Instantiated f{} in context {}: {} nodes total",
            func,
            self.contexts.get(ctx).map(|c| c.to_string()).unwrap_or_default(),
            pag.node_count()
        );
        Ok(changed)
    }

    /// Wire a statically resolved call site for a caller instance
    fn process_call_site(
        &mut self,
        caller_ctx: ContextID,
        cs_id: CallSiteID,
        pag: &mut Pag,
        cg: &mut CallGraph,
    ) -> Result<Vec<NodeID>> {
        let scene: &'a Scene = self.scene;
        let Some(cs) = cg.call_site(cs_id).cloned() else {
            return Ok(Vec::new());
        };
        let callee_sig = cg
            .method(cs.callee)
            .cloned()
            .ok_or(PtaError::UnknownFunction(cs.callee))?;
        let Some(callee) = scene.method(&callee_sig) else {
            error!("Call site {} references unknown callee {}", cs.stmt, callee_sig);
            return Err(PtaError::missing_callee(&cs.stmt, &callee_sig));
        };

        cg.add_direct_edge(cs.caller, cs.callee, cs.id);

        if self.scene.is_sdk_method(&callee_sig) {
            return Ok(self.handle_sdk_call(caller_ctx, cs.caller, callee, cs.result.as_ref(), pag));
        }
        if callee.body.is_none() {
            error!("Call site {} targets {}, which has no body", cs.stmt, callee_sig);
            return Err(PtaError::missing_callee(&cs.stmt, &callee_sig));
        }

        let callee_ctx = self.contexts.derive(caller_ctx, cs.id);
        self.build_func_pag(cs.callee, cg)?;
        self.reachable.push_back((callee_ctx, cs.callee));

        let receiver = cs.receiver.as_ref().map(|r| {
            Self::instantiate_node(pag, caller_ctx, &TemplateNode::local(cs.caller, r))
        });
        self.add_call_edges(
            pag,
            CallBinding {
                caller_ctx,
                caller: cs.caller,
                callee_ctx,
                callee: cs.callee,
                args: &cs.args,
                result: cs.result.as_ref(),
                receiver,
                require_this: receiver.is_some(),
            },
        )
    }

    /// Fabricate the return object of an SDK call
    ///
    /// One object per (SDK method, caller context), only for class return types.
    fn handle_sdk_call(
        &mut self,
        caller_ctx: ContextID,
        caller: FuncID,
        callee: &Method,
        result: Option<&Local>,
        pag: &mut Pag,
    ) -> Vec<NodeID> {
        let Some(lhs) = result else {
            return Vec::new();
        };
        let Some(class) = callee.return_type.class_name() else {
            return Vec::new();
        };
        let value = PagValue::SdkObject {
            method: callee.signature.clone(),
        };
        if pag.node_id(caller_ctx, &value).is_none() {
            self.sdk_objects += 1;
            debug!("Fabricating SDK object for {} in context {}", callee.signature, caller_ctx);
        }
        let obj = pag.get_or_new_node(caller_ctx, value, Type::class(class));
        let dst = Self::instantiate_node(pag, caller_ctx, &TemplateNode::local(caller, lhs));
        if pag.add_edge(obj, dst, PagEdgeKind::Address) {
            vec![obj]
        } else {
            Vec::new()
        }
    }

    fn add_call_edges(&mut self, pag: &mut Pag, binding: CallBinding<'_>) -> Result<Vec<NodeID>> {
        let mut changed = Vec::new();

        for (i, arg) in binding.args.iter().enumerate() {
            match arg {
                Value::Local(local) => {
                    let src = Self::instantiate_node(
                        pag,
                        binding.caller_ctx,
                        &TemplateNode::local(binding.caller, local),
                    );
                    let dst = pag.get_or_new_node(
                        binding.callee_ctx,
                        PagValue::Param {
                            func: binding.callee,
                            index: i,
                        },
                        local.ty.clone(),
                    );
                    if pag.add_edge(src, dst, PagEdgeKind::Copy) {
                        changed.push(src);
                    }
                }
                Value::Constant(_) => {}
                other => {
                    error!("Unsupported call argument: {}", other);
                    return Err(PtaError::unsupported_value(format!(
                        "{} ({})",
                        other,
                        other.kind_name()
                    )));
                }
            }
        }

        if let Some(lhs) = binding.result {
            let ret = pag.get_or_new_node(
                binding.callee_ctx,
                PagValue::Return {
                    func: binding.callee,
                },
                Type::Unknown,
            );
            let dst = Self::instantiate_node(
                pag,
                binding.caller_ctx,
                &TemplateNode::local(binding.caller, lhs),
            );
            if pag.add_edge(ret, dst, PagEdgeKind::Copy) {
                changed.push(ret);
            }
        }

        if let Some(receiver) = binding.receiver {
            let has_this = self
                .func_pags
                .get(&binding.callee)
                .map_or(false, |f| f.this_local.is_some());
            if has_this {
                let this = pag.get_or_new_this_node(binding.callee_ctx, binding.callee, Type::Unknown);
                if pag.add_edge(receiver, this, PagEdgeKind::This) {
                    changed.push(receiver);
                }
            } else if binding.require_this {
                let method = self
                    .func_pags
                    .get(&binding.callee)
                    .map(|f| f.method.to_string())
                    .unwrap_or_else(|| format!("f{}", binding.callee));
                error!("Method {} has no receiver assignment", method);
                return Err(PtaError::MissingThisAssignment { method });
            }
        }

        Ok(changed)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Dynamic calls
    // ═══════════════════════════════════════════════════════════════════════

    /// Resolve every dynamic call site on `base` against the new pointee `obj`
    pub fn add_dynamic_call_edge(
        &mut self,
        base: NodeID,
        obj: NodeID,
        pag: &mut Pag,
        cg: &mut CallGraph,
    ) -> Result<Vec<NodeID>> {
        let scene: &'a Scene = self.scene;
        let Some(sites) = self.dyn_sites_by_base.get(&base).cloned() else {
            return Ok(Vec::new());
        };
        let Some(obj_node) = pag.node(obj).cloned() else {
            return Ok(Vec::new());
        };

        let mut changed = Vec::new();
        for (ctx, cs_id) in sites {
            let Some(site) = cg.dyn_call_site(cs_id).cloned() else {
                continue;
            };

            // (target, receiver node, arguments, receiver required)
            let resolved = match (&site.kind, &obj_node.value) {
                (DynCallKind::Virtual { method_name }, PagValue::FuncObject { method }) => {
                    match reflective_call_args(method_name, &site.args) {
                        Some((this_arg, args)) => {
                            let receiver = this_arg.map(|t| {
                                Self::instantiate_node(pag, ctx, &TemplateNode::local(site.caller, &t))
                            });
                            (method.clone(), receiver, args, false)
                        }
                        None => {
                            warn!("Unsupported call {} on function object {}", method_name, method);
                            continue;
                        }
                    }
                }
                (DynCallKind::Virtual { method_name }, _) => {
                    let Some(class) = obj_node.ty.class_name() else {
                        warn!(
                            "Cannot dispatch {} on object {} without class type",
                            method_name, obj
                        );
                        continue;
                    };
                    let Some(target) = self.scene.find_method_in_hierarchy(class, method_name) else {
                        warn!("No method {} in hierarchy of {}", method_name, class);
                        continue;
                    };
                    (target.clone(), Some(obj), site.args.clone(), true)
                }
                (DynCallKind::Pointer { this_arg }, PagValue::FuncObject { method }) => {
                    let receiver = this_arg.as_ref().map(|t| {
                        Self::instantiate_node(pag, ctx, &TemplateNode::local(site.caller, t))
                    });
                    (method.clone(), receiver, site.args.clone(), false)
                }
                (DynCallKind::Pointer { .. }, _) => {
                    debug!("Object {} reaching function pointer is not a function", obj);
                    continue;
                }
            };
            let (target_sig, receiver, args, require_this) = resolved;

            let Some(target) = scene.method(&target_sig) else {
                warn!("Resolved target {} not found in scene", target_sig);
                continue;
            };
            let callee = cg.add_node(&target_sig, node_kind(self.scene, &target_sig));
            if cg.add_dynamic_edge(site.caller, callee, cs_id) {
                debug!("New dynamic call edge {} -> {} at {}", site.stmt, target_sig, cs_id);
            }

            if self.scene.is_sdk_method(&target_sig) {
                changed.extend(self.handle_sdk_call(ctx, site.caller, target, site.result.as_ref(), pag));
                continue;
            }
            if target.body.is_none() {
                debug!("Callee {} has no body, call skipped", target_sig);
                continue;
            }

            let callee_ctx = self.contexts.derive(ctx, cs_id);
            self.build_func_pag(callee, cg)?;
            if !self.handled.contains(&(callee_ctx, callee)) {
                self.reachable.push_back((callee_ctx, callee));
            }
            changed.extend(self.add_call_edges(
                pag,
                CallBinding {
                    caller_ctx: ctx,
                    caller: site.caller,
                    callee_ctx,
                    callee,
                    args: &args,
                    result: site.result.as_ref(),
                    receiver,
                    require_this,
                },
            )?);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{MethodBuilder, SceneBuilder};

    fn sig(text: &str) -> MethodSignature {
        MethodSignature::parse(text).unwrap()
    }

    fn scene() -> Scene {
        let callee = MethodBuilder::instance("A", "get")
            .load("v", "this", "f")
            .ret("v")
            .build();
        let main = MethodBuilder::static_fn("Main", "main")
            .new_obj("a", "A")
            .assign("b", "a")
            .store("b", "f", "a")
            .call_virtual(Some("r"), "a", "get", &[])
            .ret("r")
            .build();
        SceneBuilder::new()
            .class("Main", None)
            .class("A", None)
            .field("A", "f")
            .method(callee)
            .method(main)
            .build()
    }

    #[test]
    fn test_func_pag_edge_kinds() {
        let scene = scene();
        let mut cg = CallGraph::new();
        let mut builder = PagBuilder::new(&scene, 1).unwrap();
        let func = builder.add_entry(&mut cg, &sig("Main.main")).unwrap();
        builder.build_func_pag(func, &mut cg).unwrap();

        let fpag = builder.func_pag(func).unwrap();
        let kinds: Vec<PagEdgeKind> = fpag.edges.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PagEdgeKind::Address,
                PagEdgeKind::Copy,
                PagEdgeKind::Write,
                PagEdgeKind::Copy
            ]
        );
        // the virtual call is deferred
        assert!(fpag.call_sites.is_empty());
        assert_eq!(fpag.dyn_call_sites.len(), 1);
        assert!(fpag.this_local.is_none());
    }

    #[test]
    fn test_instantiate_once_per_context() {
        let scene = scene();
        let mut cg = CallGraph::new();
        let mut pag = Pag::new();
        let mut builder = PagBuilder::new(&scene, 1).unwrap();
        builder.add_entry(&mut cg, &sig("Main.main"));

        let changed = builder.handle_reachable(&mut pag, &mut cg).unwrap();
        assert!(!changed.is_empty());
        let edges = pag.edge_count();
        let func = cg.func_id(&sig("Main.main")).unwrap();
        assert!(builder.is_handled(EMPTY_CONTEXT, func));
        assert!(builder.instantiate(EMPTY_CONTEXT, func, &mut pag, &mut cg).unwrap().is_empty());
        assert_eq!(pag.edge_count(), edges);

        let bases = builder.take_new_dyn_bases();
        assert_eq!(bases.len(), 1);
        assert!(builder.is_dyn_base(bases[0]));
        assert!(!builder.has_pending());
    }

    #[test]
    fn test_dynamic_edge_wires_receiver_and_result() {
        let scene = scene();
        let mut cg = CallGraph::new();
        let mut pag = Pag::new();
        let mut builder = PagBuilder::new(&scene, 1).unwrap();
        builder.add_entry(&mut cg, &sig("Main.main"));
        builder.handle_reachable(&mut pag, &mut cg).unwrap();

        let main = cg.func_id(&sig("Main.main")).unwrap();
        let base = builder.take_new_dyn_bases()[0];
        let obj = pag.node_id(EMPTY_CONTEXT, &PagValue::Alloc { func: main, stmt: 0 }).unwrap();

        let changed = builder.add_dynamic_call_edge(base, obj, &mut pag, &mut cg).unwrap();
        assert!(changed.contains(&obj));
        assert_eq!(cg.dynamic_edge_count(), 1);
        assert!(builder.has_pending());

        builder.handle_reachable(&mut pag, &mut cg).unwrap();
        let get = cg.func_id(&sig("A.get")).unwrap();
        assert_eq!(builder.reachable_count(), 2);
        assert_eq!(pag.nodes_of_value(&PagValue::This { func: get }).len(), 1);
    }

    #[test]
    fn test_static_call_outside_scene_fails_translation() {
        let main = MethodBuilder::static_fn("Main", "main")
            .call_static(None, sig("Gone.fn"), &[])
            .ret_void()
            .build();
        let scene = SceneBuilder::new().class("Main", None).method(main).build();
        let mut cg = CallGraph::new();
        let mut builder = PagBuilder::new(&scene, 1).unwrap();
        let func = builder.add_entry(&mut cg, &sig("Main.main")).unwrap();

        let err = builder.build_func_pag(func, &mut cg).unwrap_err();
        match err {
            PtaError::MissingCallee { callee, .. } => assert_eq!(callee, "Gone.fn"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(builder.func_pag(func).is_none());
    }

    #[test]
    fn test_static_call_into_declaration_fails_wiring() {
        let decl = MethodBuilder::static_fn("Lib", "helper").declaration().build();
        let main = MethodBuilder::static_fn("Main", "main")
            .call_static(None, sig("Lib.helper"), &[])
            .ret_void()
            .build();
        let scene = SceneBuilder::new()
            .class("Main", None)
            .class("Lib", None)
            .method(decl)
            .method(main)
            .build();
        let mut cg = CallGraph::new();
        let mut pag = Pag::new();
        let mut builder = PagBuilder::new(&scene, 1).unwrap();
        builder.add_entry(&mut cg, &sig("Main.main"));

        let err = builder.handle_reachable(&mut pag, &mut cg).unwrap_err();
        assert!(matches!(err, PtaError::MissingCallee { ref callee, .. } if callee == "Lib.helper"));
    }

    #[test]
    fn test_reflective_args() {
        let t = Value::local("t", Type::Any);
        let a = Value::local("a", Type::Any);
        let (this_arg, args) = reflective_call_args("call", &[t.clone(), a.clone()]).unwrap();
        assert_eq!(this_arg.map(|l| l.name), Some("t".to_string()));
        assert_eq!(args, vec![a.clone()]);

        let (_, args) = reflective_call_args("apply", &[t, a]).unwrap();
        assert!(args.is_empty());
        assert!(reflective_call_args("toString", &[]).is_none());
    }
}
