//! Whole-program pointer analysis
//!
//! Drives the PAG builder and the diff-propagation solver to a fixpoint:
//!
//! ```text
//! entries -> instantiate -> [ seed -> drain -> resolve dynamic calls -> instantiate ]* -> done
//! ```
//!
//! A round ends when the worklist is empty. Dynamic call sites whose base
//! gained pointees during the round are then resolved, which may make new
//! functions reachable and add edges; the sources of those edges seed the
//! next round. The loop stops once a round adds nothing.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PtaConfig;
use crate::errors::Result;
use crate::features::call_graph::domain::CallGraph;
use crate::features::call_graph::infrastructure::default_entries;
use crate::features::points_to::domain::{
    ContextCache, DiffPtData, NodeID, Pag, PagNode, PagValue, PtsSet,
};
use crate::features::points_to::infrastructure::{DynUpdates, PagBuilder, Solver};
use crate::shared::models::{FieldSignature, MethodSignature, Scene};

use super::type_diff::{detect_type_diffs, TypeDiff};

/// Source-level value a query is about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueRef {
    Local { method: MethodSignature, name: String },
    StaticField(FieldSignature),
}

impl ValueRef {
    /// Local `name` of the method written as `Class.method`
    pub fn local(method: &str, name: &str) -> Self {
        ValueRef::Local {
            method: MethodSignature::parse(method).unwrap_or_else(|| MethodSignature::new("", method)),
            name: name.to_string(),
        }
    }

    pub fn static_field(class: &str, name: &str) -> Self {
        ValueRef::StaticField(FieldSignature::new(class, name))
    }
}

/// Run statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct PtaStats {
    pub rounds: usize,
    pub worklist_pops: usize,
    pub propagations: usize,
    pub field_edges: usize,
    pub nodes: usize,
    pub edges: usize,
    pub contexts: usize,
    pub reachable_functions: usize,
    pub call_graph_edges: usize,
    pub dynamic_edges: usize,
    pub sdk_objects: usize,
    pub duration_ms: f64,
}

pub struct PointerAnalysis<'a> {
    scene: &'a Scene,
    config: PtaConfig,
    pag: Pag,
    cg: CallGraph,
    pts: DiffPtData,
    builder: PagBuilder<'a>,
    solver: Solver,
    entries: Vec<MethodSignature>,
    type_diffs: Vec<TypeDiff>,
    stats: PtaStats,
}

impl<'a> PointerAnalysis<'a> {
    /// Create an analysis over `scene`
    ///
    /// Fails on an invalid configuration. The output directory is created up
    /// front when any dump is enabled.
    pub fn new(scene: &'a Scene, config: PtaConfig) -> Result<Self> {
        config.validate()?;
        if config.writes_output() {
            fs::create_dir_all(&config.output_dir)?;
        }
        let builder = PagBuilder::new(scene, config.k_limit)?;
        Ok(Self {
            scene,
            config,
            pag: Pag::new(),
            cg: CallGraph::new(),
            pts: DiffPtData::new(),
            builder,
            solver: Solver::new(),
            entries: Vec::new(),
            type_diffs: Vec::new(),
            stats: PtaStats::default(),
        })
    }

    /// Analysis roots; defaults to the direct call graph's entries
    pub fn with_entries(mut self, entries: Vec<MethodSignature>) -> Self {
        self.entries = entries;
        self
    }

    pub fn config(&self) -> &PtaConfig {
        &self.config
    }

    pub fn pag(&self) -> &Pag {
        &self.pag
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.cg
    }

    pub fn pts(&self) -> &DiffPtData {
        &self.pts
    }

    pub fn contexts(&self) -> &ContextCache {
        self.builder.contexts()
    }

    pub fn type_diffs(&self) -> &[TypeDiff] {
        &self.type_diffs
    }

    pub fn stats(&self) -> &PtaStats {
        &self.stats
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Solving
    // ═══════════════════════════════════════════════════════════════════════

    /// Run to fixpoint
    pub fn run(&mut self) -> Result<&PtaStats> {
        let start = Instant::now();

        if self.entries.is_empty() {
            self.entries = default_entries(self.scene, self.config.call_graph_algorithm);
        }
        info!(
            "Starting pointer analysis: {} entries, k={}",
            self.entries.len(),
            self.config.k_limit
        );
        for entry in &self.entries {
            self.builder.add_entry(&mut self.cg, entry);
        }

        let mut changed = self.builder.handle_reachable(&mut self.pag, &mut self.cg)?;
        self.dump_pag("pag_init.dot")?;

        let mut rounds = 0;
        loop {
            rounds += 1;
            changed = self.solve_round(changed)?;
            self.dump_pag(&format!("pag_round_{}.dot", rounds))?;

            info!(
                "Round {}: {} nodes, {} edges, {} reachable functions, {} call edges",
                rounds,
                self.pag.node_count(),
                self.pag.edge_count(),
                self.builder.reachable_count(),
                self.cg.edge_count()
            );

            if changed.is_empty()
                && !self.solver.has_unseeded_addresses(&self.pag)
                && !self.builder.has_pending()
            {
                break;
            }
        }

        self.dump_pag("pag_final.dot")?;
        if self.config.dot_dump {
            self.dump("call_graph.dot", &self.cg.to_dot())?;
        }

        if self.config.detect_type_diff {
            self.type_diffs = detect_type_diffs(self.scene, &self.pag, &self.pts, &self.cg);
            let json = serde_json::to_string_pretty(&self.type_diffs)?;
            self.dump("type_diff.json", &json)?;
            info!("Detected {} type diffs", self.type_diffs.len());
        }

        let solver_stats = self.solver.stats();
        self.stats = PtaStats {
            rounds,
            worklist_pops: solver_stats.worklist_pops,
            propagations: solver_stats.propagations,
            field_edges: solver_stats.field_edges,
            nodes: self.pag.node_count(),
            edges: self.pag.edge_count(),
            contexts: self.builder.contexts().len(),
            reachable_functions: self.builder.reachable_count(),
            call_graph_edges: self.cg.edge_count(),
            dynamic_edges: self.cg.dynamic_edge_count(),
            sdk_objects: self.builder.sdk_object_count(),
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            "Pointer analysis done in {:.2}ms: {} rounds, {} nodes, {} call edges ({} dynamic)",
            self.stats.duration_ms,
            self.stats.rounds,
            self.stats.nodes,
            self.stats.call_graph_edges,
            self.stats.dynamic_edges
        );
        Ok(&self.stats)
    }

    /// One drain / resolve cycle; returns sources of edges added after the drain
    fn solve_round(&mut self, mut changed: Vec<NodeID>) -> Result<Vec<NodeID>> {
        let Self {
            pag,
            cg,
            pts,
            builder,
            solver,
            ..
        } = self;

        solver.seed_address_edges(pag, pts);
        changed.extend(builder.take_new_dyn_bases());

        let mut dyn_updates = DynUpdates::new();
        {
            let is_dyn_base = |n: NodeID| builder.is_dyn_base(n);
            solver.seed_changed(pag, pts, &changed, &is_dyn_base, &mut dyn_updates);
            solver.drain(pag, pts, &is_dyn_base, &mut dyn_updates);
        }

        let mut next = Vec::new();
        for (base, objs) in &dyn_updates {
            for obj in objs.iter() {
                next.extend(builder.add_dynamic_call_edge(*base, obj, pag, cg)?);
            }
        }
        next.extend(builder.handle_reachable(pag, cg)?);
        debug!(
            "{} dynamic bases updated, {} nodes to reseed",
            dyn_updates.len(),
            next.len()
        );
        Ok(next)
    }

    fn dump(&self, name: &str, contents: &str) -> Result<()> {
        let path: PathBuf = self.config.output_dir.join(name);
        fs::create_dir_all(&self.config.output_dir)?;
        fs::write(&path, contents)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn dump_pag(&self, name: &str) -> Result<()> {
        if self.config.dot_dump {
            self.dump(name, &self.pag.to_dot())?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// PAG nodes bound to `value` in any context
    pub fn nodes_of(&self, value: &ValueRef) -> Vec<NodeID> {
        let pag_value = match value {
            ValueRef::Local { method, name } => match self.cg.func_id(method) {
                Some(func) => PagValue::Local {
                    func,
                    name: name.clone(),
                },
                None => return Vec::new(),
            },
            ValueRef::StaticField(field) => PagValue::StaticField {
                field: field.clone(),
            },
        };
        self.pag.nodes_of_value(&pag_value).to_vec()
    }

    pub fn node_points_to(&self, node: NodeID) -> PtsSet {
        self.pts.get_pts(node)
    }

    /// Union of the points-to sets of `value` over all contexts
    pub fn points_to(&self, value: &ValueRef) -> PtsSet {
        let mut result = PtsSet::new();
        for node in self.nodes_of(value) {
            result.union_with(&self.pts.get_pts(node));
        }
        result
    }

    pub fn may_alias(&self, a: &ValueRef, b: &ValueRef) -> bool {
        self.points_to(a).intersects(&self.points_to(b))
    }

    pub fn no_alias(&self, a: &ValueRef, b: &ValueRef) -> bool {
        !self.may_alias(a, b)
    }

    /// Heap objects `value` may point to
    pub fn related_heap_objects(&self, value: &ValueRef) -> Vec<&PagNode> {
        self.points_to(value)
            .iter()
            .filter_map(|obj| self.pag.node(obj))
            .collect()
    }

    /// Nodes connected to `value` through Copy/This edges in either direction,
    /// including the value's own nodes
    pub fn related_nodes(&self, value: &ValueRef) -> Vec<NodeID> {
        let mut seen: FxHashSet<NodeID> = FxHashSet::default();
        let mut stack = self.nodes_of(value);
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            stack.extend(self.pag.copy_targets(node));
            stack.extend(self.pag.copy_sources(node));
        }
        let mut related: Vec<NodeID> = seen.into_iter().collect();
        related.sort_unstable();
        related
    }
}
