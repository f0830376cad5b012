//! Worklist propagation with diff sets
//!
//! Each popped node flushes its `diff` (objects not yet propagated) into
//! `propa`, then pushes that diff along outgoing Copy/This edges and replays
//! Load/Write edges of field references on the node onto per-object field
//! clones.
//!
//! New edges created mid-analysis propagate the source's full set once via
//! `calculate_diff`, after which normal diff propagation keeps them current.

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashSet;

use crate::features::points_to::domain::{DiffPtData, NodeID, Pag, PagEdgeKind, PtsSet};

/// New pointees of dynamic-call base nodes, collected during a round
pub type DynUpdates = BTreeMap<NodeID, PtsSet>;

#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    pub worklist_pops: usize,
    pub propagations: usize,
    pub field_edges: usize,
}

#[derive(Debug, Default)]
pub struct Solver {
    worklist: VecDeque<NodeID>,
    queued: FxHashSet<NodeID>,
    /// Address edges already seeded
    addr_cursor: usize,
    stats: SolverStats,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    #[inline]
    fn enqueue(&mut self, node: NodeID) {
        if self.queued.insert(node) {
            self.worklist.push_back(node);
        }
    }

    /// Address edges not seeded yet
    pub fn has_unseeded_addresses(&self, pag: &Pag) -> bool {
        self.addr_cursor < pag.addr_edges().len()
    }

    /// Seed new Address edges: every object points to itself, every
    /// destination to the object
    pub fn seed_address_edges(&mut self, pag: &Pag, pts: &mut DiffPtData) -> usize {
        let edges = pag.addr_edges();
        let start = self.addr_cursor;
        for &(obj, dst) in &edges[start..] {
            if pts.add_pts(obj, obj) {
                self.enqueue(obj);
            }
            if pts.add_pts(dst, obj) {
                self.enqueue(dst);
            }
        }
        self.addr_cursor = edges.len();
        self.addr_cursor - start
    }

    /// Propagate full sets of nodes whose outgoing edges changed
    pub fn seed_changed(
        &mut self,
        pag: &mut Pag,
        pts: &mut DiffPtData,
        nodes: &[NodeID],
        is_dyn_base: &dyn Fn(NodeID) -> bool,
        dyn_updates: &mut DynUpdates,
    ) {
        let mut seen = FxHashSet::default();
        for &src in nodes {
            if !seen.insert(src) {
                continue;
            }
            let full = pts.get_pts(src);
            if full.is_empty() {
                continue;
            }
            for dst in pag.copy_targets(src) {
                self.propagate_full(pts, src, dst);
            }
            self.resolve_fields(pag, pts, src, &full);
            if is_dyn_base(src) {
                dyn_updates.entry(src).or_default().union_with(&full);
            }
        }
    }

    /// Drain the worklist
    pub fn drain(
        &mut self,
        pag: &mut Pag,
        pts: &mut DiffPtData,
        is_dyn_base: &dyn Fn(NodeID) -> bool,
        dyn_updates: &mut DynUpdates,
    ) {
        while let Some(node) = self.worklist.pop_front() {
            self.queued.remove(&node);
            self.stats.worklist_pops += 1;

            let diff = match pts.get_diff(node) {
                Some(d) if !d.is_empty() => d.clone(),
                _ => continue,
            };
            // Flush first: anything reaching `node` while it is processed
            // stays in its diff and re-enqueues it
            pts.flush(node);

            for dst in pag.copy_targets(node) {
                if pts.union_pts(dst, &diff) {
                    self.stats.propagations += 1;
                    self.enqueue(dst);
                }
            }
            self.resolve_fields(pag, pts, node, &diff);
            if is_dyn_base(node) {
                dyn_updates.entry(node).or_default().union_with(&diff);
            }
        }
    }

    fn propagate_full(&mut self, pts: &mut DiffPtData, src: NodeID, dst: NodeID) {
        let missing = pts.calculate_diff(src, dst);
        if pts.union_pts(dst, &missing) {
            self.stats.propagations += 1;
            self.enqueue(dst);
        }
    }

    /// Connect field references on `base` to the field clones of `objs`
    fn resolve_fields(&mut self, pag: &mut Pag, pts: &mut DiffPtData, base: NodeID, objs: &PtsSet) {
        let fields = pag.field_nodes_of(base).to_vec();
        for field in fields {
            let loads = pag.load_targets(field);
            let writes = pag.write_sources(field);
            if loads.is_empty() && writes.is_empty() {
                continue;
            }
            for obj in objs.iter() {
                if !pag.node(obj).map_or(false, |n| n.is_heap()) {
                    continue;
                }
                let Some(clone) = pag.get_or_clone_pag_field_node(field, obj) else {
                    continue;
                };
                for &dst in &loads {
                    if pag.add_edge(clone, dst, PagEdgeKind::Copy) {
                        self.stats.field_edges += 1;
                        self.propagate_full(pts, clone, dst);
                    }
                }
                for &src in &writes {
                    if pag.add_edge(src, clone, PagEdgeKind::Copy) {
                        self.stats.field_edges += 1;
                        self.propagate_full(pts, src, clone);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::points_to::domain::PagValue;
    use crate::shared::models::Type;

    fn local(pag: &mut Pag, name: &str) -> NodeID {
        pag.get_or_new_node(
            0,
            PagValue::Local {
                func: 0,
                name: name.to_string(),
            },
            Type::Any,
        )
    }

    fn alloc(pag: &mut Pag, stmt: usize) -> NodeID {
        pag.get_or_new_node(0, PagValue::Alloc { func: 0, stmt }, Type::class("A"))
    }

    fn no_dyn(_: NodeID) -> bool {
        false
    }

    fn solve(pag: &mut Pag, pts: &mut DiffPtData) {
        let mut solver = Solver::new();
        let mut updates = DynUpdates::new();
        solver.seed_address_edges(pag, pts);
        solver.drain(pag, pts, &no_dyn, &mut updates);
    }

    #[test]
    fn test_copy_chain() {
        let mut pag = Pag::new();
        let o = alloc(&mut pag, 0);
        let (a, b, c) = (local(&mut pag, "a"), local(&mut pag, "b"), local(&mut pag, "c"));
        pag.add_edge(o, a, PagEdgeKind::Address);
        pag.add_edge(a, b, PagEdgeKind::Copy);
        pag.add_edge(b, c, PagEdgeKind::Copy);

        let mut pts = DiffPtData::new();
        solve(&mut pag, &mut pts);

        assert_eq!(pts.get_pts(c).to_vec(), vec![o]);
        assert_eq!(pts.get_pts(o).to_vec(), vec![o]);
        assert!(pts.get_diff(c).map_or(true, |d| d.is_empty()));
    }

    #[test]
    fn test_store_then_load_through_alias() {
        // x = new A; y = x; v = new A; x.f = v; w = y.f
        let mut pag = Pag::new();
        let ox = alloc(&mut pag, 0);
        let ov = alloc(&mut pag, 2);
        let (x, y, v, w) = (
            local(&mut pag, "x"),
            local(&mut pag, "y"),
            local(&mut pag, "v"),
            local(&mut pag, "w"),
        );
        let xf = pag.get_or_new_field_node(
            0,
            PagValue::InstanceField {
                func: 0,
                base: "x".into(),
                field: "f".into(),
            },
            Type::Unknown,
            x,
        );
        let yf = pag.get_or_new_field_node(
            0,
            PagValue::InstanceField {
                func: 0,
                base: "y".into(),
                field: "f".into(),
            },
            Type::Unknown,
            y,
        );
        pag.add_edge(ox, x, PagEdgeKind::Address);
        pag.add_edge(x, y, PagEdgeKind::Copy);
        pag.add_edge(ov, v, PagEdgeKind::Address);
        pag.add_edge(v, xf, PagEdgeKind::Write);
        pag.add_edge(yf, w, PagEdgeKind::Load);

        let mut pts = DiffPtData::new();
        solve(&mut pag, &mut pts);

        assert_eq!(pts.get_pts(w).to_vec(), vec![ov]);
        // the field reference anchors themselves hold nothing
        assert!(pts.get_pts(xf).is_empty());
    }

    #[test]
    fn test_load_into_own_base() {
        // x = new A; y = new A; x.f = y; x = x.f
        let mut pag = Pag::new();
        let ox = alloc(&mut pag, 0);
        let oy = alloc(&mut pag, 1);
        let (x, y) = (local(&mut pag, "x"), local(&mut pag, "y"));
        let xf = pag.get_or_new_field_node(
            0,
            PagValue::InstanceField {
                func: 0,
                base: "x".into(),
                field: "f".into(),
            },
            Type::Unknown,
            x,
        );
        pag.add_edge(ox, x, PagEdgeKind::Address);
        pag.add_edge(oy, y, PagEdgeKind::Address);
        pag.add_edge(y, xf, PagEdgeKind::Write);
        pag.add_edge(xf, x, PagEdgeKind::Load);

        let mut pts = DiffPtData::new();
        solve(&mut pag, &mut pts);

        assert_eq!(pts.get_pts(x).to_vec(), vec![ox, oy]);
        // oy reached x's base set, so oy.f was wired as well
        let oy_f = pag
            .node_id(0, &PagValue::FieldClone { object: oy, field: "f".into() })
            .unwrap();
        assert!(pag.has_edge(y, oy_f, PagEdgeKind::Copy));
    }

    #[test]
    fn test_dyn_base_updates_recorded() {
        let mut pag = Pag::new();
        let o = alloc(&mut pag, 0);
        let r = local(&mut pag, "r");
        pag.add_edge(o, r, PagEdgeKind::Address);

        let mut pts = DiffPtData::new();
        let mut solver = Solver::new();
        let mut updates = DynUpdates::new();
        solver.seed_address_edges(&pag, &mut pts);
        solver.drain(&mut pag, &mut pts, &|n| n == r, &mut updates);

        assert_eq!(updates.get(&r).map(|s| s.to_vec()), Some(vec![o]));
        assert!(!solver.has_unseeded_addresses(&pag));
    }

    #[test]
    fn test_seed_changed_propagates_existing_set() {
        let mut pag = Pag::new();
        let o = alloc(&mut pag, 0);
        let (a, b) = (local(&mut pag, "a"), local(&mut pag, "b"));
        pag.add_edge(o, a, PagEdgeKind::Address);

        let mut pts = DiffPtData::new();
        let mut solver = Solver::new();
        let mut updates = DynUpdates::new();
        solver.seed_address_edges(&pag, &mut pts);
        solver.drain(&mut pag, &mut pts, &no_dyn, &mut updates);

        // edge added after `a` was already flushed
        pag.add_edge(a, b, PagEdgeKind::Copy);
        solver.seed_changed(&mut pag, &mut pts, &[a], &no_dyn, &mut updates);
        solver.drain(&mut pag, &mut pts, &no_dyn, &mut updates);
        assert_eq!(pts.get_pts(b).to_vec(), vec![o]);
    }
}
