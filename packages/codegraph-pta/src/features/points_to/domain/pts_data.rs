//! Diff-tracking points-to storage
//!
//! Each node has two disjoint sets:
//! - `propa`: objects already propagated to successors
//! - `diff`: objects added since the node was last processed
//!
//! The full points-to set is their union. Processing a node propagates only
//! `diff` and then flushes it into `propa`.

use rustc_hash::FxHashMap;

use super::pag::NodeID;
use super::pts_set::PtsSet;

#[derive(Debug, Default, Clone)]
pub struct DiffPtData {
    propa: FxHashMap<NodeID, PtsSet>,
    diff: FxHashMap<NodeID, PtsSet>,
}

impl DiffPtData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one object to `node`'s diff; true if the full set grew
    pub fn add_pts(&mut self, node: NodeID, obj: NodeID) -> bool {
        if self.propa.get(&node).map_or(false, |p| p.contains(obj)) {
            return false;
        }
        self.diff.entry(node).or_default().insert(obj)
    }

    /// Add every object of `objs` not yet known to `node`; true if it grew
    pub fn union_pts(&mut self, node: NodeID, objs: &PtsSet) -> bool {
        if objs.is_empty() {
            return false;
        }
        let fresh = match self.propa.get(&node) {
            Some(propa) => objs.difference(propa),
            None => objs.clone(),
        };
        if fresh.is_empty() {
            return false;
        }
        self.diff.entry(node).or_default().union_with(&fresh)
    }

    /// Full points-to set
    pub fn get_pts(&self, node: NodeID) -> PtsSet {
        let mut full = self.propa.get(&node).cloned().unwrap_or_default();
        if let Some(diff) = self.diff.get(&node) {
            full.union_with(diff);
        }
        full
    }

    #[inline]
    pub fn get_diff(&self, node: NodeID) -> Option<&PtsSet> {
        self.diff.get(&node)
    }

    #[inline]
    pub fn get_propa(&self, node: NodeID) -> Option<&PtsSet> {
        self.propa.get(&node)
    }

    pub fn contains(&self, node: NodeID, obj: NodeID) -> bool {
        self.propa.get(&node).map_or(false, |p| p.contains(obj))
            || self.diff.get(&node).map_or(false, |d| d.contains(obj))
    }

    pub fn pts_len(&self, node: NodeID) -> usize {
        self.propa.get(&node).map_or(0, PtsSet::len) + self.diff.get(&node).map_or(0, PtsSet::len)
    }

    /// Move `diff` into `propa`
    pub fn flush(&mut self, node: NodeID) {
        if let Some(diff) = self.diff.remove(&node) {
            if diff.is_empty() {
                return;
            }
            self.propa.entry(node).or_default().union_with(&diff);
        }
    }

    /// Objects in `src`'s full set that `dst` does not yet have
    pub fn calculate_diff(&self, src: NodeID, dst: NodeID) -> PtsSet {
        let src_pts = self.get_pts(src);
        if src_pts.is_empty() {
            return src_pts;
        }
        src_pts.difference(&self.get_pts(dst))
    }

    /// Nodes with a non-empty points-to set
    pub fn nodes(&self) -> impl Iterator<Item = NodeID> + '_ {
        let from_propa = self.propa.iter().filter(|(_, p)| !p.is_empty()).map(|(n, _)| *n);
        let from_diff = self
            .diff
            .iter()
            .filter(|(n, d)| !d.is_empty() && !self.propa.contains_key(n))
            .map(|(n, _)| *n);
        from_propa.chain(from_diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_and_flush() {
        let mut pts = DiffPtData::new();
        assert!(pts.add_pts(1, 10));
        assert!(!pts.add_pts(1, 10));
        assert_eq!(pts.get_diff(1).map(PtsSet::len), Some(1));

        pts.flush(1);
        assert!(pts.get_diff(1).is_none());
        assert!(pts.get_propa(1).unwrap().contains(10));

        // already propagated objects never re-enter the diff
        assert!(!pts.add_pts(1, 10));
        assert!(pts.add_pts(1, 11));
        assert_eq!(pts.get_pts(1).to_vec(), vec![10, 11]);
        assert_eq!(pts.pts_len(1), 2);
    }

    #[test]
    fn test_union_skips_propagated() {
        let mut pts = DiffPtData::new();
        pts.add_pts(2, 5);
        pts.flush(2);

        let incoming: PtsSet = [5, 6].into_iter().collect();
        assert!(pts.union_pts(2, &incoming));
        assert_eq!(pts.get_diff(2).unwrap().to_vec(), vec![6]);
        assert!(!pts.union_pts(2, &incoming));
    }

    #[test]
    fn test_calculate_diff() {
        let mut pts = DiffPtData::new();
        pts.add_pts(1, 10);
        pts.add_pts(1, 11);
        pts.flush(1);
        pts.add_pts(1, 12);
        pts.add_pts(2, 11);

        assert_eq!(pts.calculate_diff(1, 2).to_vec(), vec![10, 12]);
        assert!(pts.calculate_diff(3, 1).is_empty());
    }

    #[test]
    fn test_nodes_lists_each_once() {
        let mut pts = DiffPtData::new();
        pts.add_pts(1, 10);
        pts.flush(1);
        pts.add_pts(1, 11);
        pts.add_pts(2, 10);

        let mut nodes: Vec<_> = pts.nodes().collect();
        nodes.sort();
        assert_eq!(nodes, vec![1, 2]);
    }
}
