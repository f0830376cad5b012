//! Points-to sets over PAG node IDs
//!
//! Sorted vector with a small unsorted insertion buffer:
//! - Insert: O(log n) membership check + O(1) append, batch-merged later
//! - Contains: binary search + short linear scan of the buffer
//! - Union / difference: O(n + m) merge of sorted runs
//!
//! Invariant: `pending` holds no duplicates and nothing already in `sorted`,
//! so `len()` is always `sorted.len() + pending.len()`.

use std::cmp::Ordering;
use std::fmt;

use super::pag::NodeID;

/// Merge the buffer once it grows past this many entries
const PENDING_BUFFER_THRESHOLD: usize = 16;

/// Set of PAG node IDs (heap objects a pointer may refer to)
#[derive(Clone, Default)]
pub struct PtsSet {
    sorted: Vec<NodeID>,
    pending: Vec<NodeID>,
}

impl PtsSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn singleton(node: NodeID) -> Self {
        Self {
            sorted: vec![node],
            pending: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Buffer management
    // ═══════════════════════════════════════════════════════════════════════

    fn consolidate(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.pending.sort_unstable();
        if self.sorted.is_empty() {
            std::mem::swap(&mut self.sorted, &mut self.pending);
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        self.sorted = merge_sorted(&self.sorted, &pending);
    }

    /// Sorted copy of all elements
    fn sorted_elements(&self) -> std::borrow::Cow<'_, [NodeID]> {
        if self.pending.is_empty() {
            std::borrow::Cow::Borrowed(&self.sorted)
        } else {
            let mut pending = self.pending.clone();
            pending.sort_unstable();
            std::borrow::Cow::Owned(merge_sorted(&self.sorted, &pending))
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Basic operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a node; true if it was absent
    #[inline]
    pub fn insert(&mut self, node: NodeID) -> bool {
        if self.sorted.binary_search(&node).is_ok() || self.pending.contains(&node) {
            return false;
        }
        self.pending.push(node);
        if self.pending.len() >= PENDING_BUFFER_THRESHOLD {
            self.consolidate();
        }
        true
    }

    #[inline]
    pub fn contains(&self, node: NodeID) -> bool {
        self.sorted.binary_search(&node).is_ok() || self.pending.contains(&node)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sorted.len() + self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty() && self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.sorted.clear();
        self.pending.clear();
    }

    /// Elements in ascending order
    pub fn iter(&self) -> impl Iterator<Item = NodeID> + '_ {
        let mut pending = self.pending.clone();
        pending.sort_unstable();
        MergeIter {
            left: &self.sorted,
            right: pending,
            i: 0,
            j: 0,
        }
    }

    pub fn to_vec(&self) -> Vec<NodeID> {
        self.sorted_elements().into_owned()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Set operations
    // ═══════════════════════════════════════════════════════════════════════

    /// self = self ∪ other; returns true if self grew
    pub fn union_with(&mut self, other: &PtsSet) -> bool {
        if other.is_empty() {
            return false;
        }
        self.consolidate();
        let before = self.sorted.len();
        let rhs = other.sorted_elements();
        self.sorted = merge_sorted(&self.sorted, &rhs);
        self.sorted.len() != before
    }

    /// self \ other as a new set
    pub fn difference(&self, other: &PtsSet) -> PtsSet {
        if other.is_empty() {
            return self.clone();
        }
        let lhs = self.sorted_elements();
        let rhs = other.sorted_elements();
        let mut result = Vec::new();
        let mut j = 0;
        for &elem in lhs.iter() {
            while j < rhs.len() && rhs[j] < elem {
                j += 1;
            }
            if j >= rhs.len() || rhs[j] != elem {
                result.push(elem);
            }
        }
        PtsSet {
            sorted: result,
            pending: Vec::new(),
        }
    }

    /// Whether the sets share an element
    pub fn intersects(&self, other: &PtsSet) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|elem| large.contains(elem))
    }

    pub fn is_subset_of(&self, other: &PtsSet) -> bool {
        self.len() <= other.len() && self.iter().all(|elem| other.contains(elem))
    }
}

fn merge_sorted(a: &[NodeID], b: &[NodeID]) -> Vec<NodeID> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                merged.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                merged.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                merged.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

struct MergeIter<'a> {
    left: &'a [NodeID],
    right: Vec<NodeID>,
    i: usize,
    j: usize,
}

impl Iterator for MergeIter<'_> {
    type Item = NodeID;

    fn next(&mut self) -> Option<NodeID> {
        // The two runs are disjoint, so no dedup is needed
        match (self.left.get(self.i), self.right.get(self.j)) {
            (Some(&l), Some(&r)) if l < r => {
                self.i += 1;
                Some(l)
            }
            (Some(_), Some(&r)) => {
                self.j += 1;
                Some(r)
            }
            (Some(&l), None) => {
                self.i += 1;
                Some(l)
            }
            (None, Some(&r)) => {
                self.j += 1;
                Some(r)
            }
            (None, None) => None,
        }
    }
}

impl PartialEq for PtsSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset_of(other)
    }
}

impl Eq for PtsSet {}

impl FromIterator<NodeID> for PtsSet {
    fn from_iter<I: IntoIterator<Item = NodeID>>(iter: I) -> Self {
        let mut sorted: Vec<NodeID> = iter.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        Self {
            sorted,
            pending: Vec::new(),
        }
    }
}

impl fmt::Debug for PtsSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
