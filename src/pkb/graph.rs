//! Arena-backed directed graph used by the closure relations.
//!
//! Nodes live in a vector and refer to each other by index; a hash index maps
//! each node's slot (statement number, procedure name) to its position.
//! Traversals are iterative with an explicit visited set, so malformed
//! cyclic input terminates.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::field::{ProcName, StatementType, StmtLoc};

/// Value stored in a graph node.
pub trait GraphNode: Clone + Ord + fmt::Debug {
    /// Identity used to locate a node. Two values with the same slot but
    /// different content conflict.
    type Slot: Clone + Eq + Hash + fmt::Debug;
    /// Constraint applied to traversal results.
    type Filter: Copy + fmt::Debug;

    /// Slot of this value.
    fn slot(&self) -> Self::Slot;
    /// True when the value satisfies `filter`.
    fn admits(&self, filter: Self::Filter) -> bool;
}

impl GraphNode for StmtLoc {
    type Slot = u32;
    type Filter = StatementType;

    fn slot(&self) -> u32 {
        self.number
    }

    fn admits(&self, filter: StatementType) -> bool {
        filter.admits(self.statement_type)
    }
}

impl GraphNode for ProcName {
    type Slot = String;
    type Filter = ();

    fn slot(&self) -> String {
        self.0.clone()
    }

    fn admits(&self, _filter: ()) -> bool {
        true
    }
}

/// Why an edge could not be added.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdgeConflict<T: GraphNode> {
    /// A node with the same slot already holds a different value.
    Redeclared {
        /// Value already in the graph.
        existing: T,
        /// Value offered by the new edge.
        requested: T,
    },
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    next: SmallVec<[usize; 2]>,
    prev: SmallVec<[usize; 2]>,
}

/// Directed graph over [`GraphNode`] values.
#[derive(Debug)]
pub struct Graph<T: GraphNode> {
    nodes: Vec<Node<T>>,
    index: FxHashMap<T::Slot, usize>,
    edges: usize,
}

impl<T: GraphNode> Default for Graph<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: FxHashMap::default(),
            edges: 0,
        }
    }
}

impl<T: GraphNode> Graph<T> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// Node values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.nodes.iter().map(|node| &node.value)
    }

    /// Stored value sharing `value`'s slot.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.locate(value).map(|idx| &self.nodes[idx].value)
    }

    /// Number of direct successors of `value`; zero when absent.
    pub fn out_degree(&self, value: &T) -> usize {
        self.locate(value).map_or(0, |idx| self.nodes[idx].next.len())
    }

    /// Number of direct predecessors of `value`; zero when absent.
    pub fn in_degree(&self, value: &T) -> usize {
        self.locate(value).map_or(0, |idx| self.nodes[idx].prev.len())
    }

    fn locate(&self, value: &T) -> Option<usize> {
        self.index.get(&value.slot()).copied()
    }

    fn check_slot(&self, value: &T) -> Result<Option<usize>, EdgeConflict<T>> {
        match self.locate(value) {
            Some(idx) if self.nodes[idx].value != *value => Err(EdgeConflict::Redeclared {
                existing: self.nodes[idx].value.clone(),
                requested: value.clone(),
            }),
            found => Ok(found),
        }
    }

    fn intern(&mut self, existing: Option<usize>, value: &T) -> usize {
        if let Some(idx) = existing {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            value: value.clone(),
            next: SmallVec::new(),
            prev: SmallVec::new(),
        });
        self.index.insert(value.slot(), idx);
        idx
    }

    /// Adds `from -> to`, creating nodes on demand. Returns `Ok(false)` when
    /// the edge already exists. Nothing is created when either endpoint
    /// conflicts with a stored node.
    pub fn add_edge(&mut self, from: &T, to: &T) -> Result<bool, EdgeConflict<T>> {
        let from_idx = self.check_slot(from)?;
        let to_idx = self.check_slot(to)?;
        let from_idx = self.intern(from_idx, from);
        let to_idx = self.intern(to_idx, to);
        if self.nodes[from_idx].next.contains(&to_idx) {
            return Ok(false);
        }
        self.nodes[from_idx].next.push(to_idx);
        self.nodes[to_idx].prev.push(from_idx);
        self.edges += 1;
        Ok(true)
    }

    /// True when `to` is a direct successor of `from`.
    pub fn contains(&self, from: &T, to: &T) -> bool {
        match (self.locate(from), self.locate(to)) {
            (Some(from_idx), Some(to_idx)) => {
                self.nodes[from_idx].value == *from
                    && self.nodes[to_idx].value == *to
                    && self.nodes[from_idx].next.contains(&to_idx)
            }
            _ => false,
        }
    }

    /// True when `to` is reachable from `from` in one or more steps.
    pub fn contains_t(&self, from: &T, to: &T) -> bool {
        let (Some(from_idx), Some(to_idx)) = (self.locate(from), self.locate(to)) else {
            return false;
        };
        if self.nodes[from_idx].value != *from || self.nodes[to_idx].value != *to {
            return false;
        }
        let mut visited = FxHashSet::default();
        let mut stack: Vec<usize> = self.nodes[from_idx].next.to_vec();
        while let Some(idx) = stack.pop() {
            if idx == to_idx {
                return true;
            }
            if visited.insert(idx) {
                stack.extend(self.nodes[idx].next.iter().copied());
            }
        }
        false
    }

    fn reach(&self, start: usize, forward: bool) -> FxHashSet<usize> {
        let edges = |idx: usize| {
            if forward {
                &self.nodes[idx].next
            } else {
                &self.nodes[idx].prev
            }
        };
        let mut visited = FxHashSet::default();
        let mut stack: Vec<usize> = edges(start).to_vec();
        while let Some(idx) = stack.pop() {
            if visited.insert(idx) {
                stack.extend(edges(idx).iter().copied());
            }
        }
        visited
    }

    fn collect(&self, indices: impl IntoIterator<Item = usize>, filter: T::Filter) -> BTreeSet<T> {
        indices
            .into_iter()
            .map(|idx| &self.nodes[idx].value)
            .filter(|value| value.admits(filter))
            .cloned()
            .collect()
    }

    /// Direct successors of `from` admitted by `filter`.
    pub fn traverse_start(&self, from: &T, filter: T::Filter) -> BTreeSet<T> {
        match self.locate(from) {
            Some(idx) if self.nodes[idx].value == *from => {
                self.collect(self.nodes[idx].next.iter().copied(), filter)
            }
            _ => BTreeSet::new(),
        }
    }

    /// Every node reachable from `from` admitted by `filter`.
    pub fn traverse_start_t(&self, from: &T, filter: T::Filter) -> BTreeSet<T> {
        match self.locate(from) {
            Some(idx) if self.nodes[idx].value == *from => self.collect(self.reach(idx, true), filter),
            _ => BTreeSet::new(),
        }
    }

    /// Direct predecessors of `to` admitted by `filter`.
    pub fn traverse_end(&self, filter: T::Filter, to: &T) -> BTreeSet<T> {
        match self.locate(to) {
            Some(idx) if self.nodes[idx].value == *to => {
                self.collect(self.nodes[idx].prev.iter().copied(), filter)
            }
            _ => BTreeSet::new(),
        }
    }

    /// Every node that reaches `to`, admitted by `filter`. Ancestors that fail
    /// the filter are walked through, not treated as a barrier.
    pub fn traverse_end_t(&self, filter: T::Filter, to: &T) -> BTreeSet<T> {
        match self.locate(to) {
            Some(idx) if self.nodes[idx].value == *to => self.collect(self.reach(idx, false), filter),
            _ => BTreeSet::new(),
        }
    }

    /// Every edge whose endpoints satisfy the two filters.
    pub fn traverse_all(&self, from: T::Filter, to: T::Filter) -> BTreeSet<(T, T)> {
        let mut rows = BTreeSet::new();
        for node in self.nodes.iter().filter(|node| node.value.admits(from)) {
            for value in self.collect(node.next.iter().copied(), to) {
                rows.insert((node.value.clone(), value));
            }
        }
        rows
    }

    /// Every reachability pair whose endpoints satisfy the two filters.
    pub fn traverse_all_t(&self, from: T::Filter, to: T::Filter) -> BTreeSet<(T, T)> {
        let mut rows = BTreeSet::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            if !node.value.admits(from) {
                continue;
            }
            for value in self.collect(self.reach(idx, true), to) {
                rows.insert((node.value.clone(), value));
            }
        }
        rows
    }
}
