//! Clause grouping and scheduling.
//!
//! Clauses connected through shared synonyms end up in one [`ClauseGroup`].
//! Inside a group clauses are released breadth-first from the synonym with
//! the fewest clauses, cheapest clause first. Groups without synonyms run
//! before everything else so a false constant clause stops the query early.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::config::OptimizerConfig;

use super::ast::{AttrCompare, DesignEntity, ExprSpec, Pattern, Query, RelRef};

/// Synonym that stands for "no synonym" while grouping.
const NO_SYNONYM: &str = "";

/// A clause borrowed from a [`Query`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Clause<'q> {
    /// Such-that clause.
    SuchThat(&'q RelRef),
    /// Pattern clause.
    Pattern(&'q Pattern),
    /// With clause.
    With(&'q AttrCompare),
}

impl<'q> Clause<'q> {
    /// Distinct synonyms referenced by the clause.
    pub fn synonyms(&self) -> SmallVec<[&'q str; 2]> {
        let mut synonyms: SmallVec<[&'q str; 2]> = match self {
            Clause::SuchThat(rel) => rel.synonyms().into_iter().collect(),
            Clause::Pattern(pattern) => pattern.synonyms().into_iter().collect(),
            Clause::With(with) => with.synonyms().into_iter().collect(),
        };
        if synonyms.len() == 2 && synonyms[0] == synonyms[1] {
            synonyms.pop();
        }
        synonyms
    }

    /// Evaluation cost rank, lower runs first among clauses with the same
    /// number of synonyms.
    pub fn priority(&self) -> u8 {
        match self {
            Clause::With(_) => 0,
            Clause::Pattern(pattern) => match (pattern.synonym.entity, &pattern.rhs) {
                (DesignEntity::If | DesignEntity::While, _) => 1,
                (_, ExprSpec::Full(_)) => 2,
                (_, ExprSpec::Partial(_)) => 3,
                _ => 4,
            },
            Clause::SuchThat(rel) if rel.is_direct() => 5,
            Clause::SuchThat(_) => 6,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Clause::SuchThat(_) => "such_that",
            Clause::Pattern(_) => "pattern",
            Clause::With(_) => "with",
        }
    }
}

/// A clause with its position in declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OrderedClause<'q> {
    /// The clause.
    pub clause: Clause<'q>,
    /// Position among all clauses of the query (such-that, with, pattern).
    pub seq: usize,
}

impl<'q> OrderedClause<'q> {
    /// Same as [`Clause::priority`].
    pub fn priority(&self) -> u8 {
        self.clause.priority()
    }

    fn queue_key(&self) -> QueueKey {
        Reverse((self.clause.synonyms().len(), self.priority(), self.seq))
    }
}

/// Clauses connected by shared synonyms, in evaluation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClauseGroup<'q> {
    id: usize,
    clauses: Vec<OrderedClause<'q>>,
    synonyms: BTreeSet<&'q str>,
}

impl<'q> ClauseGroup<'q> {
    /// Creation order of the group.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Scheduled clauses.
    pub fn clauses(&self) -> &[OrderedClause<'q>] {
        &self.clauses
    }

    /// Synonyms referenced by any clause of the group.
    pub fn synonyms(&self) -> &BTreeSet<&'q str> {
        &self.synonyms
    }

    /// False for the group of constant clauses.
    pub fn has_synonyms(&self) -> bool {
        !self.synonyms.is_empty()
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// True when the group holds no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Builds [`ClauseGroup`]s for a query.
#[derive(Clone, Copy, Debug, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    /// Creates an optimizer.
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Groups and schedules every clause of `query`. Each clause appears in
    /// exactly one group.
    pub fn optimize<'q>(&self, query: &'q Query) -> Vec<ClauseGroup<'q>> {
        let clauses = collect(query);
        if clauses.is_empty() {
            return Vec::new();
        }
        if !self.config.enabled {
            let synonyms = clauses
                .iter()
                .flat_map(|ordered| ordered.clause.synonyms())
                .collect();
            let group = ClauseGroup {
                id: 0,
                clauses,
                synonyms,
            };
            debug!(clauses = group.len(), "query.optimizer.disabled");
            return vec![group];
        }

        let mut groups: Vec<ClauseGroup<'q>> = group_clauses(&clauses)
            .into_iter()
            .enumerate()
            .map(|(id, members)| schedule(id, members))
            .collect();
        if self.config.group_ordering {
            groups.sort_by_key(|group| (group.has_synonyms(), group.synonyms.len(), group.id));
        } else {
            groups.sort_by_key(|group| (group.has_synonyms(), group.id));
        }
        for group in &groups {
            debug!(
                group = group.id,
                clauses = group.len(),
                synonyms = ?group.synonyms,
                "query.optimizer.group"
            );
        }
        groups
    }
}

fn collect(query: &Query) -> Vec<OrderedClause<'_>> {
    query
        .such_that
        .iter()
        .map(Clause::SuchThat)
        .chain(query.with.iter().map(Clause::With))
        .chain(query.patterns.iter().map(Clause::Pattern))
        .enumerate()
        .map(|(seq, clause)| OrderedClause { clause, seq })
        .collect()
}

fn grouping_keys<'q>(clause: &Clause<'q>) -> SmallVec<[&'q str; 2]> {
    let synonyms = clause.synonyms();
    if synonyms.is_empty() {
        SmallVec::from_slice(&[NO_SYNONYM])
    } else {
        synonyms
    }
}

/// Partitions clauses into connected components, in order of the first
/// clause of each component.
fn group_clauses<'q>(clauses: &[OrderedClause<'q>]) -> Vec<Vec<OrderedClause<'q>>> {
    let mut groups: Vec<Option<Vec<OrderedClause<'q>>>> = Vec::new();
    let mut owner: FxHashMap<&'q str, usize> = FxHashMap::default();

    for ordered in clauses {
        let keys = grouping_keys(&ordered.clause);
        let mut hits: SmallVec<[usize; 2]> =
            keys.iter().filter_map(|key| owner.get(key).copied()).collect();
        hits.sort_unstable();
        hits.dedup();

        let target = match hits.first() {
            Some(&target) => target,
            None => {
                groups.push(Some(Vec::new()));
                groups.len() - 1
            }
        };
        // A clause bridging two groups merges the later one into the earlier.
        for &other in hits.iter().skip(1) {
            if let Some(moved) = groups[other].take() {
                for member in &moved {
                    for key in grouping_keys(&member.clause) {
                        owner.insert(key, target);
                    }
                }
                if let Some(group) = groups[target].as_mut() {
                    group.extend(moved);
                }
            }
        }
        for key in keys {
            owner.insert(key, target);
        }
        if let Some(group) = groups[target].as_mut() {
            group.push(*ordered);
        }
    }

    groups.into_iter().flatten().collect()
}

type QueueKey = Reverse<(usize, u8, usize)>;

/// Breadth-first release of clauses over the clause/synonym graph.
struct Release<'g, 'q> {
    members: &'g [OrderedClause<'q>],
    by_synonym: &'g FxHashMap<&'q str, SmallVec<[usize; 4]>>,
    queued: Vec<bool>,
    visited: FxHashSet<&'q str>,
    heap: BinaryHeap<(QueueKey, usize)>,
}

impl<'g, 'q> Release<'g, 'q> {
    fn bind(&mut self, synonym: &'q str) {
        if !self.visited.insert(synonym) {
            return;
        }
        for &idx in self.by_synonym.get(synonym).into_iter().flatten() {
            if !self.queued[idx] {
                self.queued[idx] = true;
                self.heap.push((self.members[idx].queue_key(), idx));
            }
        }
    }

    fn drain(&mut self, order: &mut Vec<OrderedClause<'q>>) {
        while let Some((_, idx)) = self.heap.pop() {
            let member = self.members[idx];
            order.push(member);
            for synonym in member.clause.synonyms() {
                self.bind(synonym);
            }
        }
    }
}

fn schedule<'q>(id: usize, mut members: Vec<OrderedClause<'q>>) -> ClauseGroup<'q> {
    members.sort_by_key(|member| member.seq);
    let mut by_synonym: FxHashMap<&'q str, SmallVec<[usize; 4]>> = FxHashMap::default();
    let mut first_seen: Vec<&'q str> = Vec::new();
    for (idx, member) in members.iter().enumerate() {
        for synonym in member.clause.synonyms() {
            by_synonym
                .entry(synonym)
                .or_insert_with(|| {
                    first_seen.push(synonym);
                    SmallVec::new()
                })
                .push(idx);
        }
    }

    let starting_point = first_seen
        .iter()
        .copied()
        .min_by_key(|synonym| by_synonym.get(synonym).map_or(0, |c| c.len()));

    let mut order: Vec<OrderedClause<'q>> = Vec::with_capacity(members.len());
    let mut release = Release {
        members: &members,
        by_synonym: &by_synonym,
        queued: vec![false; members.len()],
        visited: FxHashSet::default(),
        heap: BinaryHeap::new(),
    };
    for seed in starting_point.into_iter().chain(first_seen.iter().copied()) {
        release.bind(seed);
        release.drain(&mut order);
    }

    // Constant clauses carry no synonym and never enter the walk.
    let mut constants: Vec<(QueueKey, usize)> = release
        .queued
        .iter()
        .enumerate()
        .filter(|(_, queued)| !**queued)
        .map(|(idx, _)| (members[idx].queue_key(), idx))
        .collect();
    constants.sort_by(|a, b| b.cmp(a));
    order.extend(constants.into_iter().map(|(_, idx)| members[idx]));

    ClauseGroup {
        id,
        clauses: order,
        synonyms: first_seen.into_iter().collect(),
    }
}
