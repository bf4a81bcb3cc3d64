//! Relationship kinds and the capability interface shared by every
//! relationship table.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::PkbError;
use super::field::{Field, ProcName, StmtLoc};
use super::relation::NonTransitiveTable;
use super::transitive::TransitiveTable;

/// Rows returned by a relationship lookup: `(first, second)` pairs of
/// concrete fields.
pub type RelationRows = BTreeSet<(Field, Field)>;

/// Relationship between two program entities.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Statement or procedure modifies a variable.
    Modifies,
    /// Statement or procedure uses a variable.
    Uses,
    /// Statement directly follows another in the same statement list.
    Follows,
    /// Transitive closure of Follows.
    FollowsT,
    /// Container statement directly contains another.
    Parent,
    /// Transitive closure of Parent.
    ParentT,
    /// Procedure directly calls another.
    Calls,
    /// Transitive closure of Calls.
    CallsT,
    /// Control can flow directly between two statements.
    Next,
    /// Transitive closure of Next.
    NextT,
    /// Assignment value flows directly into another assignment.
    Affects,
    /// Transitive closure of Affects.
    AffectsT,
}

impl RelationKind {
    /// Every relation kind.
    pub const ALL: [RelationKind; 12] = [
        RelationKind::Modifies,
        RelationKind::Uses,
        RelationKind::Follows,
        RelationKind::FollowsT,
        RelationKind::Parent,
        RelationKind::ParentT,
        RelationKind::Calls,
        RelationKind::CallsT,
        RelationKind::Next,
        RelationKind::NextT,
        RelationKind::Affects,
        RelationKind::AffectsT,
    ];

    /// Direct relation a closure kind is built from.
    pub fn base(self) -> RelationKind {
        match self {
            RelationKind::FollowsT => RelationKind::Follows,
            RelationKind::ParentT => RelationKind::Parent,
            RelationKind::CallsT => RelationKind::Calls,
            RelationKind::NextT => RelationKind::Next,
            RelationKind::AffectsT => RelationKind::Affects,
            other => other,
        }
    }

    /// True for the `*` kinds.
    pub fn is_transitive(self) -> bool {
        self.base() != self
    }

    /// True for kinds the extractor may insert directly.
    pub fn is_insertable(self) -> bool {
        !self.is_transitive() && self != RelationKind::Affects
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::Modifies => "Modifies",
            RelationKind::Uses => "Uses",
            RelationKind::Follows => "Follows",
            RelationKind::FollowsT => "Follows*",
            RelationKind::Parent => "Parent",
            RelationKind::ParentT => "Parent*",
            RelationKind::Calls => "Calls",
            RelationKind::CallsT => "Calls*",
            RelationKind::Next => "Next",
            RelationKind::NextT => "Next*",
            RelationKind::Affects => "Affects",
            RelationKind::AffectsT => "Affects*",
        };
        f.write_str(name)
    }
}

/// Operations every relationship table supports.
///
/// Invalid argument shapes never fail the caller: lookups log and answer
/// `false` or an empty row set.
pub trait RelationTable {
    /// Records `(first, second)`. `Ok(false)` means the pair already existed.
    fn insert(&mut self, first: &Field, second: &Field) -> Result<bool, PkbError>;
    /// True when the pair of concrete fields is recorded.
    fn contains(&self, first: &Field, second: &Field) -> bool;
    /// Pairs satisfying both argument constraints.
    fn retrieve(&self, first: &Field, second: &Field) -> RelationRows;
    /// Number of recorded pairs.
    fn size(&self) -> usize;
}

/// Tables that also answer transitive-closure questions.
pub trait ClosureTable: RelationTable {
    /// True when `second` is reachable from `first` in one or more steps.
    fn contains_t(&self, first: &Field, second: &Field) -> bool;
    /// Closure pairs satisfying both argument constraints.
    fn retrieve_t(&self, first: &Field, second: &Field) -> RelationRows;
}

/// Borrowed view over one of the table variants, selected by relation kind.
#[derive(Clone, Copy)]
pub(crate) enum TableRef<'a> {
    /// Modifies / Uses.
    Flat(&'a NonTransitiveTable),
    /// Follows / Parent / Next / Affects.
    Statement(&'a TransitiveTable<StmtLoc>),
    /// Calls.
    Procedure(&'a TransitiveTable<ProcName>),
}

impl TableRef<'_> {
    pub(crate) fn contains(self, first: &Field, second: &Field, closure: bool) -> bool {
        match (self, closure) {
            (TableRef::Flat(table), _) => table.contains(first, second),
            (TableRef::Statement(table), false) => table.contains(first, second),
            (TableRef::Statement(table), true) => table.contains_t(first, second),
            (TableRef::Procedure(table), false) => table.contains(first, second),
            (TableRef::Procedure(table), true) => table.contains_t(first, second),
        }
    }

    pub(crate) fn retrieve(self, first: &Field, second: &Field, closure: bool) -> RelationRows {
        match (self, closure) {
            (TableRef::Flat(table), _) => table.retrieve(first, second),
            (TableRef::Statement(table), false) => table.retrieve(first, second),
            (TableRef::Statement(table), true) => table.retrieve_t(first, second),
            (TableRef::Procedure(table), false) => table.retrieve(first, second),
            (TableRef::Procedure(table), true) => table.retrieve_t(first, second),
        }
    }

    pub(crate) fn size(self) -> usize {
        match self {
            TableRef::Flat(table) => table.size(),
            TableRef::Statement(table) => table.size(),
            TableRef::Procedure(table) => table.size(),
        }
    }
}
