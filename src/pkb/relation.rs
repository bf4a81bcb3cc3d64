//! Pair-set storage for Modifies and Uses.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::errors::PkbError;
use super::field::{EntityType, Field};
use super::tables::{RelationKind, RelationRows, RelationTable};

/// Relationship without a closure form: a set of `(owner, variable)` pairs
/// where the owner is a statement or a procedure.
///
/// Pairs are indexed in both directions so either side can drive a lookup.
#[derive(Debug)]
pub struct NonTransitiveTable {
    kind: RelationKind,
    forward: BTreeMap<Field, BTreeSet<Field>>,
    backward: BTreeMap<Field, BTreeSet<Field>>,
    pairs: usize,
}

impl NonTransitiveTable {
    /// Creates an empty table for `kind`.
    pub fn new(kind: RelationKind) -> Self {
        Self {
            kind,
            forward: BTreeMap::new(),
            backward: BTreeMap::new(),
            pairs: 0,
        }
    }

    /// Relation stored in this table.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Variables recorded against a concrete owner.
    pub fn values_of(&self, owner: &Field) -> impl Iterator<Item = &Field> + '_ {
        self.forward.get(owner).into_iter().flatten()
    }

    fn is_owner(field: &Field) -> bool {
        field.is_valid_concrete(EntityType::Statement)
            || field.is_valid_concrete(EntityType::Procedure)
    }

    fn reject(&self, position: &'static str, reason: &'static str) -> PkbError {
        PkbError::InvalidField {
            relation: self.kind,
            position,
            reason,
        }
    }

    fn all_rows<'a>(
        &'a self,
        first: &'a Field,
        second: &'a Field,
    ) -> impl Iterator<Item = (Field, Field)> + 'a {
        self.forward
            .iter()
            .filter(move |(owner, _)| first.admits(owner))
            .flat_map(move |(owner, vars)| {
                vars.iter()
                    .filter(move |var| second.admits(var))
                    .map(move |var| (owner.clone(), var.clone()))
            })
    }
}

impl RelationTable for NonTransitiveTable {
    fn insert(&mut self, first: &Field, second: &Field) -> Result<bool, PkbError> {
        if !Self::is_owner(first) {
            return Err(self.reject("first", "expected a concrete statement or procedure"));
        }
        if !second.is_valid_concrete(EntityType::Variable) {
            return Err(self.reject("second", "expected a concrete variable"));
        }
        let inserted = self
            .forward
            .entry(first.clone())
            .or_default()
            .insert(second.clone());
        if inserted {
            self.backward
                .entry(second.clone())
                .or_default()
                .insert(first.clone());
            self.pairs += 1;
        }
        Ok(inserted)
    }

    fn contains(&self, first: &Field, second: &Field) -> bool {
        if !Self::is_owner(first) || !second.is_valid_concrete(EntityType::Variable) {
            debug!(
                relation = %self.kind,
                first = %first,
                second = %second,
                "pkb.relation.contains_invalid"
            );
            return false;
        }
        self.forward
            .get(first)
            .is_some_and(|vars| vars.contains(second))
    }

    fn retrieve(&self, first: &Field, second: &Field) -> RelationRows {
        if first.is_wildcard() || second.entity_type() != EntityType::Variable {
            debug!(
                relation = %self.kind,
                first = %first,
                second = %second,
                "pkb.relation.retrieve_invalid"
            );
            return RelationRows::new();
        }
        let second = second.normalized();
        match (first.is_concrete(), second.is_concrete()) {
            (true, true) => {
                let mut rows = RelationRows::new();
                if self.contains(first, &second) {
                    rows.insert((first.clone(), second));
                }
                rows
            }
            (true, false) => self
                .values_of(first)
                .filter(|var| second.admits(var))
                .map(|var| (first.clone(), var.clone()))
                .collect(),
            (false, true) => self
                .backward
                .get(&second)
                .into_iter()
                .flatten()
                .filter(|owner| first.admits(owner))
                .map(|owner| (owner.clone(), second.clone()))
                .collect(),
            (false, false) => self.all_rows(first, &second).collect(),
        }
    }

    fn size(&self) -> usize {
        self.pairs
    }
}
