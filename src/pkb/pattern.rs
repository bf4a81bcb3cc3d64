//! Pattern index for assign, if and while statements.

use std::collections::{BTreeMap, BTreeSet};

use super::expr::{ExprMatch, Postfix};
use super::field::{EntityType, Field, StatementType, StmtLoc, VarName};
use super::tables::RelationRows;

#[derive(Debug, Clone)]
struct AssignEntry {
    lhs: VarName,
    rhs: Postfix,
}

/// Assignment shapes and container control variables, keyed by statement.
#[derive(Debug, Default)]
pub struct PatternIndex {
    assigns: BTreeMap<StmtLoc, AssignEntry>,
    containers: BTreeMap<StmtLoc, BTreeSet<VarName>>,
}

impl PatternIndex {
    /// Records `lhs = rhs` at `stmt`, replacing an earlier record.
    pub fn insert_assign(&mut self, stmt: StmtLoc, lhs: VarName, rhs: Postfix) -> bool {
        self.assigns
            .insert(stmt, AssignEntry { lhs, rhs })
            .is_none()
    }

    /// Adds control variables of an if or while condition.
    pub fn insert_container(&mut self, stmt: StmtLoc, vars: impl IntoIterator<Item = VarName>) {
        self.containers.entry(stmt).or_default().extend(vars);
    }

    /// Number of indexed statements.
    pub fn len(&self) -> usize {
        self.assigns.len() + self.containers.len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(assignment, lhs variable)` rows whose left side is admitted by `lhs`
    /// and whose right side satisfies `rhs`.
    pub fn match_assign(&self, lhs: &Field, rhs: &ExprMatch) -> RelationRows {
        let lhs = lhs.normalized();
        if lhs.entity_type() != EntityType::Variable {
            return RelationRows::new();
        }
        self.assigns
            .iter()
            .filter(|(_, entry)| rhs.matches(&entry.rhs))
            .map(|(stmt, entry)| {
                (
                    Field::concrete(stmt.clone()),
                    Field::concrete(entry.lhs.clone()),
                )
            })
            .filter(|(_, var)| lhs.admits(var))
            .collect()
    }

    /// `(container, control variable)` rows for containers of kind `kind`.
    /// Containers with no control variable never match.
    pub fn match_container(&self, kind: StatementType, lhs: &Field) -> RelationRows {
        let lhs = lhs.normalized();
        if lhs.entity_type() != EntityType::Variable {
            return RelationRows::new();
        }
        self.containers
            .iter()
            .filter(|(stmt, _)| stmt.statement_type == kind)
            .flat_map(|(stmt, vars)| {
                vars.iter()
                    .map(|var| (Field::concrete(stmt.clone()), Field::concrete(var.clone())))
            })
            .filter(|(_, var)| lhs.admits(var))
            .collect()
    }
}
