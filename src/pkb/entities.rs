//! Entity tables: statements, variables, procedures and constants.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::errors::PkbError;
use super::field::{StatementType, StmtLoc};

/// Statements keyed by statement number.
#[derive(Debug, Default)]
pub struct StatementTable {
    by_number: BTreeMap<u32, StmtLoc>,
}

impl StatementTable {
    /// Records a statement. Returns `Ok(false)` when the identical statement
    /// is already present.
    pub fn insert(&mut self, stmt: StmtLoc) -> Result<bool, PkbError> {
        if stmt.number == 0 {
            return Err(PkbError::InvalidStatementNumber);
        }
        if matches!(stmt.statement_type, StatementType::All | StatementType::None) {
            return Err(PkbError::InvalidStatementType {
                number: stmt.number,
                statement_type: stmt.statement_type,
            });
        }
        if let Some(existing) = self.by_number.get_mut(&stmt.number) {
            if existing.statement_type != stmt.statement_type {
                return Err(PkbError::StatementConflict {
                    number: stmt.number,
                    existing: existing.statement_type,
                    requested: stmt.statement_type,
                });
            }
            if existing.attribute.is_none() && stmt.attribute.is_some() {
                debug!(number = stmt.number, "pkb.statements.attribute_filled");
                existing.attribute = stmt.attribute;
            }
            return Ok(false);
        }
        self.by_number.insert(stmt.number, stmt);
        Ok(true)
    }

    /// Statement with the given number.
    pub fn get(&self, number: u32) -> Option<&StmtLoc> {
        self.by_number.get(&number)
    }

    /// True when a statement with this number exists.
    pub fn contains(&self, number: u32) -> bool {
        self.by_number.contains_key(&number)
    }

    /// Statements admitted by `filter`, in statement order.
    pub fn of_type(&self, filter: StatementType) -> impl Iterator<Item = &StmtLoc> + '_ {
        self.by_number
            .values()
            .filter(move |stmt| filter.admits(stmt.statement_type))
    }

    /// Every statement in statement order.
    pub fn iter(&self) -> impl Iterator<Item = &StmtLoc> + '_ {
        self.by_number.values()
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    /// True when no statement was recorded.
    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}

/// Ordered set of named or numbered entities.
#[derive(Debug)]
pub struct EntityTable<T: Ord> {
    rows: BTreeSet<T>,
}

impl<T: Ord> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            rows: BTreeSet::new(),
        }
    }
}

impl<T: Ord> EntityTable<T> {
    /// Records an entity, returning true when it was new.
    pub fn insert(&mut self, value: T) -> bool {
        self.rows.insert(value)
    }

    /// Membership test.
    pub fn contains(&self, value: &T) -> bool {
        self.rows.contains(value)
    }

    /// Entities in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.rows.iter()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
