//! Intermediate relation of synonym bindings.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::trace;

use crate::pkb::Field;

use super::profile::{profile_timer, record_profile_timer, QueryProfileKind};

/// One binding per column.
pub type Row = Vec<Field>;

/// Rows of bindings labelled by synonym.
///
/// A table with no columns and one empty row is the identity of
/// [`ResultTable::join`]; a table with no rows is a failed result and
/// empties anything it is joined with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultTable {
    /// Table that joins to the other operand unchanged.
    pub fn identity() -> Self {
        Self {
            columns: Vec::new(),
            rows: vec![Vec::new()],
        }
    }

    /// Failed table with the given columns.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table, dropping duplicate rows. Every row must have one
    /// value per column.
    pub fn from_rows<I>(columns: Vec<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = Row>,
    {
        let mut seen: FxHashSet<Row> = FxHashSet::default();
        let rows = rows
            .into_iter()
            .filter(|row| row.len() == columns.len() && seen.insert(row.clone()))
            .collect();
        Self { columns, rows }
    }

    /// One-column table.
    pub fn from_column<I>(synonym: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        Self::from_rows(vec![synonym.into()], values.into_iter().map(|v| vec![v]))
    }

    /// Synonym labels in column order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column index of `synonym`.
    pub fn column(&self, synonym: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == synonym)
    }

    /// True when the table binds `synonym`.
    pub fn has_column(&self, synonym: &str) -> bool {
        self.column(synonym).is_some()
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no row satisfies the clauses joined so far.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// False once any joined clause failed.
    pub fn has_result(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Natural join: rows agreeing on every shared column are merged, new
    /// columns from `other` are appended. Without shared columns this is a
    /// cross product.
    pub fn join(self, other: ResultTable) -> ResultTable {
        let start = profile_timer();
        let shared: SmallVec<[(usize, usize); 4]> = other
            .columns
            .iter()
            .enumerate()
            .filter_map(|(right, name)| self.column(name).map(|left| (left, right)))
            .collect();
        let appended: SmallVec<[usize; 4]> = (0..other.columns.len())
            .filter(|idx| !shared.iter().any(|(_, right)| right == idx))
            .collect();

        let mut columns = self.columns;
        columns.extend(appended.iter().map(|&idx| other.columns[idx].clone()));

        if self.rows.is_empty() || other.rows.is_empty() {
            record_profile_timer(QueryProfileKind::Join, start);
            return ResultTable::empty(columns);
        }

        let mut index: FxHashMap<SmallVec<[&Field; 4]>, SmallVec<[usize; 4]>> =
            FxHashMap::default();
        for (idx, row) in other.rows.iter().enumerate() {
            let key = shared.iter().map(|&(_, right)| &row[right]).collect();
            index.entry(key).or_default().push(idx);
        }

        let mut seen: FxHashSet<Row> = FxHashSet::default();
        let mut rows = Vec::new();
        for left in &self.rows {
            let key: SmallVec<[&Field; 4]> = shared.iter().map(|&(l, _)| &left[l]).collect();
            let Some(matches) = index.get(&key) else {
                continue;
            };
            for &idx in matches {
                let right = &other.rows[idx];
                let mut row = Vec::with_capacity(columns.len());
                row.extend(left.iter().cloned());
                row.extend(appended.iter().map(|&a| right[a].clone()));
                if seen.insert(row.clone()) {
                    rows.push(row);
                }
            }
        }
        trace!(
            left = self.rows.len(),
            right = other.rows.len(),
            shared = shared.len(),
            rows = rows.len(),
            "query.result_table.join"
        );
        record_profile_timer(QueryProfileKind::Join, start);
        ResultTable { columns, rows }
    }

    /// Distinct values of `synonym`, in first-seen order.
    pub fn values(&self, synonym: &str) -> Vec<&Field> {
        let Some(idx) = self.column(synonym) else {
            return Vec::new();
        };
        let mut seen: FxHashSet<&Field> = FxHashSet::default();
        self.rows
            .iter()
            .map(|row| &row[idx])
            .filter(|value| seen.insert(*value))
            .collect()
    }
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::identity()
    }
}
