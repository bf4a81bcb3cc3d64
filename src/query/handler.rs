//! Clause evaluation against the PKB.
//!
//! Every clause becomes a [`ResultTable`]: a constant clause yields the
//! identity table when it holds and an empty table when it does not, a
//! clause with synonyms yields one column per distinct synonym.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::pkb::{ExprMatch, Field, Pkb, Postfix, RelationRows, StatementType};

use super::ast::{
    AttrCompare, AttrCompareRef, AttrName, AttrRef, Declaration, DesignEntity, ExprSpec, Pattern,
    RelRef,
};
use super::optimizer::{Clause, ClauseGroup};
use super::profile::{profile_timer, record_profile_timer, QueryProfileKind};
use super::result_table::ResultTable;

/// Value of an attribute, compared in with clauses and rendered on select.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrValue {
    /// `stmt#` and `value`.
    Int(u32),
    /// `varName` and `procName`.
    Name(String),
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Name(name) => f.write_str(name),
        }
    }
}

/// Reads `attr` from a bound value. Read, print and call statements take
/// their variable or callee name from the statement table.
pub fn attribute_value(pkb: &Pkb, field: &Field, attr: AttrName) -> Option<AttrValue> {
    match attr {
        AttrName::StmtNo => field.as_stmt().map(|stmt| AttrValue::Int(stmt.number)),
        AttrName::Value => field.as_const().map(|value| AttrValue::Int(value.0)),
        AttrName::VarName | AttrName::ProcName => {
            if let Some(var) = field.as_var() {
                return Some(AttrValue::Name(var.as_str().to_owned()));
            }
            if let Some(proc_name) = field.as_proc() {
                return Some(AttrValue::Name(proc_name.as_str().to_owned()));
            }
            let stmt = field.as_stmt()?;
            pkb.get_statement(stmt.number)?
                .attribute
                .clone()
                .map(AttrValue::Name)
        }
    }
}

fn literal(side: &AttrCompareRef) -> Option<AttrValue> {
    match side {
        AttrCompareRef::Number(value) => Some(AttrValue::Int(*value)),
        AttrCompareRef::String(name) => Some(AttrValue::Name(name.clone())),
        AttrCompareRef::Attr(_) => None,
    }
}

fn outcome(holds: bool) -> ResultTable {
    if holds {
        ResultTable::identity()
    } else {
        ResultTable::empty(Vec::new())
    }
}

/// Evaluates clauses and clause groups against one PKB.
#[derive(Clone, Copy, Debug)]
pub struct ClauseHandler<'p> {
    pkb: &'p Pkb,
}

impl<'p> ClauseHandler<'p> {
    /// Creates a handler reading from `pkb`.
    pub fn new(pkb: &'p Pkb) -> Self {
        Self { pkb }
    }

    /// Every value of the declaration's design entity.
    pub fn domain(&self, entity: DesignEntity) -> Vec<Field> {
        let start = profile_timer();
        let values: Vec<Field> = match entity.statement_type() {
            Some(kind) => self
                .pkb
                .get_statements(kind)
                .map(|stmt| Field::concrete(stmt.clone()))
                .collect(),
            None => match entity {
                DesignEntity::Variable => self
                    .pkb
                    .get_variables()
                    .map(|var| Field::concrete(var.clone()))
                    .collect(),
                DesignEntity::Procedure => self
                    .pkb
                    .get_procedures()
                    .map(|proc_name| Field::concrete(proc_name.clone()))
                    .collect(),
                _ => self
                    .pkb
                    .get_constants()
                    .map(|value| Field::concrete(*value))
                    .collect(),
            },
        };
        record_profile_timer(QueryProfileKind::PkbRetrieve, start);
        values
    }

    /// One-column table binding `decl` to its whole domain.
    pub fn get_all(&self, decl: &Declaration) -> ResultTable {
        ResultTable::from_column(decl.synonym.clone(), self.domain(decl.entity))
    }

    /// True when every clause of a group without synonyms holds.
    pub fn handle_no_syn_group(&self, group: &ClauseGroup<'_>) -> bool {
        group
            .clauses()
            .iter()
            .all(|ordered| self.evaluate(&ordered.clause).has_result())
    }

    /// Joins the tables of every clause in scheduled order, stopping at the
    /// first clause that leaves no rows.
    pub fn handle_group(&self, group: &ClauseGroup<'_>) -> ResultTable {
        let mut table = ResultTable::identity();
        for ordered in group.clauses() {
            table = table.join(self.evaluate(&ordered.clause));
            if !table.has_result() {
                trace!(
                    group = group.id(),
                    seq = ordered.seq,
                    clause = ordered.clause.label(),
                    "query.handler.group_failed"
                );
                break;
            }
        }
        table
    }

    /// Table of bindings satisfying one clause.
    pub fn evaluate(&self, clause: &Clause<'_>) -> ResultTable {
        let start = profile_timer();
        let table = match clause {
            Clause::SuchThat(rel) => self.such_that(rel),
            Clause::Pattern(pattern) => self.pattern(pattern),
            Clause::With(with) => self.with(with),
        };
        trace!(
            clause = clause.label(),
            columns = ?table.columns(),
            rows = table.len(),
            "query.handler.clause"
        );
        record_profile_timer(QueryProfileKind::ClauseEval, start);
        table
    }

    fn retrieve(&self, rel: &RelRef, first: &Field, second: &Field) -> RelationRows {
        let start = profile_timer();
        let rows = self.pkb.get_relationship(rel.kind(), first, second);
        record_profile_timer(QueryProfileKind::PkbRetrieve, start);
        rows
    }

    fn such_that(&self, rel: &RelRef) -> ResultTable {
        let (first, second) = rel.args();
        let (f1, f2) = rel.fields(self.pkb);
        match (first.synonym(), second.synonym()) {
            (None, None) if f1.is_concrete() && f2.is_concrete() => {
                let start = profile_timer();
                let holds = self.pkb.is_related(rel.kind(), &f1, &f2);
                record_profile_timer(QueryProfileKind::PkbRetrieve, start);
                outcome(holds)
            }
            (None, None) => outcome(!self.retrieve(rel, &f1, &f2).is_empty()),
            (Some(syn), None) => select_declared_value(syn, self.retrieve(rel, &f1, &f2), true),
            (None, Some(syn)) => select_declared_value(syn, self.retrieve(rel, &f1, &f2), false),
            (Some(a), Some(b)) if a == b => filter_reflexive(a, self.retrieve(rel, &f1, &f2)),
            (Some(a), Some(b)) => ResultTable::from_rows(
                vec![a.to_owned(), b.to_owned()],
                self.retrieve(rel, &f1, &f2)
                    .into_iter()
                    .map(|(l, r)| vec![l, r]),
            ),
        }
    }

    fn pattern(&self, pattern: &Pattern) -> ResultTable {
        let syn = pattern.synonym.synonym.as_str();
        let lhs = pattern.lhs_arg();
        let lhs_field = lhs.to_field(self.pkb);
        let start = profile_timer();
        let rows = match pattern.synonym.entity {
            DesignEntity::Assign => match expr_match(&pattern.rhs) {
                Some(rhs) => self.pkb.match_assign_pattern(&lhs_field, &rhs),
                None => RelationRows::new(),
            },
            DesignEntity::If => self
                .pkb
                .match_container_pattern(StatementType::If, &lhs_field),
            DesignEntity::While => self
                .pkb
                .match_container_pattern(StatementType::While, &lhs_field),
            _ => RelationRows::new(),
        };
        record_profile_timer(QueryProfileKind::PkbRetrieve, start);
        match lhs.synonym() {
            Some(var) => ResultTable::from_rows(
                vec![syn.to_owned(), var.to_owned()],
                rows.into_iter().map(|(stmt, v)| vec![stmt, v]),
            ),
            None => select_declared_value(syn, rows, true),
        }
    }

    fn with(&self, with: &AttrCompare) -> ResultTable {
        match (&with.lhs, &with.rhs) {
            (AttrCompareRef::Attr(a), AttrCompareRef::Attr(b)) => {
                if a.declaration.synonym == b.declaration.synonym {
                    self.filter_domain(a, |field| {
                        let left = attribute_value(self.pkb, field, a.attr);
                        left.is_some() && left == attribute_value(self.pkb, field, b.attr)
                    })
                } else {
                    self.join_on_attribute(a, b)
                }
            }
            (AttrCompareRef::Attr(attr), other) | (other, AttrCompareRef::Attr(attr)) => {
                let expected = literal(other);
                self.filter_domain(attr, |field| {
                    expected.is_some() && attribute_value(self.pkb, field, attr.attr) == expected
                })
            }
            (lhs, rhs) => outcome(literal(lhs) == literal(rhs)),
        }
    }

    fn filter_domain<F>(&self, attr: &AttrRef, keep: F) -> ResultTable
    where
        F: Fn(&Field) -> bool,
    {
        ResultTable::from_column(
            attr.declaration.synonym.clone(),
            self.domain(attr.declaration.entity)
                .into_iter()
                .filter(|field| keep(field)),
        )
    }

    fn join_on_attribute(&self, a: &AttrRef, b: &AttrRef) -> ResultTable {
        let mut by_value: FxHashMap<AttrValue, Vec<Field>> = FxHashMap::default();
        for field in self.domain(b.declaration.entity) {
            if let Some(value) = attribute_value(self.pkb, &field, b.attr) {
                by_value.entry(value).or_default().push(field);
            }
        }
        let mut rows = Vec::new();
        for field in self.domain(a.declaration.entity) {
            let Some(value) = attribute_value(self.pkb, &field, a.attr) else {
                continue;
            };
            for other in by_value.get(&value).into_iter().flatten() {
                rows.push(vec![field.clone(), other.clone()]);
            }
        }
        ResultTable::from_rows(
            vec![a.declaration.synonym.clone(), b.declaration.synonym.clone()],
            rows,
        )
    }
}

fn expr_match(spec: &ExprSpec) -> Option<ExprMatch> {
    let parsed = match spec {
        ExprSpec::Wildcard => return Some(ExprMatch::Any),
        ExprSpec::Full(expr) => Postfix::parse(expr).map(ExprMatch::Full),
        ExprSpec::Partial(expr) => Postfix::parse(expr).map(ExprMatch::Partial),
    };
    match parsed {
        Ok(rhs) => Some(rhs),
        Err(err) => {
            trace!(error = %err, "query.handler.pattern_unparsable");
            None
        }
    }
}

/// Keeps one side of each row as a single-column table.
fn select_declared_value(synonym: &str, rows: RelationRows, first: bool) -> ResultTable {
    ResultTable::from_column(
        synonym.to_owned(),
        rows.into_iter()
            .map(|(l, r)| if first { l } else { r }),
    )
}

/// Rows relating a value to itself, for clauses naming one synonym twice.
fn filter_reflexive(synonym: &str, rows: RelationRows) -> ResultTable {
    ResultTable::from_column(
        synonym.to_owned(),
        rows.into_iter().filter(|(l, r)| l == r).map(|(l, _)| l),
    )
}
