//! Rendering of the final table.

use std::collections::BTreeSet;

use crate::pkb::{Field, Pkb};

use super::ast::{Elem, Query, ResultCl};
use super::handler::attribute_value;
use super::profile::{profile_timer, record_profile_timer, QueryProfileKind};
use super::result_table::ResultTable;

/// Answer to a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryOutput {
    /// Distinct rendered tuples, sorted. Elements are separated by a space.
    Tuples(Vec<String>),
    /// `Select BOOLEAN`.
    Boolean(bool),
}

impl QueryOutput {
    /// Output of a query whose clauses cannot all hold.
    pub fn failed(result: &ResultCl) -> Self {
        match result {
            ResultCl::Boolean => QueryOutput::Boolean(false),
            ResultCl::Tuple(_) => QueryOutput::Tuples(Vec::new()),
        }
    }

    /// Rendered rows; booleans become `TRUE` or `FALSE`.
    pub fn into_strings(self) -> Vec<String> {
        match self {
            QueryOutput::Tuples(rows) => rows,
            QueryOutput::Boolean(true) => vec!["TRUE".to_string()],
            QueryOutput::Boolean(false) => vec!["FALSE".to_string()],
        }
    }

    /// Number of rendered rows.
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Tuples(rows) => rows.len(),
            QueryOutput::Boolean(_) => 1,
        }
    }

    /// True for a tuple query with no satisfying binding.
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryOutput::Tuples(rows) if rows.is_empty())
    }
}

/// Turns the joined table into the select list's rendering.
#[derive(Clone, Copy, Debug)]
pub struct ResultProjector<'p> {
    pkb: &'p Pkb,
}

impl<'p> ResultProjector<'p> {
    /// Creates a projector reading attributes from `pkb`.
    pub fn new(pkb: &'p Pkb) -> Self {
        Self { pkb }
    }

    /// Projects `table` onto the select clause of `query`. Every selected
    /// synonym must have a column.
    pub fn project(&self, query: &Query, table: &ResultTable) -> QueryOutput {
        let start = profile_timer();
        let output = match &query.result {
            ResultCl::Boolean => QueryOutput::Boolean(table.has_result()),
            ResultCl::Tuple(elems) => {
                let columns: Option<Vec<usize>> = elems
                    .iter()
                    .map(|elem| table.column(&elem.declaration().synonym))
                    .collect();
                let rendered: BTreeSet<String> = match columns {
                    Some(columns) => table
                        .rows()
                        .iter()
                        .filter_map(|row| {
                            elems
                                .iter()
                                .zip(&columns)
                                .map(|(elem, &idx)| self.render(elem, &row[idx]))
                                .collect::<Option<Vec<_>>>()
                                .map(|parts| parts.join(" "))
                        })
                        .collect(),
                    None => BTreeSet::new(),
                };
                QueryOutput::Tuples(rendered.into_iter().collect())
            }
        };
        record_profile_timer(QueryProfileKind::Projection, start);
        output
    }

    /// `None` when the bound value has no such attribute; the row is
    /// dropped, as a with clause on the attribute would drop it.
    fn render(&self, elem: &Elem, field: &Field) -> Option<String> {
        match elem {
            Elem::Synonym(_) => Some(field.to_string()),
            Elem::Attr(attr) => {
                attribute_value(self.pkb, field, attr.attr).map(|value| value.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkb::StatementType;
    use crate::query::ast::{AttrName, AttrRef, Declaration, DesignEntity};

    #[test]
    fn renders_tuples_and_attributes() {
        let mut pkb = Pkb::new();
        pkb.insert_statement_with_attribute(StatementType::Print, 3, "total");
        pkb.insert_statement_with_attribute(StatementType::Print, 7, "count");
        let pn = Declaration::new("pn", DesignEntity::Print);
        let query = Query {
            declarations: vec![pn.clone()],
            result: ResultCl::Tuple(vec![
                Elem::Synonym(pn.clone()),
                Elem::Attr(AttrRef {
                    declaration: pn,
                    attr: AttrName::VarName,
                }),
            ]),
            such_that: Vec::new(),
            patterns: Vec::new(),
            with: Vec::new(),
        };
        let table = ResultTable::from_column(
            "pn",
            [
                Field::stmt(7, StatementType::Print),
                Field::stmt(3, StatementType::Print),
            ],
        );
        let output = ResultProjector::new(&pkb).project(&query, &table);
        assert_eq!(
            output.into_strings(),
            vec!["3 total".to_string(), "7 count".to_string()]
        );
    }

    #[test]
    fn missing_attribute_drops_the_row() {
        let mut pkb = Pkb::new();
        pkb.insert_statement_with_attribute(StatementType::Call, 2, "helper");
        pkb.insert_statement(StatementType::Call, 5);
        let cl = Declaration::new("cl", DesignEntity::Call);
        let query = Query {
            declarations: vec![cl.clone()],
            result: ResultCl::Tuple(vec![Elem::Attr(AttrRef {
                declaration: cl,
                attr: AttrName::ProcName,
            })]),
            such_that: Vec::new(),
            patterns: Vec::new(),
            with: Vec::new(),
        };
        let table = ResultTable::from_column(
            "cl",
            [
                Field::stmt(2, StatementType::Call),
                Field::stmt(5, StatementType::Call),
            ],
        );
        let output = ResultProjector::new(&pkb).project(&query, &table);
        assert_eq!(output.into_strings(), vec!["helper".to_string()]);
    }

    #[test]
    fn boolean_strings() {
        assert_eq!(QueryOutput::Boolean(true).into_strings(), vec!["TRUE"]);
        assert_eq!(
            QueryOutput::failed(&ResultCl::Boolean).into_strings(),
            vec!["FALSE"]
        );
        assert!(QueryOutput::failed(&ResultCl::Tuple(Vec::new())).is_empty());
    }
}
