//! Graph-backed tables for relations with a transitive closure.

use tracing::debug;

use super::errors::PkbError;
use super::field::{EntityType, Field, ProcName, StatementType, StmtLoc};
use super::graph::{EdgeConflict, Graph, GraphNode};
use super::tables::{ClosureTable, RelationKind, RelationRows, RelationTable};

/// Graph node that can be read from and written back to a [`Field`].
pub trait TableNode: GraphNode {
    /// Entity type of fields holding this node.
    const ENTITY: EntityType;

    /// Payload of a concrete field.
    fn from_field(field: &Field) -> Option<Self>;
    /// Traversal filter derived from a declaration field.
    fn filter_of(field: &Field) -> Self::Filter;
    /// Concrete field for this node.
    fn to_field(&self) -> Field;
    /// Structural rule of `relation` for the edge `from -> to`.
    fn check_edge(relation: RelationKind, from: &Self, to: &Self) -> Result<(), &'static str>;
}

impl TableNode for StmtLoc {
    const ENTITY: EntityType = EntityType::Statement;

    fn from_field(field: &Field) -> Option<Self> {
        field.as_stmt().cloned()
    }

    fn filter_of(field: &Field) -> StatementType {
        field.statement_filter()
    }

    fn to_field(&self) -> Field {
        Field::concrete(self.clone())
    }

    fn check_edge(relation: RelationKind, from: &Self, to: &Self) -> Result<(), &'static str> {
        match relation {
            RelationKind::Follows | RelationKind::Parent if from.number >= to.number => {
                Err("first statement must precede the second")
            }
            RelationKind::Parent if !from.statement_type.is_container() => {
                Err("parent must be an if or while statement")
            }
            RelationKind::Next if from.number == to.number => {
                Err("a statement cannot be its own successor")
            }
            RelationKind::Affects
                if from.statement_type != StatementType::Assignment
                    || to.statement_type != StatementType::Assignment =>
            {
                Err("affects holds between assignments only")
            }
            _ => Ok(()),
        }
    }
}

impl TableNode for ProcName {
    const ENTITY: EntityType = EntityType::Procedure;

    fn from_field(field: &Field) -> Option<Self> {
        field.as_proc().cloned()
    }

    fn filter_of(_field: &Field) {}

    fn to_field(&self) -> Field {
        Field::concrete(self.clone())
    }

    fn check_edge(_relation: RelationKind, from: &Self, to: &Self) -> Result<(), &'static str> {
        if from == to {
            return Err("a procedure cannot call itself");
        }
        Ok(())
    }
}

/// Direct relation plus its transitive closure, stored as a [`Graph`].
#[derive(Debug)]
pub struct TransitiveTable<T: TableNode> {
    kind: RelationKind,
    graph: Graph<T>,
}

impl<T: TableNode> TransitiveTable<T> {
    /// Creates an empty table for the direct relation `kind`.
    pub fn new(kind: RelationKind) -> Self {
        Self {
            kind,
            graph: Graph::new(),
        }
    }

    /// Relation stored in this table.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Underlying graph.
    pub fn graph(&self) -> &Graph<T> {
        &self.graph
    }

    fn concrete(&self, field: &Field) -> Option<T> {
        if !field.is_valid_concrete(T::ENTITY) {
            return None;
        }
        T::from_field(field)
    }

    fn is_retrieve_valid(&self, first: &Field, second: &Field) -> bool {
        let valid = first.entity_type() == T::ENTITY && second.entity_type() == T::ENTITY;
        if !valid {
            debug!(
                relation = %self.kind,
                first = %first,
                second = %second,
                "pkb.transitive.retrieve_invalid"
            );
        }
        valid
    }

    fn rows(pairs: impl IntoIterator<Item = (T, T)>) -> RelationRows {
        pairs
            .into_iter()
            .map(|(from, to)| (from.to_field(), to.to_field()))
            .collect()
    }

    fn lookup(&self, first: &Field, second: &Field, closure: bool) -> RelationRows {
        if !self.is_retrieve_valid(first, second) {
            return RelationRows::new();
        }
        let first = first.normalized();
        let second = second.normalized();
        match (self.concrete(&first), self.concrete(&second)) {
            (Some(from), Some(to)) => {
                let holds = if closure {
                    self.graph.contains_t(&from, &to)
                } else {
                    self.graph.contains(&from, &to)
                };
                if holds {
                    Self::rows([(from, to)])
                } else {
                    RelationRows::new()
                }
            }
            (Some(from), None) => {
                let filter = T::filter_of(&second);
                let found = if closure {
                    self.graph.traverse_start_t(&from, filter)
                } else {
                    self.graph.traverse_start(&from, filter)
                };
                Self::rows(found.into_iter().map(|to| (from.clone(), to)))
            }
            (None, Some(to)) => {
                let filter = T::filter_of(&first);
                let found = if closure {
                    self.graph.traverse_end_t(filter, &to)
                } else {
                    self.graph.traverse_end(filter, &to)
                };
                Self::rows(found.into_iter().map(|from| (from, to.clone())))
            }
            (None, None) => {
                let (from, to) = (T::filter_of(&first), T::filter_of(&second));
                if closure {
                    Self::rows(self.graph.traverse_all_t(from, to))
                } else {
                    Self::rows(self.graph.traverse_all(from, to))
                }
            }
        }
    }

    fn check_contains(&self, first: &Field, second: &Field) -> Option<(T, T)> {
        match (self.concrete(first), self.concrete(second)) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => {
                debug!(
                    relation = %self.kind,
                    first = %first,
                    second = %second,
                    "pkb.transitive.contains_invalid"
                );
                None
            }
        }
    }
}

impl<T: TableNode> RelationTable for TransitiveTable<T> {
    fn insert(&mut self, first: &Field, second: &Field) -> Result<bool, PkbError> {
        let reject = |position, reason| PkbError::InvalidField {
            relation: self.kind,
            position,
            reason,
        };
        let from = self
            .concrete(first)
            .ok_or_else(|| reject("first", "expected a concrete field of the relation's entity"))?;
        let to = self
            .concrete(second)
            .ok_or_else(|| reject("second", "expected a concrete field of the relation's entity"))?;
        T::check_edge(self.kind, &from, &to).map_err(|reason| PkbError::EdgeRejected {
            relation: self.kind,
            from: first.to_string(),
            to: second.to_string(),
            reason,
        })?;
        if self.kind == RelationKind::Follows && !self.graph.contains(&from, &to) {
            let reason = if self.graph.out_degree(&from) > 0 {
                Some("statement already has a follower")
            } else if self.graph.in_degree(&to) > 0 {
                Some("statement already follows another")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(PkbError::EdgeRejected {
                    relation: self.kind,
                    from: first.to_string(),
                    to: second.to_string(),
                    reason,
                });
            }
        }
        self.graph
            .add_edge(&from, &to)
            .map_err(|EdgeConflict::Redeclared { .. }| PkbError::EdgeRejected {
                relation: self.kind,
                from: first.to_string(),
                to: second.to_string(),
                reason: "statement already recorded with another kind",
            })
    }

    fn contains(&self, first: &Field, second: &Field) -> bool {
        self.check_contains(first, second)
            .is_some_and(|(from, to)| self.graph.contains(&from, &to))
    }

    fn retrieve(&self, first: &Field, second: &Field) -> RelationRows {
        self.lookup(first, second, false)
    }

    fn size(&self) -> usize {
        self.graph.edge_count()
    }
}

impl<T: TableNode> ClosureTable for TransitiveTable<T> {
    fn contains_t(&self, first: &Field, second: &Field) -> bool {
        self.check_contains(first, second)
            .is_some_and(|(from, to)| self.graph.contains_t(&from, &to))
    }

    fn retrieve_t(&self, first: &Field, second: &Field) -> RelationRows {
        self.lookup(first, second, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(number: u32, kind: StatementType) -> Field {
        Field::stmt(number, kind)
    }

    fn follows() -> TransitiveTable<StmtLoc> {
        let mut table: TransitiveTable<StmtLoc> = TransitiveTable::new(RelationKind::Follows);
        let chain = [
            s(1, StatementType::If),
            s(2, StatementType::Assignment),
            s(3, StatementType::While),
            s(4, StatementType::Assignment),
        ];
        for pair in chain.windows(2) {
            table.insert(&pair[0], &pair[1]).unwrap();
        }
        table
    }

    fn firsts(rows: &RelationRows) -> Vec<String> {
        rows.iter().map(|(first, _)| first.to_string()).collect()
    }

    fn seconds(rows: &RelationRows) -> Vec<String> {
        rows.iter().map(|(_, second)| second.to_string()).collect()
    }

    #[test]
    fn follows_keeps_a_single_chain() {
        let mut table = follows();
        let fork = table
            .insert(&s(1, StatementType::If), &s(3, StatementType::While))
            .unwrap_err();
        assert_eq!(fork.code(), "EdgeRejected");
        let join = table
            .insert(&s(2, StatementType::Assignment), &s(4, StatementType::Assignment))
            .unwrap_err();
        assert_eq!(join.code(), "EdgeRejected");
        assert!(!table
            .insert(&s(1, StatementType::If), &s(2, StatementType::Assignment))
            .unwrap());
        assert_eq!(table.size(), 3);

        let after_one = table.retrieve(
            &s(1, StatementType::If),
            &Field::declaration(EntityType::Statement),
        );
        assert_eq!(seconds(&after_one), vec!["2"]);
        let before_three = table.retrieve(
            &Field::declaration(EntityType::Statement),
            &s(3, StatementType::While),
        );
        assert_eq!(firsts(&before_three), vec!["2"]);
    }

    #[test]
    fn parent_allows_many_children() {
        let mut table: TransitiveTable<StmtLoc> = TransitiveTable::new(RelationKind::Parent);
        let w = s(1, StatementType::While);
        table.insert(&w, &s(2, StatementType::Assignment)).unwrap();
        table.insert(&w, &s(3, StatementType::Print)).unwrap();
        assert_eq!(table.graph().out_degree(&StmtLoc::new(1, StatementType::While)), 2);
    }

    #[test]
    fn follows_rejects_backward_edges() {
        let mut table: TransitiveTable<StmtLoc> = TransitiveTable::new(RelationKind::Follows);
        let err = table
            .insert(&s(3, StatementType::Print), &s(2, StatementType::Print))
            .unwrap_err();
        assert_eq!(err.code(), "EdgeRejected");
        assert_eq!(table.size(), 0);
    }

    #[test]
    fn parent_requires_container() {
        let mut table: TransitiveTable<StmtLoc> = TransitiveTable::new(RelationKind::Parent);
        assert!(table
            .insert(&s(1, StatementType::Assignment), &s(2, StatementType::Print))
            .is_err());
        assert_eq!(
            table.insert(&s(1, StatementType::While), &s(2, StatementType::Print)),
            Ok(true)
        );
    }

    #[test]
    fn next_allows_loop_back_edges() {
        let mut table: TransitiveTable<StmtLoc> = TransitiveTable::new(RelationKind::Next);
        table
            .insert(&s(1, StatementType::While), &s(2, StatementType::Assignment))
            .unwrap();
        table
            .insert(&s(2, StatementType::Assignment), &s(1, StatementType::While))
            .unwrap();
        assert!(table.contains_t(&s(2, StatementType::Assignment), &s(2, StatementType::Assignment)));
    }

    #[test]
    fn calls_rejects_recursion() {
        let mut table: TransitiveTable<ProcName> = TransitiveTable::new(RelationKind::Calls);
        assert!(table
            .insert(&Field::proc_name("a"), &Field::proc_name("a"))
            .is_err());
        assert!(table
            .insert(&Field::proc_name("a"), &Field::var("b"))
            .is_err());
    }

    #[test]
    fn retrieve_dispatches_on_concreteness() {
        let table = follows();
        let decl = Field::declaration(EntityType::Statement);
        let before_three = table.retrieve(&decl, &s(3, StatementType::While));
        assert_eq!(firsts(&before_three), vec!["2"]);
        let after_two = table.retrieve_t(&s(2, StatementType::Assignment), &decl);
        assert_eq!(seconds(&after_two), vec!["3", "4"]);
        let assigns = Field::stmt_declaration(StatementType::Assignment);
        let all = table.retrieve_t(&Field::wildcard(EntityType::Statement), &assigns);
        // (1,2) (1,4) (2,4) (3,4)
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn closure_lookup_of_concrete_pair() {
        let table = follows();
        let rows = table.retrieve_t(&s(1, StatementType::If), &s(4, StatementType::Assignment));
        assert_eq!(rows.len(), 1);
        assert!(table
            .retrieve(&s(1, StatementType::If), &s(4, StatementType::Assignment))
            .is_empty());
    }

    #[test]
    fn wrong_entity_type_yields_nothing() {
        let table = follows();
        let rows = table.retrieve(&Field::declaration(EntityType::Variable), &s(2, StatementType::Assignment));
        assert!(rows.is_empty());
        assert!(!table.contains(&Field::var("x"), &s(2, StatementType::Assignment)));
    }
}
