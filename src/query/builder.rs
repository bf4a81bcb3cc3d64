//! Fluent query construction.
//!
//! ```
//! use pkbql::query::{Arg, DesignEntity, QueryBuilder};
//! use pkbql::pkb::RelationKind;
//!
//! let query = QueryBuilder::new()
//!     .declare("a", DesignEntity::Assign)
//!     .declare("v", DesignEntity::Variable)
//!     .select("v")
//!     .such_that(RelationKind::Modifies, "a", "v")
//!     .such_that(RelationKind::Uses, "a", Arg::name("x"))
//!     .build()
//!     .unwrap();
//! assert_eq!(query.such_that.len(), 2);
//! ```

use crate::pkb::{EntityType, RelationKind};

use super::ast::{
    AttrCompare, AttrCompareRef, AttrName, AttrRef, Declaration, DesignEntity, Elem, EntRef,
    ExprSpec, Pattern, Query, RelRef, ResultCl, StmtRef,
};
use super::errors::QueryError;

/// Clause operand before it is resolved against the declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    /// Declared synonym.
    Synonym(String),
    /// Statement number.
    Line(u32),
    /// Quoted variable or procedure name.
    Name(String),
    /// `_`
    Wildcard,
}

impl Arg {
    /// Quoted name operand.
    pub fn name(name: impl Into<String>) -> Self {
        Arg::Name(name.into())
    }
}

impl From<&str> for Arg {
    /// `"_"` is the wildcard; anything else is a synonym.
    fn from(value: &str) -> Self {
        if value == "_" {
            Arg::Wildcard
        } else {
            Arg::Synonym(value.to_owned())
        }
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Arg::Line(value)
    }
}

/// One side of a with clause before resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WithArg {
    /// Integer literal.
    Number(u32),
    /// Quoted name literal.
    Name(String),
    /// `synonym.attribute`
    Attr(String, AttrName),
}

impl From<u32> for WithArg {
    fn from(value: u32) -> Self {
        WithArg::Number(value)
    }
}

impl From<&str> for WithArg {
    fn from(value: &str) -> Self {
        WithArg::Name(value.to_owned())
    }
}

impl From<(&str, AttrName)> for WithArg {
    fn from((synonym, attr): (&str, AttrName)) -> Self {
        WithArg::Attr(synonym.to_owned(), attr)
    }
}

/// Builds a [`Query`], resolving synonyms against the declarations made so
/// far. The first error sticks and is returned by [`QueryBuilder::build`].
#[derive(Debug, Default)]
pub struct QueryBuilder {
    declarations: Vec<Declaration>,
    selected: Option<ResultCl>,
    such_that: Vec<RelRef>,
    patterns: Vec<Pattern>,
    with: Vec<AttrCompare>,
    error: Option<QueryError>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&mut self, synonym: &str, context: &'static str) -> Option<Declaration> {
        let found = self
            .declarations
            .iter()
            .find(|decl| decl.synonym == synonym)
            .cloned();
        if found.is_none() && self.error.is_none() {
            self.error = Some(QueryError::undeclared(synonym, context));
        }
        found
    }

    /// Declares `synonym` as `entity`.
    pub fn declare(mut self, synonym: impl Into<String>, entity: DesignEntity) -> Self {
        self.declarations.push(Declaration::new(synonym, entity));
        self
    }

    fn push_elem(&mut self, elem: Elem) {
        match self.selected.get_or_insert_with(|| ResultCl::Tuple(Vec::new())) {
            ResultCl::Tuple(elems) => elems.push(elem),
            ResultCl::Boolean => {
                self.selected = Some(ResultCl::Tuple(vec![elem]));
            }
        }
    }

    /// Appends a synonym to the select tuple.
    pub fn select(mut self, synonym: &str) -> Self {
        if let Some(decl) = self.lookup(synonym, "select") {
            self.push_elem(Elem::Synonym(decl));
        }
        self
    }

    /// Appends `synonym.attr` to the select tuple.
    pub fn select_attr(mut self, synonym: &str, attr: AttrName) -> Self {
        if let Some(declaration) = self.lookup(synonym, "select") {
            self.push_elem(Elem::Attr(AttrRef { declaration, attr }));
        }
        self
    }

    /// `Select BOOLEAN`.
    pub fn select_boolean(mut self) -> Self {
        self.selected = Some(ResultCl::Boolean);
        self
    }

    fn mismatch(&mut self, relation: RelationKind, operand: String, expected: EntityType) {
        if self.error.is_none() {
            self.error = Some(QueryError::OperandMismatch {
                relation,
                operand,
                expected,
            });
        }
    }

    fn stmt_ref(&mut self, relation: RelationKind, arg: Arg) -> StmtRef {
        match arg {
            Arg::Line(number) => StmtRef::LineNumber(number),
            Arg::Synonym(synonym) => match self.lookup(&synonym, "such that") {
                Some(decl) => StmtRef::Declaration(decl),
                None => StmtRef::Wildcard,
            },
            Arg::Name(name) => {
                self.mismatch(relation, format!("'{name}'"), EntityType::Statement);
                StmtRef::Wildcard
            }
            Arg::Wildcard => StmtRef::Wildcard,
        }
    }

    fn ent_ref(&mut self, relation: RelationKind, arg: Arg, expected: EntityType) -> EntRef {
        match arg {
            Arg::Name(name) => EntRef::Name(name),
            Arg::Synonym(synonym) => match self.lookup(&synonym, "such that") {
                Some(decl) => EntRef::Declaration(decl),
                None => EntRef::Wildcard,
            },
            Arg::Line(number) => {
                self.mismatch(relation, number.to_string(), expected);
                EntRef::Wildcard
            }
            Arg::Wildcard => EntRef::Wildcard,
        }
    }

    fn is_procedure_arg(&self, arg: &Arg) -> bool {
        match arg {
            Arg::Name(_) => true,
            Arg::Synonym(synonym) => self.declarations.iter().any(|decl| {
                &decl.synonym == synonym && decl.entity.entity_type() == EntityType::Procedure
            }),
            _ => false,
        }
    }

    /// Adds `kind(first, second)`. Modifies and Uses pick the statement or
    /// procedure form from the first operand.
    pub fn such_that(
        mut self,
        kind: RelationKind,
        first: impl Into<Arg>,
        second: impl Into<Arg>,
    ) -> Self {
        let (first, second) = (first.into(), second.into());
        let procedure_form = self.is_procedure_arg(&first);
        let rel = match kind {
            RelationKind::Modifies | RelationKind::Uses if procedure_form => {
                let p = self.ent_ref(kind, first, EntityType::Procedure);
                let v = self.ent_ref(kind, second, EntityType::Variable);
                if kind == RelationKind::Modifies {
                    RelRef::ModifiesP(p, v)
                } else {
                    RelRef::UsesP(p, v)
                }
            }
            RelationKind::Modifies | RelationKind::Uses => {
                let s = self.stmt_ref(kind, first);
                let v = self.ent_ref(kind, second, EntityType::Variable);
                if kind == RelationKind::Modifies {
                    RelRef::ModifiesS(s, v)
                } else {
                    RelRef::UsesS(s, v)
                }
            }
            RelationKind::Calls | RelationKind::CallsT => {
                let a = self.ent_ref(kind, first, EntityType::Procedure);
                let b = self.ent_ref(kind, second, EntityType::Procedure);
                if kind == RelationKind::Calls {
                    RelRef::Calls(a, b)
                } else {
                    RelRef::CallsT(a, b)
                }
            }
            _ => {
                let a = self.stmt_ref(kind, first);
                let b = self.stmt_ref(kind, second);
                match kind {
                    RelationKind::Follows => RelRef::Follows(a, b),
                    RelationKind::FollowsT => RelRef::FollowsT(a, b),
                    RelationKind::Parent => RelRef::Parent(a, b),
                    RelationKind::ParentT => RelRef::ParentT(a, b),
                    RelationKind::Next => RelRef::Next(a, b),
                    RelationKind::NextT => RelRef::NextT(a, b),
                    RelationKind::Affects => RelRef::Affects(a, b),
                    _ => RelRef::AffectsT(a, b),
                }
            }
        };
        self.such_that.push(rel);
        self
    }

    /// Adds `pattern synonym(lhs, rhs)`.
    pub fn pattern(mut self, synonym: &str, lhs: impl Into<Arg>, rhs: ExprSpec) -> Self {
        let Some(decl) = self.lookup(synonym, "pattern") else {
            return self;
        };
        let lhs = match lhs.into() {
            Arg::Line(number) => {
                self.mismatch(RelationKind::Modifies, number.to_string(), EntityType::Variable);
                EntRef::Wildcard
            }
            Arg::Synonym(name) => match self.lookup(&name, "pattern") {
                Some(decl) => EntRef::Declaration(decl),
                None => EntRef::Wildcard,
            },
            Arg::Name(name) => EntRef::Name(name),
            Arg::Wildcard => EntRef::Wildcard,
        };
        self.patterns.push(Pattern {
            synonym: decl,
            lhs,
            rhs,
        });
        self
    }

    fn compare_ref(&mut self, arg: WithArg) -> AttrCompareRef {
        match arg {
            WithArg::Number(value) => AttrCompareRef::Number(value),
            WithArg::Name(name) => AttrCompareRef::String(name),
            WithArg::Attr(synonym, attr) => match self.lookup(&synonym, "with") {
                Some(declaration) => AttrCompareRef::Attr(AttrRef { declaration, attr }),
                None => AttrCompareRef::String(synonym),
            },
        }
    }

    /// Adds `with lhs = rhs`.
    pub fn with(mut self, lhs: impl Into<WithArg>, rhs: impl Into<WithArg>) -> Self {
        let lhs = self.compare_ref(lhs.into());
        let rhs = self.compare_ref(rhs.into());
        self.with.push(AttrCompare { lhs, rhs });
        self
    }

    /// Finishes the query and validates it. A builder with nothing selected
    /// selects BOOLEAN.
    pub fn build(self) -> Result<Query, QueryError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let query = Query {
            declarations: self.declarations,
            result: self.selected.unwrap_or(ResultCl::Boolean),
            such_that: self.such_that,
            patterns: self.patterns,
            with: self.with,
        };
        query.validate()?;
        Ok(query)
    }
}
