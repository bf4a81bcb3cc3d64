#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::collections::BTreeSet;

use thiserror::Error;

use crate::pkb::{EntityType, ExprError, Postfix, RelationKind};

use super::ast::{
    ArgRef, AttrCompare, AttrCompareRef, AttrRef, Declaration, DesignEntity, Elem, ExprSpec,
    Pattern, Query, RelRef, StmtRef,
};

/// Semantic errors found while validating a [`Query`].
///
/// The evaluator rejects invalid queries before touching the PKB, so callers
/// can tell a malformed query apart from a query with no results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A synonym was declared more than once.
    #[error("duplicate synonym '{synonym}'")]
    DuplicateSynonym { synonym: String },
    /// Referenced synonym was never declared.
    #[error("undeclared synonym '{synonym}' referenced in {context}")]
    UndeclaredSynonym {
        synonym: String,
        context: &'static str,
    },
    /// A clause carries a design entity different from the declaration.
    #[error("synonym '{synonym}' is declared as {declared}, not {used}")]
    EntityMismatch {
        synonym: String,
        declared: DesignEntity,
        used: DesignEntity,
    },
    /// Modifies and Uses never take `_` as the first argument.
    #[error("{relation} does not accept a wildcard first argument")]
    WildcardModifier { relation: RelationKind },
    /// A synonym of the wrong design entity in a relationship argument.
    #[error("{relation} {position} argument '{synonym}' must be {expected}, not {entity}")]
    InvalidArgument {
        relation: RelationKind,
        position: &'static str,
        synonym: String,
        entity: DesignEntity,
        expected: EntityType,
    },
    /// A literal of the wrong kind in a relationship argument.
    #[error("{relation} does not accept {operand} where a {expected} is expected")]
    OperandMismatch {
        relation: RelationKind,
        operand: String,
        expected: EntityType,
    },
    /// A statement number of zero.
    #[error("{relation} statement numbers start at 1")]
    InvalidLineNumber { relation: RelationKind },
    /// The attribute does not exist for the synonym's design entity.
    #[error("{entity} synonym '{synonym}' has no attribute {attr}")]
    InvalidAttribute {
        synonym: String,
        entity: DesignEntity,
        attr: String,
    },
    /// The two sides of a with clause compare an integer with a name.
    #[error("with clause compares {lhs} with {rhs} of a different type")]
    WithTypeMismatch { lhs: String, rhs: String },
    /// Pattern synonyms must be assign, if or while.
    #[error("pattern synonym '{synonym}' is {entity}; expected assign, if or while")]
    InvalidPatternSynonym {
        synonym: String,
        entity: DesignEntity,
    },
    /// If and while patterns only accept `_` on the right.
    #[error("pattern on {entity} '{synonym}' accepts only a wildcard expression")]
    ContainerPatternExpression {
        synonym: String,
        entity: DesignEntity,
    },
    /// Pattern left-hand side synonym must be a variable.
    #[error("pattern left-hand side '{synonym}' must be a variable, not {entity}")]
    InvalidPatternLhs {
        synonym: String,
        entity: DesignEntity,
    },
    /// Pattern expression does not parse.
    #[error("malformed pattern expression '{expr}': {source}")]
    MalformedExpression {
        expr: String,
        #[source]
        source: ExprError,
    },
}

impl QueryError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::DuplicateSynonym { .. } => "DuplicateSynonym",
            QueryError::UndeclaredSynonym { .. } => "UndeclaredSynonym",
            QueryError::EntityMismatch { .. } => "EntityMismatch",
            QueryError::WildcardModifier { .. } => "WildcardModifier",
            QueryError::InvalidArgument { .. } => "InvalidArgument",
            QueryError::OperandMismatch { .. } => "InvalidArgument",
            QueryError::InvalidLineNumber { .. } => "InvalidLineNumber",
            QueryError::InvalidAttribute { .. } => "InvalidAttribute",
            QueryError::WithTypeMismatch { .. } => "WithTypeMismatch",
            QueryError::InvalidPatternSynonym { .. } => "InvalidPatternSynonym",
            QueryError::ContainerPatternExpression { .. } => "InvalidPatternSynonym",
            QueryError::InvalidPatternLhs { .. } => "InvalidArgument",
            QueryError::MalformedExpression { .. } => "MalformedExpression",
        }
    }

    /// Builds an [`QueryError::UndeclaredSynonym`] for a specific context.
    pub fn undeclared(synonym: impl Into<String>, context: &'static str) -> Self {
        QueryError::UndeclaredSynonym {
            synonym: synonym.into(),
            context,
        }
    }
}

struct Validator<'q> {
    query: &'q Query,
}

impl<'q> Validator<'q> {
    fn declarations(&self) -> Result<(), QueryError> {
        let mut seen = BTreeSet::new();
        for decl in &self.query.declarations {
            if !seen.insert(decl.synonym.as_str()) {
                return Err(QueryError::DuplicateSynonym {
                    synonym: decl.synonym.clone(),
                });
            }
        }
        Ok(())
    }

    fn declared(&self, used: &Declaration, context: &'static str) -> Result<(), QueryError> {
        let declared = self
            .query
            .declaration(&used.synonym)
            .ok_or_else(|| QueryError::undeclared(&used.synonym, context))?;
        if declared.entity != used.entity {
            return Err(QueryError::EntityMismatch {
                synonym: used.synonym.clone(),
                declared: declared.entity,
                used: used.entity,
            });
        }
        Ok(())
    }

    fn attr(&self, attr: &AttrRef, context: &'static str) -> Result<(), QueryError> {
        self.declared(&attr.declaration, context)?;
        if !attr.declaration.entity.has_attribute(attr.attr) {
            return Err(QueryError::InvalidAttribute {
                synonym: attr.declaration.synonym.clone(),
                entity: attr.declaration.entity,
                attr: attr.attr.to_string(),
            });
        }
        Ok(())
    }

    fn arg(
        &self,
        relation: RelationKind,
        position: &'static str,
        arg: ArgRef<'_>,
    ) -> Result<(), QueryError> {
        if let ArgRef::Stmt(StmtRef::LineNumber(0)) = arg {
            return Err(QueryError::InvalidLineNumber { relation });
        }
        let Some(decl) = arg.declaration() else {
            return Ok(());
        };
        self.declared(decl, "such that")?;
        let expected = arg.expected();
        if decl.entity.entity_type() != expected {
            return Err(QueryError::InvalidArgument {
                relation,
                position,
                synonym: decl.synonym.clone(),
                entity: decl.entity,
                expected,
            });
        }
        Ok(())
    }

    fn relation(&self, rel: &RelRef) -> Result<(), QueryError> {
        let relation = rel.kind();
        let (first, second) = rel.args();
        if matches!(relation, RelationKind::Modifies | RelationKind::Uses) && first.is_wildcard() {
            return Err(QueryError::WildcardModifier { relation });
        }
        self.arg(relation, "first", first)?;
        self.arg(relation, "second", second)
    }

    fn pattern(&self, pattern: &Pattern) -> Result<(), QueryError> {
        let decl = &pattern.synonym;
        self.declared(decl, "pattern")?;
        match decl.entity {
            DesignEntity::Assign => {}
            DesignEntity::If | DesignEntity::While => {
                if pattern.rhs != ExprSpec::Wildcard {
                    return Err(QueryError::ContainerPatternExpression {
                        synonym: decl.synonym.clone(),
                        entity: decl.entity,
                    });
                }
            }
            entity => {
                return Err(QueryError::InvalidPatternSynonym {
                    synonym: decl.synonym.clone(),
                    entity,
                })
            }
        }
        if let Some(lhs) = pattern.lhs_arg().declaration() {
            self.declared(lhs, "pattern")?;
            if lhs.entity != DesignEntity::Variable {
                return Err(QueryError::InvalidPatternLhs {
                    synonym: lhs.synonym.clone(),
                    entity: lhs.entity,
                });
            }
        }
        match &pattern.rhs {
            ExprSpec::Wildcard => Ok(()),
            ExprSpec::Full(expr) | ExprSpec::Partial(expr) => Postfix::parse(expr)
                .map(|_| ())
                .map_err(|source| QueryError::MalformedExpression {
                    expr: expr.clone(),
                    source,
                }),
        }
    }

    fn with(&self, with: &AttrCompare) -> Result<(), QueryError> {
        for side in [&with.lhs, &with.rhs] {
            if let AttrCompareRef::Attr(attr) = side {
                self.attr(attr, "with")?;
            }
        }
        if with.lhs.is_numeric() != with.rhs.is_numeric() {
            return Err(QueryError::WithTypeMismatch {
                lhs: with.lhs.to_string(),
                rhs: with.rhs.to_string(),
            });
        }
        Ok(())
    }

    fn run(&self) -> Result<(), QueryError> {
        self.declarations()?;
        for elem in self.query.selected() {
            match elem {
                Elem::Synonym(decl) => self.declared(decl, "select")?,
                Elem::Attr(attr) => self.attr(attr, "select")?,
            }
        }
        for rel in &self.query.such_that {
            self.relation(rel)?;
        }
        for pattern in &self.query.patterns {
            self.pattern(pattern)?;
        }
        for with in &self.query.with {
            self.with(with)?;
        }
        Ok(())
    }
}

impl Query {
    /// Checks the query against the PQL semantic rules.
    pub fn validate(&self) -> Result<(), QueryError> {
        Validator { query: self }.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::{AttrName, EntRef, ResultCl};

    fn decl(synonym: &str, entity: DesignEntity) -> Declaration {
        Declaration::new(synonym, entity)
    }

    fn query(declarations: Vec<Declaration>) -> Query {
        Query {
            declarations,
            result: ResultCl::Boolean,
            such_that: Vec::new(),
            patterns: Vec::new(),
            with: Vec::new(),
        }
    }

    #[test]
    fn duplicate_synonyms_rejected() {
        let q = query(vec![
            decl("s", DesignEntity::Stmt),
            decl("s", DesignEntity::Assign),
        ]);
        assert_eq!(q.validate().unwrap_err().code(), "DuplicateSynonym");
    }

    #[test]
    fn modifies_rejects_wildcard_first_and_non_variable_second() {
        let mut q = query(vec![decl("s", DesignEntity::Stmt), decl("p", DesignEntity::Procedure)]);
        q.such_that.push(RelRef::ModifiesS(StmtRef::Wildcard, EntRef::Wildcard));
        assert_eq!(q.validate().unwrap_err().code(), "WildcardModifier");

        q.such_that[0] = RelRef::UsesS(
            StmtRef::Declaration(decl("s", DesignEntity::Stmt)),
            EntRef::Declaration(decl("p", DesignEntity::Procedure)),
        );
        assert_eq!(q.validate().unwrap_err().code(), "InvalidArgument");
    }

    #[test]
    fn mismatched_declaration_rejected() {
        let mut q = query(vec![decl("a", DesignEntity::Assign)]);
        q.result = ResultCl::Tuple(vec![Elem::Synonym(decl("a", DesignEntity::Stmt))]);
        assert_eq!(q.validate().unwrap_err().code(), "EntityMismatch");
        q.result = ResultCl::Tuple(vec![Elem::Synonym(decl("b", DesignEntity::Stmt))]);
        assert_eq!(q.validate().unwrap_err().code(), "UndeclaredSynonym");
    }

    #[test]
    fn attributes_checked_per_entity() {
        let mut q = query(vec![decl("c", DesignEntity::Call)]);
        q.with.push(AttrCompare {
            lhs: AttrCompareRef::Attr(AttrRef {
                declaration: decl("c", DesignEntity::Call),
                attr: AttrName::VarName,
            }),
            rhs: AttrCompareRef::String("x".into()),
        });
        assert_eq!(q.validate().unwrap_err().code(), "InvalidAttribute");

        q.with[0].lhs = AttrCompareRef::Attr(AttrRef {
            declaration: decl("c", DesignEntity::Call),
            attr: AttrName::StmtNo,
        });
        assert_eq!(q.validate().unwrap_err().code(), "WithTypeMismatch");
    }

    #[test]
    fn pattern_rules() {
        let mut q = query(vec![decl("w", DesignEntity::While), decl("s", DesignEntity::Stmt)]);
        q.patterns.push(Pattern {
            synonym: decl("w", DesignEntity::While),
            lhs: EntRef::Wildcard,
            rhs: ExprSpec::Partial("x".into()),
        });
        assert_eq!(q.validate().unwrap_err().code(), "InvalidPatternSynonym");

        q.patterns[0].synonym = decl("s", DesignEntity::Stmt);
        q.patterns[0].rhs = ExprSpec::Wildcard;
        assert_eq!(q.validate().unwrap_err().code(), "InvalidPatternSynonym");
    }

    #[test]
    fn malformed_expression_rejected() {
        let mut q = query(vec![decl("a", DesignEntity::Assign)]);
        q.patterns.push(Pattern {
            synonym: decl("a", DesignEntity::Assign),
            lhs: EntRef::Wildcard,
            rhs: ExprSpec::Full("x + ".into()),
        });
        let err = q.validate().unwrap_err();
        assert!(matches!(err, QueryError::MalformedExpression { .. }));
    }
}
