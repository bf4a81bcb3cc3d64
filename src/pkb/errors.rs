#![allow(missing_docs)]

use thiserror::Error;

use super::expr::ExprError;
use super::field::StatementType;
use super::tables::RelationKind;

/// Reasons an insertion into the knowledge base is refused.
///
/// The plain `insert_*` entry points log these and drop the fact; the
/// `try_insert_*` variants hand them back to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PkbError {
    /// An argument had the wrong entity type or was not concrete.
    #[error("{relation} rejects {position} argument: {reason}")]
    InvalidField {
        relation: RelationKind,
        position: &'static str,
        reason: &'static str,
    },
    /// The edge violates a structural rule of the relation.
    #[error("{relation}({from}, {to}) rejected: {reason}")]
    EdgeRejected {
        relation: RelationKind,
        from: String,
        to: String,
        reason: &'static str,
    },
    /// A statement number was already recorded with another kind.
    #[error("statement {number} already recorded as {existing}, not {requested}")]
    StatementConflict {
        number: u32,
        existing: StatementType,
        requested: StatementType,
    },
    /// `All` and `None` are filters, not statement kinds.
    #[error("statement {number} cannot be recorded as {statement_type}")]
    InvalidStatementType {
        number: u32,
        statement_type: StatementType,
    },
    /// Statement numbers start at 1.
    #[error("statement number must be positive")]
    InvalidStatementNumber,
    /// Closure and derived relations are computed, never inserted.
    #[error("{relation} is derived and cannot be inserted")]
    DerivedRelation { relation: RelationKind },
    /// A pattern right-hand side did not parse.
    #[error("statement {stmt}: {source}")]
    InvalidExpression {
        stmt: u32,
        #[source]
        source: ExprError,
    },
}

impl PkbError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PkbError::InvalidField { .. } => "InvalidField",
            PkbError::EdgeRejected { .. } => "EdgeRejected",
            PkbError::StatementConflict { .. } => "StatementConflict",
            PkbError::InvalidStatementType { .. } => "InvalidStatementType",
            PkbError::InvalidStatementNumber => "InvalidStatementNumber",
            PkbError::DerivedRelation { .. } => "DerivedRelation",
            PkbError::InvalidExpression { .. } => "InvalidExpression",
        }
    }
}
