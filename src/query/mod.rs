#![forbid(unsafe_code)]

//! PQL query model, optimizer and evaluator.
//!
//! A [`Query`] is validated, split into [`ClauseGroup`]s by the
//! [`Optimizer`], evaluated group by group into [`ResultTable`]s and finally
//! projected onto its select clause.

/// Structured query representation.
///
/// Declarations, such-that, pattern and with clauses, and the select list.
pub mod ast;

/// Query builder for programmatic query construction.
pub mod builder;

/// Validation errors.
pub mod errors;

/// Query evaluation driver.
pub mod evaluator;

/// Clause evaluation against the PKB.
pub mod handler;

/// Clause grouping and scheduling.
///
/// Decides the order in which clauses are evaluated and joined.
pub mod optimizer;

/// Performance profiling for query evaluation.
///
/// Collects timing and count statistics per evaluation phase.
pub mod profile;

/// Rendering of the final table.
pub mod projector;

/// Join engine.
pub mod result_table;

pub use ast::{
    AttrCompare, AttrCompareRef, AttrName, AttrRef, Declaration, DesignEntity, Elem, EntRef,
    ExprSpec, Pattern, Query, RelRef, ResultCl, StmtRef,
};
pub use builder::{Arg, QueryBuilder, WithArg};
pub use errors::QueryError;
pub use evaluator::Evaluator;
pub use handler::{attribute_value, AttrValue, ClauseHandler};
pub use optimizer::{Clause, ClauseGroup, Optimizer, OrderedClause};
pub use projector::{QueryOutput, ResultProjector};
pub use result_table::ResultTable;
