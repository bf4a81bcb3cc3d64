//! Program knowledge base and PQL query engine.
//!
//! Facts extracted from a SIMPLE program are loaded into a [`pkb::Pkb`];
//! queries built with [`query::QueryBuilder`] (or deserialized into a
//! [`query::Query`]) are then answered by a [`query::Evaluator`].
//!
//! ```
//! use pkbql::pkb::{Field, Pkb, RelationKind, StatementType};
//! use pkbql::query::{DesignEntity, Evaluator, QueryBuilder};
//! use pkbql::Config;
//!
//! let mut pkb = Pkb::new();
//! pkb.insert_statement(StatementType::Assignment, 1);
//! pkb.insert_statement(StatementType::Assignment, 2);
//! pkb.insert_relationship(
//!     RelationKind::Follows,
//!     &Field::stmt(1, StatementType::Assignment),
//!     &Field::stmt(2, StatementType::Assignment),
//! );
//!
//! let query = QueryBuilder::new()
//!     .declare("a", DesignEntity::Assign)
//!     .select("a")
//!     .such_that(RelationKind::Follows, "a", "_")
//!     .build()
//!     .unwrap();
//! let rows = Evaluator::new(&pkb, &Config::default())
//!     .evaluate(&query)
//!     .unwrap()
//!     .into_strings();
//! assert_eq!(rows, vec!["1"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod pkb;
pub mod query;

pub use config::Config;
pub use error::{Error, Result};
