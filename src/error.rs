//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::pkb::PkbError;
use crate::query::QueryError;

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure surfaced by the crate.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Pkb(#[from] PkbError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Machine-readable code of the wrapped error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Pkb(err) => err.code(),
            Error::Query(err) => err.code(),
            Error::Config(err) => err.code(),
        }
    }
}
