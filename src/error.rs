use thiserror::Error;

/// Errors surfaced by statement building and session execution.
///
/// Engine rejections are caught at the call site, the open transaction is
/// rolled back, and the offending statement text is attached for diagnosis.
/// A failed operation never tears down the session.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent structured input, detected before dispatch.
    #[error("invalid statement input: {message}\nstatement:\n{statement}")]
    Build { message: String, statement: String },

    /// The engine rejected the statement (syntax, constraint, missing table).
    #[error("engine rejected statement: {source}\nstatement:\n{statement}")]
    Engine {
        source: rusqlite::Error,
        statement: String,
    },

    /// Metadata lookup against a table that does not exist.
    #[error("no such table: {table}")]
    TableNotFound { table: String },

    /// Connection or transaction-control failure with no single statement.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn build(message: impl Into<String>, statement: impl Into<String>) -> Self {
        Error::Build {
            message: message.into(),
            statement: statement.into(),
        }
    }

    pub(crate) fn engine(source: rusqlite::Error, statement: impl Into<String>) -> Self {
        Error::Engine {
            source,
            statement: statement.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
