//! Statement building and result shaping over an embedded SQLite connection.
//!
//! # Intention
//!
//! - Turn structured arguments (tables, column lists, conditions, payloads)
//!   into deterministic SQL text with an aligned positional parameter list.
//! - Dispatch statements through a session-owned connection and normalize
//!   raw row tuples into the minimal shape a caller wants back.
//! - Resolve ambiguous payload cardinality (one value, one row, many rows)
//!   with a single explicit rule shared by every write path.
//!
//! # Architectural Boundaries
//!
//! - The engine itself (execution, constraints, durability) stays behind
//!   `rusqlite`; this crate only renders text and reshapes rows.
//! - Identifiers and condition expressions are trusted as-is. There is no
//!   parsing, validation or escaping here.
//! - No async surface and no pooling: one connection per [`Session`], used
//!   synchronously.

pub mod error;
pub mod input;
pub mod normalize;
pub mod session;
pub mod statement;
pub mod value;

pub use error::{Error, Result};
pub use input::{Columns, Condition, ForeignKey, Join, JoinKind, LimitOffset, RowPlan, ValueSet};
pub use normalize::{normalize, NormalizedResult};
pub use session::{ColumnInfo, Session, SessionConfig};
pub use statement::{CreateTable, Insert, Prepared, Select, SqlQuery, Update};
pub use value::Value;
