//! Shared input-classification types.
//!
//! The source API accepted a scalar, a flat list, or a list of lists in the
//! same parameter position and told them apart with runtime type checks.
//! Here every such parameter is a tagged variant, and the cardinality rule
//! lives in one place ([`ValueSet::classify`]) so insert, replace and update
//! cannot drift apart.

use crate::value::Value;

/// Column selection for select/insert/replace.
///
/// `All` renders as `*` in a SELECT; for inserts it must first be resolved
/// against the table's metadata so the placeholder group has a known width.
#[derive(Debug, Clone, PartialEq)]
pub enum Columns {
    All,
    Named(Vec<String>),
}

impl Columns {
    /// Number of named columns, or `None` for `All`.
    pub fn len(&self) -> Option<usize> {
        match self {
            Columns::All => None,
            Columns::Named(names) => Some(names.len()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Columns::All)
    }

    /// Comma-joined rendering, `*` for `All`.
    pub fn render(&self) -> String {
        match self {
            Columns::All => "*".to_string(),
            Columns::Named(names) => names.join(", "),
        }
    }
}

impl From<&str> for Columns {
    fn from(s: &str) -> Self {
        if s == "*" {
            Columns::All
        } else {
            Columns::Named(vec![s.to_string()])
        }
    }
}

impl From<Vec<&str>> for Columns {
    fn from(names: Vec<&str>) -> Self {
        Columns::Named(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Columns {
    fn from(names: Vec<String>) -> Self {
        Columns::Named(names)
    }
}

/// The payload of an insert, replace or update.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSet {
    /// One bare value.
    Scalar(Value),
    /// One flat sequence of values.
    Row(Vec<Value>),
    /// A sequence of rows.
    Rows(Vec<Vec<Value>>),
}

/// How a [`ValueSet`] is dispatched: bound once, or once per row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowPlan {
    Single(Vec<Value>),
    Batch(Vec<Vec<Value>>),
}

impl ValueSet {
    pub fn scalar(v: impl Into<Value>) -> Self {
        ValueSet::Scalar(v.into())
    }

    pub fn row<V: Into<Value>>(vals: Vec<V>) -> Self {
        ValueSet::Row(vals.into_iter().map(Into::into).collect())
    }

    pub fn rows<V: Into<Value>>(rows: Vec<Vec<V>>) -> Self {
        ValueSet::Rows(
            rows.into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// Resolve the cardinality of this payload against `column_count`.
    ///
    /// The rule, applied identically on every write path:
    ///
    /// 1. `Rows` is always a batch; every row must have `column_count` values.
    /// 2. A flat `Row` of more than one value against a single column is a
    ///    batch of single-column rows, not one wide row.
    /// 3. A `Scalar` is a single one-element row (single column only).
    /// 4. Any other flat `Row` is a single row and must match the width.
    ///
    /// Width mismatches are reported as `Err(message)`; the caller attaches
    /// the statement text.
    pub fn classify(self, column_count: usize) -> Result<RowPlan, String> {
        match self {
            ValueSet::Rows(rows) => {
                for (i, row) in rows.iter().enumerate() {
                    if row.len() != column_count {
                        return Err(format!(
                            "row {} has {} values, expected {}",
                            i,
                            row.len(),
                            column_count
                        ));
                    }
                }
                Ok(RowPlan::Batch(rows))
            }
            ValueSet::Row(vals) if column_count == 1 && vals.len() > 1 => {
                Ok(RowPlan::Batch(vals.into_iter().map(|v| vec![v]).collect()))
            }
            ValueSet::Scalar(v) => {
                if column_count != 1 {
                    return Err(format!("one value given for {column_count} columns"));
                }
                Ok(RowPlan::Single(vec![v]))
            }
            ValueSet::Row(vals) => {
                if vals.len() != column_count {
                    return Err(format!(
                        "{} values given for {} columns",
                        vals.len(),
                        column_count
                    ));
                }
                Ok(RowPlan::Single(vals))
            }
        }
    }
}

/// A WHERE/HAVING condition: trusted boolean expressions joined with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    clauses: Vec<String>,
}

impl Condition {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            clauses: vec![expr.into()],
        }
    }

    pub fn all<S: Into<String>>(exprs: Vec<S>) -> Self {
        Self {
            clauses: exprs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(mut self, expr: impl Into<String>) -> Self {
        self.clauses.push(expr.into());
        self
    }

    /// AND-joined rendering, matching the source's layout.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, clause) in self.clauses.iter().enumerate() {
            if i == 0 {
                out.push_str(clause);
            } else {
                out.push_str("\n\tAND ");
                out.push_str(clause);
            }
        }
        out
    }
}

impl From<&str> for Condition {
    fn from(expr: &str) -> Self {
        Condition::new(expr)
    }
}

impl From<Vec<&str>> for Condition {
    fn from(exprs: Vec<&str>) -> Self {
        Condition::all(exprs)
    }
}

/// Join flavor keyword.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::Cross => "CROSS",
        }
    }
}

/// One `<kind> JOIN <table> ON <condition>` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: String,
}

impl Join {
    pub fn new(kind: JoinKind, table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            on: on.into(),
        }
    }
}

/// A `FOREIGN KEY (column) REFERENCES ref_table (ref_column)` clause with
/// optional trailing clauses such as `ON DELETE CASCADE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub extra: Vec<String>,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.extra.push(clause.into());
        self
    }
}

/// LIMIT with optional OFFSET.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitOffset {
    pub limit: u64,
    pub offset: Option<u64>,
}

impl LimitOffset {
    pub fn limit(limit: u64) -> Self {
        Self {
            limit,
            offset: None,
        }
    }

    pub fn with_offset(limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset: Some(offset),
        }
    }
}
