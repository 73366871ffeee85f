//! The result normalizer.
//!
//! Raw results come back from the engine as a sequence of fixed-width rows.
//! Callers rarely want the full nesting: a single selected column reads
//! better as a flat list, a single row as a flat list of its values. The
//! transform only collapses wrappers, it never drops a value, and the
//! original shape stays recoverable from the query's column list.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A query result with unambiguous container nesting removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NormalizedResult {
    /// The query matched no rows.
    Empty,
    /// One column, any number of rows: the per-row wrappers are dropped.
    Column(Vec<Value>),
    /// Several columns, exactly one row: the outer sequence is dropped.
    Row(Vec<Value>),
    /// Several columns, several rows (or prettify disabled): unchanged.
    Table(Vec<Vec<Value>>),
}

impl NormalizedResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, NormalizedResult::Empty)
    }

    /// Number of rows in the result, whatever its shape.
    pub fn row_count(&self) -> usize {
        match self {
            NormalizedResult::Empty => 0,
            NormalizedResult::Column(values) => values.len(),
            NormalizedResult::Row(_) => 1,
            NormalizedResult::Table(rows) => rows.len(),
        }
    }

    /// The single scalar of a one-column one-row result, if that is the shape.
    pub fn scalar(&self) -> Option<&Value> {
        match self {
            NormalizedResult::Column(values) if values.len() == 1 => values.first(),
            _ => None,
        }
    }
}

/// Reshape raw rows by cardinality.
///
/// With `prettify` off the rows pass through untouched (apart from the
/// empty-result marker). With it on, single-column results flatten to a list
/// of scalars and a lone multi-column row flattens to a list of values.
pub fn normalize(rows: Vec<Vec<Value>>, prettify: bool) -> NormalizedResult {
    if rows.is_empty() {
        return NormalizedResult::Empty;
    }
    if !prettify {
        return NormalizedResult::Table(rows);
    }
    let width = rows[0].len();
    if width == 1 {
        return NormalizedResult::Column(
            rows.into_iter()
                .map(|mut row| row.remove(0))
                .collect(),
        );
    }
    if rows.len() == 1 {
        let row = rows.into_iter().next().unwrap_or_default();
        return NormalizedResult::Row(row);
    }
    NormalizedResult::Table(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(vals: Vec<i64>) -> Vec<Value> {
        vals.into_iter().map(Value::Integer).collect()
    }

    #[test]
    fn no_rows_is_empty_not_an_error() {
        assert_eq!(normalize(vec![], true), NormalizedResult::Empty);
        assert_eq!(normalize(vec![], false), NormalizedResult::Empty);
    }

    #[test]
    fn single_column_flattens_to_scalars() {
        let rows = vec![ints(vec![1]), ints(vec![2]), ints(vec![3])];
        assert_eq!(
            normalize(rows, true),
            NormalizedResult::Column(ints(vec![1, 2, 3]))
        );
    }

    #[test]
    fn single_wide_row_flattens_when_prettified() {
        let rows = vec![ints(vec![1, 2, 3])];
        assert_eq!(
            normalize(rows.clone(), true),
            NormalizedResult::Row(ints(vec![1, 2, 3]))
        );
        // Disabled, the one-element row sequence is preserved.
        assert_eq!(normalize(rows.clone(), false), NormalizedResult::Table(rows));
    }

    #[test]
    fn many_wide_rows_keep_full_nesting() {
        let rows = vec![ints(vec![1, 2]), ints(vec![3, 4])];
        assert_eq!(
            normalize(rows.clone(), true),
            NormalizedResult::Table(rows)
        );
    }

    #[test]
    fn row_count_survives_every_shape() {
        assert_eq!(normalize(vec![], true).row_count(), 0);
        assert_eq!(normalize(vec![ints(vec![1]), ints(vec![2])], true).row_count(), 2);
        assert_eq!(normalize(vec![ints(vec![1, 2])], true).row_count(), 1);
        assert_eq!(
            normalize(vec![ints(vec![1, 2]), ints(vec![3, 4])], true).row_count(),
            2
        );
    }

    #[test]
    fn scalar_accessor() {
        let result = normalize(vec![ints(vec![5])], true);
        assert_eq!(result.scalar(), Some(&Value::Integer(5)));
        assert_eq!(normalize(vec![ints(vec![1, 2])], true).scalar(), None);
    }
}
