//! The statement builder.
//!
//! Everything here renders SQL text plus an aligned positional parameter
//! list and never touches a connection. Identifiers and condition text are
//! trusted as-is; the only validation performed is structural (column counts
//! against value widths, required pieces present).

use crate::error::{Error, Result};
use crate::input::{Columns, Condition, ForeignKey, Join, LimitOffset, RowPlan, ValueSet};
use crate::value::Value;

/// One renderable statement with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }
}

/// A built write: bound once, or prepared once and executed per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Single(SqlQuery),
    Batch { sql: String, rows: Vec<Vec<Value>> },
}

impl Prepared {
    /// The statement text, whichever way it is dispatched.
    pub fn sql(&self) -> &str {
        match self {
            Prepared::Single(query) => &query.sql,
            Prepared::Batch { sql, .. } => sql,
        }
    }
}

/// Builder for `CREATE TABLE` statements.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    table: String,
    columns: Vec<String>,
    unique: Vec<String>,
    primary_key: Option<String>,
    foreign_keys: Vec<ForeignKey>,
}

impl CreateTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            unique: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    /// Add one column definition, e.g. `"name TEXT NOT NULL"`.
    pub fn column(mut self, definition: impl Into<String>) -> Self {
        self.columns.push(definition.into());
        self
    }

    /// Add several column definitions at once.
    pub fn columns<S: Into<String>>(mut self, definitions: Vec<S>) -> Self {
        self.columns.extend(definitions.into_iter().map(Into::into));
        self
    }

    /// Declare a `UNIQUE (...)` constraint over the named columns.
    pub fn unique<S: Into<String>>(mut self, names: Vec<S>) -> Self {
        self.unique = names.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the `PRIMARY KEY (...)` columns (comma-joined text accepted).
    pub fn primary_key(mut self, names: impl Into<String>) -> Self {
        self.primary_key = Some(names.into());
        self
    }

    pub fn foreign_key(mut self, key: ForeignKey) -> Self {
        self.foreign_keys.push(key);
        self
    }

    pub fn build(&self) -> Result<SqlQuery> {
        if self.columns.is_empty() {
            return Err(Error::build(
                "a table needs at least one column definition",
                format!("CREATE TABLE {} ();", self.table),
            ));
        }
        let mut sql = format!("CREATE TABLE {} ({}", self.table, self.columns.join(",\n\t"));
        if !self.unique.is_empty() {
            sql.push_str(&format!(",\n\tUNIQUE ({})", self.unique.join(", ")));
        }
        if let Some(pk) = &self.primary_key {
            sql.push_str(&format!(",\n\tPRIMARY KEY ({pk})"));
        }
        for key in &self.foreign_keys {
            sql.push_str(&format!(
                ",\n\tFOREIGN KEY ({})\n\tREFERENCES {} ({})",
                key.column, key.ref_table, key.ref_column
            ));
            for clause in &key.extra {
                sql.push_str(&format!("\n\t\t{clause}"));
            }
        }
        sql.push_str("\n);");
        Ok(SqlQuery::new(sql))
    }
}

/// Builder for `SELECT` statements.
///
/// Clauses are appended in a fixed order: JOIN, WHERE, ORDER BY, LIMIT,
/// GROUP BY, HAVING. That order is inherited from the API this replaces and
/// is kept for compatibility.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    columns: Columns,
    distinct: bool,
    joins: Vec<Join>,
    filter: Option<Condition>,
    order_by: Vec<String>,
    limit: Option<LimitOffset>,
    group_by: Vec<String>,
    having: Option<String>,
}

impl Select {
    pub fn new(table: impl Into<String>, columns: impl Into<Columns>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into(),
            distinct: false,
            joins: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            limit: None,
            group_by: Vec::new(),
            having: None,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn filter(mut self, condition: impl Into<Condition>) -> Self {
        self.filter = Some(condition.into());
        self
    }

    /// Add one `ORDER BY` item, e.g. `"age DESC"`.
    pub fn order_by(mut self, item: impl Into<String>) -> Self {
        self.order_by.push(item.into());
        self
    }

    pub fn limit(mut self, limit: LimitOffset) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn group_by(mut self, item: impl Into<String>) -> Self {
        self.group_by.push(item.into());
        self
    }

    pub fn having(mut self, condition: impl Into<String>) -> Self {
        self.having = Some(condition.into());
        self
    }

    pub fn build(&self) -> SqlQuery {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&render_list(&match &self.columns {
            Columns::All => vec!["*".to_string()],
            Columns::Named(names) => names.clone(),
        }));
        sql.push_str(&format!("\nFROM {}", self.table));
        for join in &self.joins {
            sql.push_str(&format!(
                "\n\t{} JOIN {} ON {}",
                join.kind.keyword(),
                join.table,
                join.on
            ));
        }
        if let Some(filter) = &self.filter {
            sql.push_str(&format!("\nWHERE {}", filter.render()));
        }
        if !self.order_by.is_empty() {
            sql.push_str("\nORDER BY ");
            sql.push_str(&render_list(&self.order_by));
        }
        if let Some(limit) = &self.limit {
            match limit.offset {
                Some(offset) => sql.push_str(&format!("\nLIMIT {} OFFSET {}", limit.limit, offset)),
                None => sql.push_str(&format!("\nLIMIT {}", limit.limit)),
            }
        }
        if !self.group_by.is_empty() {
            sql.push_str("\nGROUP BY ");
            sql.push_str(&render_list(&self.group_by));
        }
        if let Some(having) = &self.having {
            sql.push_str(&format!("\nHAVING {having}"));
        }
        sql.push(';');
        SqlQuery::new(sql)
    }
}

// Single item inline, several items one per indented line.
fn render_list(items: &[String]) -> String {
    items.join(",\n\t")
}

/// Builder for `INSERT [OR REPLACE] INTO` statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: String,
    columns: Columns,
    values: ValueSet,
    replace: bool,
}

impl Insert {
    pub fn new(table: impl Into<String>, columns: impl Into<Columns>, values: ValueSet) -> Self {
        Self {
            table: table.into(),
            columns: columns.into(),
            values,
            replace: false,
        }
    }

    /// Switch to `INSERT OR REPLACE INTO`.
    pub fn or_replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns_are_all(&self) -> bool {
        self.columns.is_all()
    }

    /// Substitute resolved column names for a `*` column list.
    pub fn resolve_columns(mut self, names: Vec<String>) -> Self {
        self.columns = Columns::Named(names);
        self
    }

    /// Classify the payload and render the statement.
    ///
    /// `Columns::All` must have been resolved against table metadata first;
    /// the builder has no connection to do that with.
    pub fn build(self) -> Result<Prepared> {
        let verb = if self.replace {
            "INSERT OR REPLACE INTO"
        } else {
            "INSERT INTO"
        };
        let names = match &self.columns {
            Columns::All => {
                return Err(Error::build(
                    "a * column list must be resolved against the table before building",
                    format!("{} {} (*)", verb, self.table),
                ));
            }
            Columns::Named(names) if names.is_empty() => {
                return Err(Error::build(
                    "empty column list",
                    format!("{} {} ()", verb, self.table),
                ));
            }
            Columns::Named(names) => names,
        };
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "{} {} ({})\nVALUES ({});",
            verb,
            self.table,
            names.join(", "),
            placeholders
        );
        match self.values.classify(names.len()) {
            Ok(RowPlan::Single(params)) => Ok(Prepared::Single(SqlQuery::new(sql).with_params(params))),
            Ok(RowPlan::Batch(rows)) => Ok(Prepared::Batch { sql, rows }),
            Err(message) => Err(Error::build(message, sql)),
        }
    }
}

/// Builder for `UPDATE ... SET ... WHERE ...` statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: String,
    columns: Columns,
    values: ValueSet,
    filter: Condition,
}

impl Update {
    pub fn new(
        table: impl Into<String>,
        columns: impl Into<Columns>,
        values: ValueSet,
        filter: impl Into<Condition>,
    ) -> Self {
        Self {
            table: table.into(),
            columns: columns.into(),
            values,
            filter: filter.into(),
        }
    }

    pub fn build(self) -> Result<SqlQuery> {
        let names = match &self.columns {
            Columns::Named(names) if !names.is_empty() => names,
            Columns::Named(_) => {
                return Err(Error::build(
                    "empty column list",
                    format!("UPDATE {} SET ...;", self.table),
                ));
            }
            Columns::All => {
                return Err(Error::build(
                    "update requires named columns",
                    format!("UPDATE {} SET ...;", self.table),
                ));
            }
        };
        let assignments = names
            .iter()
            .map(|n| format!("{n} = ?"))
            .collect::<Vec<_>>()
            .join(",\n\t");
        let sql = format!(
            "UPDATE {}\nSET {}\nWHERE {};",
            self.table,
            assignments,
            self.filter.render()
        );
        // Same classification as insert, but only a single row makes sense
        // here: the placeholders are bound exactly once.
        match self.values.classify(names.len()) {
            Ok(RowPlan::Single(params)) => Ok(SqlQuery::new(sql).with_params(params)),
            Ok(RowPlan::Batch(_)) => Err(Error::build(
                "update takes exactly one row of values",
                sql,
            )),
            Err(message) => Err(Error::build(message, sql)),
        }
    }
}

/// Render a `DELETE FROM ... WHERE ...` statement.
pub fn delete_sql(table: &str, filter: &Condition) -> SqlQuery {
    SqlQuery::new(format!("DELETE FROM {}\nWHERE {};", table, filter.render()))
}

/// Render a `DROP TABLE` statement.
pub fn drop_table_sql(table: &str) -> SqlQuery {
    SqlQuery::new(format!("DROP TABLE {table};"))
}

/// Render an `ALTER TABLE ... RENAME TO` statement.
pub fn rename_table_sql(table: &str, new_name: &str) -> SqlQuery {
    SqlQuery::new(format!("ALTER TABLE {table}\nRENAME TO {new_name};"))
}

/// Render an `ALTER TABLE ... ADD COLUMN` statement; `definition` is a full
/// column definition such as `"age INTEGER DEFAULT 0"`.
pub fn add_column_sql(table: &str, definition: &str) -> SqlQuery {
    SqlQuery::new(format!("ALTER TABLE {table}\nADD COLUMN {definition};"))
}

/// Render an `ALTER TABLE ... RENAME COLUMN` statement.
pub fn rename_column_sql(table: &str, column: &str, new_name: &str) -> SqlQuery {
    SqlQuery::new(format!(
        "ALTER TABLE {table}\nRENAME COLUMN {column} TO {new_name};"
    ))
}

/// Render a `SELECT COUNT(*)` statement with an optional filter.
pub fn count_rows_sql(table: &str, filter: Option<&Condition>) -> SqlQuery {
    match filter {
        Some(filter) => SqlQuery::new(format!(
            "SELECT COUNT(*)\nFROM {}\nWHERE {};",
            table,
            filter.render()
        )),
        None => SqlQuery::new(format!("SELECT COUNT(*)\nFROM {table};")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::JoinKind;

    #[test]
    fn create_table_with_all_clauses() {
        let query = CreateTable::new("orders")
            .columns(vec!["id INTEGER", "user_id INTEGER", "sku TEXT NOT NULL"])
            .unique(vec!["sku"])
            .primary_key("id")
            .foreign_key(
                ForeignKey::new("user_id", "users", "id").with_clause("ON DELETE CASCADE"),
            )
            .build()
            .unwrap();
        assert_eq!(
            query.sql,
            "CREATE TABLE orders (id INTEGER,\n\tuser_id INTEGER,\n\tsku TEXT NOT NULL,\
             \n\tUNIQUE (sku),\n\tPRIMARY KEY (id),\
             \n\tFOREIGN KEY (user_id)\n\tREFERENCES users (id)\n\t\tON DELETE CASCADE\n);"
        );
        assert!(query.params.is_empty());
    }

    #[test]
    fn create_table_requires_columns() {
        assert!(matches!(
            CreateTable::new("empty").build(),
            Err(crate::Error::Build { .. })
        ));
    }

    #[test]
    fn create_table_multiple_foreign_keys() {
        let query = CreateTable::new("t")
            .column("a INTEGER")
            .foreign_key(ForeignKey::new("a", "x", "id"))
            .foreign_key(ForeignKey::new("a", "y", "id"))
            .build()
            .unwrap();
        assert_eq!(query.sql.matches("FOREIGN KEY").count(), 2);
    }

    #[test]
    fn select_minimal() {
        let query = Select::new("users", "*").build();
        assert_eq!(query.sql, "SELECT *\nFROM users;");
    }

    #[test]
    fn select_with_every_clause_in_fixed_order() {
        let query = Select::new("users", vec!["name", "age"])
            .distinct()
            .join(Join::new(JoinKind::Inner, "pets", "pets.owner = users.id"))
            .filter(vec!["age > 10", "age < 90"])
            .order_by("age DESC")
            .limit(LimitOffset::with_offset(5, 10))
            .group_by("age")
            .having("COUNT(*) > 1")
            .build();
        assert_eq!(
            query.sql,
            "SELECT DISTINCT name,\n\tage\nFROM users\
             \n\tINNER JOIN pets ON pets.owner = users.id\
             \nWHERE age > 10\n\tAND age < 90\
             \nORDER BY age DESC\
             \nLIMIT 5 OFFSET 10\
             \nGROUP BY age\
             \nHAVING COUNT(*) > 1;"
        );
    }

    #[test]
    fn insert_single_row() {
        let prepared = Insert::new(
            "users",
            vec!["name", "age"],
            ValueSet::row(vec![Value::from("Ada"), Value::from(36)]),
        )
        .build()
        .unwrap();
        match prepared {
            Prepared::Single(query) => {
                assert_eq!(
                    query.sql,
                    "INSERT INTO users (name, age)\nVALUES (?, ?);"
                );
                assert_eq!(query.params.len(), 2);
            }
            other => panic!("expected single-row plan, got {other:?}"),
        }
    }

    #[test]
    fn insert_single_column_many_values_is_a_batch() {
        let prepared = Insert::new("users", "name", ValueSet::row(vec!["a", "b", "c"]))
            .build()
            .unwrap();
        match prepared {
            Prepared::Batch { sql, rows } => {
                assert_eq!(sql, "INSERT INTO users (name)\nVALUES (?);");
                assert_eq!(rows.len(), 3);
            }
            other => panic!("expected batch plan, got {other:?}"),
        }
    }

    #[test]
    fn insert_or_replace_changes_the_verb() {
        let prepared = Insert::new("users", "name", ValueSet::scalar("a"))
            .or_replace()
            .build()
            .unwrap();
        assert!(prepared.sql().starts_with("INSERT OR REPLACE INTO users"));
    }

    #[test]
    fn insert_rejects_unresolved_star_columns() {
        let result = Insert::new("users", "*", ValueSet::scalar(1)).build();
        assert!(matches!(result, Err(crate::Error::Build { .. })));
    }

    #[test]
    fn insert_rejects_width_mismatch() {
        let result = Insert::new(
            "users",
            vec!["a", "b"],
            ValueSet::rows(vec![vec![1, 2], vec![3]]),
        )
        .build();
        assert!(matches!(result, Err(crate::Error::Build { .. })));
    }

    #[test]
    fn update_renders_assignments_and_filter() {
        let query = Update::new(
            "users",
            vec!["name", "age"],
            ValueSet::row(vec![Value::from("Ada"), Value::from(37)]),
            "id = 1",
        )
        .build()
        .unwrap();
        assert_eq!(
            query.sql,
            "UPDATE users\nSET name = ?,\n\tage = ?\nWHERE id = 1;"
        );
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn update_scalar_becomes_one_parameter() {
        let query = Update::new("users", "age", ValueSet::scalar(40), "id = 1")
            .build()
            .unwrap();
        assert_eq!(query.params, vec![Value::Integer(40)]);
    }

    #[test]
    fn update_rejects_multi_row_payloads() {
        let result = Update::new(
            "users",
            "age",
            ValueSet::row(vec![1, 2, 3]),
            "id = 1",
        )
        .build();
        assert!(matches!(result, Err(crate::Error::Build { .. })));
    }

    #[test]
    fn single_statement_renderers() {
        assert_eq!(
            delete_sql("users", &Condition::new("id = 1")).sql,
            "DELETE FROM users\nWHERE id = 1;"
        );
        assert_eq!(drop_table_sql("users").sql, "DROP TABLE users;");
        assert_eq!(
            rename_table_sql("users", "people").sql,
            "ALTER TABLE users\nRENAME TO people;"
        );
        assert_eq!(
            add_column_sql("users", "age INTEGER DEFAULT 0").sql,
            "ALTER TABLE users\nADD COLUMN age INTEGER DEFAULT 0;"
        );
        assert_eq!(
            rename_column_sql("users", "age", "years").sql,
            "ALTER TABLE users\nRENAME COLUMN age TO years;"
        );
        assert_eq!(
            count_rows_sql("users", Some(&Condition::new("age > 1"))).sql,
            "SELECT COUNT(*)\nFROM users\nWHERE age > 1;"
        );
        assert_eq!(
            count_rows_sql("users", None).sql,
            "SELECT COUNT(*)\nFROM users;"
        );
    }
}
