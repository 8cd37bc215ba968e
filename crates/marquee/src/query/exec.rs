//! Single statement execution against Postgres.
//!
//! A statement moves Built → Rendered → Sent → Succeeded | Failed. Nothing
//! is retried: a failed statement is terminal and the caller decides
//! whether to resubmit. Errors from the backend carry the exact rendered
//! SQL and bound values so the failure can be diagnosed after the fact.

use marquee_sql::{
    DeleteStmt, Expr, FromClause, InsertStmt, Join, OrderBy, RenderedSql, SelectColumn,
    SelectStmt, Stmt, UpdateStmt, Value, render,
};
use tokio_postgres::Client;
use tracing::debug;

use crate::Error;
use crate::row::{Row, SqlParam, pg_row_to_row};
use crate::schema::{Column, Schema, Table};

/// Result of executing one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Rows affected; for a SELECT, the number of rows returned.
    pub rows_affected: u64,
    /// Database-assigned primary key, present for inserts into tables
    /// with an auto-generated key.
    pub generated_id: Option<i64>,
}

/// A database handle: one connection plus the schema descriptor.
///
/// Passed explicitly into every builder; there is no ambient connection.
pub struct Db<'a> {
    pub(crate) client: &'a Client,
    pub(crate) schema: &'a Schema,
}

impl<'a> Db<'a> {
    pub fn new(client: &'a Client, schema: &'a Schema) -> Self {
        Self { client, schema }
    }

    /// Get the schema descriptor.
    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Result<&'a Table, Error> {
        self.schema
            .find_table(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Start building a SELECT query for a table.
    pub fn select(&self, table: &str) -> Result<SelectBuilder<'_>, Error> {
        let table = self.table(table)?;
        Ok(SelectBuilder {
            db: self,
            table,
            stmt: SelectStmt::new().from(FromClause::table(&table.name)),
        })
    }

    /// Start building an INSERT query for a table.
    pub fn insert(&self, table: &str) -> Result<InsertBuilder<'_>, Error> {
        let table = self.table(table)?;
        Ok(InsertBuilder {
            db: self,
            table,
            columns: Vec::new(),
            values: Vec::new(),
        })
    }

    /// Start building an UPDATE query for a table.
    pub fn update(&self, table: &str) -> Result<UpdateBuilder<'_>, Error> {
        let table = self.table(table)?;
        Ok(UpdateBuilder {
            db: self,
            table,
            assignments: Vec::new(),
            filter: None,
        })
    }

    /// Start building a DELETE query for a table.
    pub fn delete(&self, table: &str) -> Result<DeleteBuilder<'_>, Error> {
        let table = self.table(table)?;
        Ok(DeleteBuilder {
            db: self,
            table,
            filter: None,
        })
    }

    /// Render and execute one statement.
    pub async fn execute_stmt(&self, stmt: &Stmt) -> Result<ExecutionResult, Error> {
        let rendered = render(stmt)?;
        match send_statement(self.client, stmt, &rendered).await {
            Ok(result) => Ok(result),
            Err(source) => Err(Error::Execution {
                sql: rendered.sql,
                params: rendered.params,
                source,
            }),
        }
    }

    /// Render and execute a statement, mapping result rows.
    pub async fn query_stmt(&self, stmt: &Stmt) -> Result<Vec<Row>, Error> {
        let rendered = render(stmt)?;
        let params: Vec<SqlParam> = rendered.params.iter().map(SqlParam).collect();
        let params_ref: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = params
            .iter()
            .map(|p| p as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();

        debug!(sql = %rendered.sql, params = rendered.params.len(), "querying");

        let rows = match self.client.query(&rendered.sql, &params_ref).await {
            Ok(rows) => rows,
            Err(source) => {
                return Err(Error::Execution {
                    sql: rendered.sql,
                    params: rendered.params,
                    source,
                });
            }
        };

        rows.iter().map(pg_row_to_row).collect()
    }

    /// Execute caller-supplied SQL text as-is (may contain several
    /// statements). No parameters, no result rows.
    pub async fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        debug!(sql = %sql, "executing raw sql");
        self.client
            .batch_execute(sql)
            .await
            .map_err(|source| Error::Execution {
                sql: sql.to_string(),
                params: Vec::new(),
                source,
            })
    }
}

/// One round trip: send a rendered statement over the wire.
pub(crate) async fn send_statement(
    client: &Client,
    stmt: &Stmt,
    rendered: &RenderedSql,
) -> Result<ExecutionResult, tokio_postgres::Error> {
    let params: Vec<SqlParam> = rendered.params.iter().map(SqlParam).collect();
    let params_ref: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = params
        .iter()
        .map(|p| p as &(dyn tokio_postgres::types::ToSql + Sync))
        .collect();

    debug!(sql = %rendered.sql, params = rendered.params.len(), "sending statement");

    if statement_returns_rows(stmt) {
        let rows = client.query(&rendered.sql, &params_ref).await?;
        let generated_id = match stmt {
            Stmt::Insert(_) => rows.first().and_then(generated_key),
            _ => None,
        };
        Ok(ExecutionResult {
            rows_affected: rows.len() as u64,
            generated_id,
        })
    } else {
        let affected = client.execute(&rendered.sql, &params_ref).await?;
        Ok(ExecutionResult {
            rows_affected: affected,
            generated_id: None,
        })
    }
}

fn statement_returns_rows(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Select(_) => true,
        Stmt::Insert(s) => !s.returning.is_empty(),
        Stmt::Update(s) => !s.returning.is_empty(),
        Stmt::Delete(s) => !s.returning.is_empty(),
    }
}

/// Read the generated key from a RETURNING row, whatever integer width
/// the key column has.
fn generated_key(row: &tokio_postgres::Row) -> Option<i64> {
    row.try_get::<_, i64>(0)
        .ok()
        .or_else(|| row.try_get::<_, i32>(0).ok().map(i64::from))
}

fn resolve_column<'t>(table: &'t Table, name: &str) -> Result<&'t Column, Error> {
    table.find_column(name).ok_or_else(|| Error::UnknownColumn {
        table: table.name.clone(),
        column: name.to_string(),
    })
}

// ============================================================================
// Statement planning (pure, schema-validated)
// ============================================================================

/// Plan an INSERT: arity and column names are checked here, at build time,
/// never deferred into SQL execution.
pub(crate) fn build_insert(
    table: &Table,
    columns: &[String],
    values: &[Value],
) -> Result<Stmt, Error> {
    if columns.is_empty() {
        return Err(Error::EmptyInsert(table.name.clone()));
    }
    if columns.len() != values.len() {
        return Err(Error::ArityMismatch {
            table: table.name.clone(),
            columns: columns.len(),
            values: values.len(),
        });
    }

    let mut stmt = InsertStmt::new(&table.name);
    for (col, val) in columns.iter().zip(values) {
        let column = resolve_column(table, col)?;
        stmt = stmt.column(&column.name, Expr::param(&column.name, val.clone()));
    }

    // Surface the database-assigned key so it can seed dependent inserts.
    if let Some(pk) = table.primary_key()
        && pk.auto_generated
    {
        stmt = stmt.returning([pk.name.clone()]);
    }

    Ok(Stmt::Insert(stmt))
}

pub(crate) fn build_update(
    table: &Table,
    assignments: &[(String, Value)],
    filter: Option<&Expr>,
) -> Result<Stmt, Error> {
    let mut stmt = UpdateStmt::new(&table.name);
    for (col, val) in assignments {
        let column = resolve_column(table, col)?;
        stmt = stmt.set(&column.name, Expr::param(&column.name, val.clone()));
    }
    if let Some(filter) = filter {
        stmt = stmt.where_(filter.clone());
    }
    Ok(Stmt::Update(stmt))
}

pub(crate) fn build_delete(table: &Table, filter: Option<&Expr>) -> Result<Stmt, Error> {
    let mut stmt = DeleteStmt::new(&table.name);
    if let Some(filter) = filter {
        stmt = stmt.where_(filter.clone());
    }
    Ok(Stmt::Delete(stmt))
}

// ============================================================================
// Builders
// ============================================================================

/// Builder for SELECT queries.
pub struct SelectBuilder<'a> {
    db: &'a Db<'a>,
    table: &'a Table,
    stmt: SelectStmt,
}

impl<'a> SelectBuilder<'a> {
    /// Select columns of the base table, validated against the schema.
    pub fn columns(
        mut self,
        cols: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, Error> {
        for col in cols {
            let name: String = col.into();
            let column = resolve_column(self.table, &name)?;
            self.stmt = self
                .stmt
                .column(SelectColumn::expr(Expr::column(&column.name)));
        }
        Ok(self)
    }

    /// Select a column through a join scope (table name or join alias).
    /// Alias-scoped names resolve in the database, not the descriptor.
    pub fn column_of(mut self, scope: impl Into<String>, column: impl Into<String>) -> Self {
        self.stmt = self
            .stmt
            .column(SelectColumn::expr(Expr::qualified_column(scope, column)));
        self
    }

    /// Add an arbitrary projection column.
    pub fn project(mut self, col: SelectColumn) -> Self {
        self.stmt = self.stmt.column(col);
        self
    }

    /// Join another schema table on a condition.
    pub fn join(self, table: &str, on: Expr) -> Result<Self, Error> {
        self.join_with(table, None, on)
    }

    /// Join a schema table under an alias. Required when the same table
    /// participates in more than one join of the statement.
    pub fn join_as(self, table: &str, alias: &str, on: Expr) -> Result<Self, Error> {
        self.join_with(table, Some(alias), on)
    }

    fn join_with(mut self, table: &str, alias: Option<&str>, on: Expr) -> Result<Self, Error> {
        let joined = self.db.table(table)?;
        self.stmt = self.stmt.join(match alias {
            Some(alias) => Join::inner_as(&joined.name, alias, on),
            None => Join::inner(&joined.name, on),
        });
        Ok(self)
    }

    /// Add a filter condition (ANDed with any existing one).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.stmt = self.stmt.and_where(expr);
        self
    }

    /// Add ORDER BY.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.stmt = self.stmt.order_by(order);
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, n: u32) -> Self {
        self.stmt = self.stmt.limit(Expr::literal(i64::from(n)));
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, n: u32) -> Self {
        self.stmt = self.stmt.offset(Expr::literal(i64::from(n)));
        self
    }

    /// The statement as built so far.
    pub fn build(&self) -> Stmt {
        Stmt::Select(self.stmt.clone())
    }

    /// Execute and return all matching rows.
    pub async fn all(self) -> Result<Vec<Row>, Error> {
        let stmt = self.build();
        self.db.query_stmt(&stmt).await
    }

    /// Execute and return the first matching row.
    pub async fn one(self) -> Result<Option<Row>, Error> {
        let mut rows = self.limit(1).all().await?;
        Ok(rows.pop())
    }

    /// Execute and return the count of matching rows.
    pub async fn count(self) -> Result<u64, Error> {
        let mut stmt = self.stmt;
        stmt.columns = vec![SelectColumn::expr(Expr::Raw("COUNT(*)".into()))];
        stmt.order_by.clear();

        let rendered = render(&stmt)?;
        let params: Vec<SqlParam> = rendered.params.iter().map(SqlParam).collect();
        let params_ref: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = params
            .iter()
            .map(|p| p as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();

        let outcome = self
            .db
            .client
            .query_one(&rendered.sql, &params_ref)
            .await
            .and_then(|row| row.try_get::<_, i64>(0));
        match outcome {
            Ok(count) => Ok(count as u64),
            Err(source) => Err(Error::Execution {
                sql: rendered.sql,
                params: rendered.params,
                source,
            }),
        }
    }
}

/// Builder for INSERT queries.
pub struct InsertBuilder<'a> {
    db: &'a Db<'a>,
    table: &'a Table,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl<'a> InsertBuilder<'a> {
    /// Name the columns to insert into.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns.extend(cols.into_iter().map(Into::into));
        self
    }

    /// Provide the values, one per named column.
    pub fn values(mut self, vals: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.values.extend(vals.into_iter().map(Into::into));
        self
    }

    /// Add one column/value pair.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }

    /// Validate and produce the statement. Column/value arity is enforced
    /// here; an unbalanced insert never reaches the backend.
    pub fn build(&self) -> Result<Stmt, Error> {
        build_insert(self.table, &self.columns, &self.values)
    }

    /// Execute the insert.
    pub async fn execute(self) -> Result<ExecutionResult, Error> {
        let stmt = self.build()?;
        self.db.execute_stmt(&stmt).await
    }
}

/// Builder for UPDATE queries.
pub struct UpdateBuilder<'a> {
    db: &'a Db<'a>,
    table: &'a Table,
    assignments: Vec<(String, Value)>,
    filter: Option<Expr>,
}

impl<'a> UpdateBuilder<'a> {
    /// Assign a value to a column.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Add a filter condition (ANDed with any existing one).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn build(&self) -> Result<Stmt, Error> {
        build_update(self.table, &self.assignments, self.filter.as_ref())
    }

    /// Execute the update, returning the number of rows affected.
    pub async fn execute(self) -> Result<ExecutionResult, Error> {
        let stmt = self.build()?;
        self.db.execute_stmt(&stmt).await
    }
}

/// Builder for DELETE queries.
pub struct DeleteBuilder<'a> {
    db: &'a Db<'a>,
    table: &'a Table,
    filter: Option<Expr>,
}

impl<'a> DeleteBuilder<'a> {
    /// Add a filter condition (ANDed with any existing one).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    pub fn build(&self) -> Result<Stmt, Error> {
        build_delete(self.table, self.filter.as_ref())
    }

    /// Execute the delete, returning the number of rows affected.
    pub async fn execute(self) -> Result<ExecutionResult, Error> {
        let stmt = self.build()?;
        self.db.execute_stmt(&stmt).await
    }
}
