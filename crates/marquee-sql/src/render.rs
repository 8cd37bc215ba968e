//! Render SQL AST to string.
//!
//! Rendering assigns parameter ordinals deterministically: the Nth distinct
//! parameter name becomes `$N`, and re-rendering the same statement yields
//! the same numbering. Batch rendering keeps each statement's wire form
//! locally numbered while the combined script continues ordinals across
//! statements, so no two placeholders in a batch share an ordinal.

use indexmap::IndexMap;

use crate::expr::{ColumnRef, Expr};
use crate::stmt::*;
use crate::{RenderError, RenderedBatch, RenderedSql, Value, quote_ident};

/// The Postgres extended protocol caps bind parameters at an unsigned
/// 16-bit count. The cap is per statement; a batch script's continued
/// ordinals may exceed it because each statement binds only its own
/// parameters on the wire.
pub const MAX_PARAMS: usize = 65535;

/// Rendering context that tracks parameters and formatting.
pub struct RenderContext {
    /// Parameter name -> bound value, in first-use order
    params: IndexMap<String, Value>,
    /// Ordinals start after this many parameters (batch continuation)
    param_offset: usize,
    /// The SQL being built
    sql: String,
    /// Whether we're at the start of a line
    at_line_start: bool,
    /// Whether to format with newlines
    pretty: bool,
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            params: IndexMap::new(),
            param_offset: 0,
            sql: String::new(),
            at_line_start: true,
            pretty: false,
        }
    }

    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::new()
        }
    }

    /// Start numbering after `offset` already-assigned parameters.
    pub fn with_offset(offset: usize) -> Self {
        Self {
            param_offset: offset,
            ..Self::new()
        }
    }

    /// Get or create a placeholder for a named parameter.
    ///
    /// The same name always maps to the same ordinal within one statement;
    /// binding it to a different value is a collision.
    fn param(&mut self, name: &str, value: &Value) -> Result<String, RenderError> {
        let idx = if let Some((idx, _, existing)) = self.params.get_full(name) {
            if existing != value {
                return Err(RenderError::ParameterCollision {
                    name: name.to_string(),
                });
            }
            idx
        } else {
            self.params.insert(name.to_string(), value.clone());
            self.params.len() - 1
        };
        // The wire limit applies per statement; offset-continued ordinals
        // in a batch script may run past it.
        let position = idx + 1;
        if position > MAX_PARAMS {
            return Err(RenderError::ParameterOverflow {
                ordinal: position,
                limit: MAX_PARAMS,
            });
        }
        Ok(format!("${}", self.param_offset + position))
    }

    fn write(&mut self, s: &str) {
        self.sql.push_str(s);
        self.at_line_start = false;
    }

    fn space(&mut self) {
        if !self.sql.is_empty() && !self.at_line_start {
            self.sql.push(' ');
        }
    }

    fn newline(&mut self) {
        if self.pretty {
            self.sql.push('\n');
            self.at_line_start = true;
        } else {
            self.space();
        }
    }

    /// Finish rendering and return the result.
    pub fn finish(self) -> RenderedSql {
        RenderedSql {
            sql: self.sql,
            params: self.params.into_values().collect(),
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Render implementations
// ============================================================================

/// Trait for types that can be rendered to SQL.
pub trait Render {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError>;
}

impl Render for Expr {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        match self {
            Expr::Literal(value) => {
                let lit = value.escape()?;
                ctx.write(&lit);
            }
            Expr::Param { name, value } => {
                let placeholder = ctx.param(name, value)?;
                ctx.write(&placeholder);
            }
            Expr::Column(col) => col.render(ctx)?,
            Expr::BinOp { left, op, right } => {
                left.render(ctx)?;
                ctx.space();
                ctx.write(op.as_str());
                ctx.space();
                right.render(ctx)?;
            }
            Expr::IsNull { expr, negated } => {
                expr.render(ctx)?;
                ctx.write(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::Like {
                expr,
                pattern,
                case_insensitive,
            } => {
                expr.render(ctx)?;
                ctx.write(if *case_insensitive { " ILIKE " } else { " LIKE " });
                pattern.render(ctx)?;
            }
            Expr::InList { expr, list } => {
                if list.is_empty() {
                    // an empty IN list can never match
                    ctx.write("FALSE");
                } else {
                    expr.render(ctx)?;
                    ctx.write(" IN (");
                    for (i, item) in list.iter().enumerate() {
                        if i > 0 {
                            ctx.write(", ");
                        }
                        item.render(ctx)?;
                    }
                    ctx.write(")");
                }
            }
            Expr::Not(expr) => {
                ctx.write("NOT (");
                expr.render(ctx)?;
                ctx.write(")");
            }
            Expr::Raw(s) => ctx.write(s),
        }
        Ok(())
    }
}

impl Render for ColumnRef {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        if let Some(table) = &self.table {
            ctx.write(&quote_ident(table));
            ctx.write(".");
        }
        ctx.write(&quote_ident(&self.column));
        Ok(())
    }
}

impl Render for SelectStmt {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        ctx.write("SELECT");

        // Columns
        if self.columns.is_empty() {
            ctx.write(" *");
        } else {
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    ctx.write(",");
                }
                ctx.space();
                col.render(ctx)?;
            }
        }

        // FROM
        if let Some(from) = &self.from {
            ctx.newline();
            ctx.write("FROM ");
            ctx.write(&quote_ident(&from.table));
            if let Some(alias) = &from.alias {
                ctx.write(" ");
                ctx.write(&quote_ident(alias));
            }
        }

        // JOINs
        for join in &self.joins {
            ctx.newline();
            ctx.write(join.kind.as_str());
            ctx.write(" ");
            ctx.write(&quote_ident(&join.table));
            if let Some(alias) = &join.alias {
                ctx.write(" ");
                ctx.write(&quote_ident(alias));
            }
            ctx.write(" ON ");
            join.on.render(ctx)?;
        }

        // WHERE
        if let Some(where_) = &self.where_ {
            ctx.newline();
            ctx.write("WHERE ");
            where_.render(ctx)?;
        }

        // ORDER BY
        if !self.order_by.is_empty() {
            ctx.newline();
            ctx.write("ORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ctx.write(", ");
                }
                order.expr.render(ctx)?;
                ctx.write(if order.desc { " DESC" } else { " ASC" });
            }
        }

        // LIMIT
        if let Some(limit) = &self.limit {
            ctx.newline();
            ctx.write("LIMIT ");
            limit.render(ctx)?;
        }

        // OFFSET
        if let Some(offset) = &self.offset {
            ctx.newline();
            ctx.write("OFFSET ");
            offset.render(ctx)?;
        }

        Ok(())
    }
}

impl Render for SelectColumn {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        match self {
            SelectColumn::Expr { expr, alias } => {
                expr.render(ctx)?;
                if let Some(alias) = alias {
                    ctx.write(" AS ");
                    ctx.write(&quote_ident(alias));
                }
            }
            SelectColumn::AllFrom(table) => {
                ctx.write(&quote_ident(table));
                ctx.write(".*");
            }
        }
        Ok(())
    }
}

impl Render for InsertStmt {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        ctx.write("INSERT INTO ");
        ctx.write(&quote_ident(&self.table));

        // Columns
        ctx.write(" (");
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                ctx.write(", ");
            }
            ctx.write(&quote_ident(col));
        }
        ctx.write(")");

        // VALUES
        ctx.newline();
        ctx.write("VALUES (");
        for (i, val) in self.values.iter().enumerate() {
            if i > 0 {
                ctx.write(", ");
            }
            val.render(ctx)?;
        }
        ctx.write(")");

        render_returning(ctx, &self.returning);
        Ok(())
    }
}

impl Render for UpdateStmt {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        ctx.write("UPDATE ");
        ctx.write(&quote_ident(&self.table));

        // SET
        ctx.newline();
        ctx.write("SET ");
        for (i, assign) in self.assignments.iter().enumerate() {
            if i > 0 {
                ctx.write(", ");
            }
            ctx.write(&quote_ident(&assign.column));
            ctx.write(" = ");
            assign.value.render(ctx)?;
        }

        // WHERE
        if let Some(where_) = &self.where_ {
            ctx.newline();
            ctx.write("WHERE ");
            where_.render(ctx)?;
        }

        render_returning(ctx, &self.returning);
        Ok(())
    }
}

impl Render for DeleteStmt {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        ctx.write("DELETE FROM ");
        ctx.write(&quote_ident(&self.table));

        // WHERE
        if let Some(where_) = &self.where_ {
            ctx.newline();
            ctx.write("WHERE ");
            where_.render(ctx)?;
        }

        render_returning(ctx, &self.returning);
        Ok(())
    }
}

impl Render for Stmt {
    fn render(&self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        match self {
            Stmt::Select(s) => s.render(ctx),
            Stmt::Insert(s) => s.render(ctx),
            Stmt::Update(s) => s.render(ctx),
            Stmt::Delete(s) => s.render(ctx),
        }
    }
}

fn render_returning(ctx: &mut RenderContext, returning: &[String]) {
    if returning.is_empty() {
        return;
    }
    ctx.newline();
    ctx.write("RETURNING ");
    for (i, col) in returning.iter().enumerate() {
        if i > 0 {
            ctx.write(", ");
        }
        if col == "*" {
            ctx.write("*");
        } else {
            ctx.write(&quote_ident(col));
        }
    }
}

// ============================================================================
// Convenience methods
// ============================================================================

/// Render a statement to SQL with default (compact) formatting.
pub fn render(stmt: &impl Render) -> Result<RenderedSql, RenderError> {
    let mut ctx = RenderContext::new();
    stmt.render(&mut ctx)?;
    Ok(ctx.finish())
}

/// Render a statement to SQL with pretty formatting (newlines).
pub fn render_pretty(stmt: &impl Render) -> Result<RenderedSql, RenderError> {
    let mut ctx = RenderContext::pretty();
    stmt.render(&mut ctx)?;
    Ok(ctx.finish())
}

/// Render a statement with placeholder ordinals starting after `offset`.
pub fn render_with_offset(stmt: &impl Render, offset: usize) -> Result<RenderedSql, RenderError> {
    let mut ctx = RenderContext::with_offset(offset);
    stmt.render(&mut ctx)?;
    Ok(ctx.finish())
}

/// Render a batch of statements together.
///
/// Every statement is rendered twice: once locally numbered from $1 for
/// wire execution, and once into the combined script where its ordinals
/// continue after the previous statement's. Statement boundaries therefore
/// never reuse an ordinal, and no statement's value list contains another
/// statement's values.
pub fn render_batch(stmts: &[impl Render]) -> Result<RenderedBatch, RenderError> {
    let mut script = String::new();
    let mut statements = Vec::with_capacity(stmts.len());
    let mut offset = 0;

    for (i, stmt) in stmts.iter().enumerate() {
        let global = render_with_offset(stmt, offset)?;
        offset += global.params.len();

        if i > 0 {
            script.push_str(";\n");
        }
        script.push_str(&global.sql);

        statements.push(render(stmt)?);
    }

    Ok(RenderedBatch { script, statements })
}

// ============================================================================
// Tests
// ============================================================================
