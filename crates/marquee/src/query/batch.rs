//! Batch execution.
//!
//! A batch buffers statements in queue order; nothing touches the wire
//! until [`Batch::execute`]. The whole batch renders up front (each
//! statement independently parameterized), then runs inside one
//! transaction: all statements succeed or the transaction rolls back with
//! the first offending statement identified by index. Statements after
//! the first failure are never sent.
//!
//! A batch is single-owner and consumed by execution; callers needing
//! concurrent batches use independent instances.

use marquee_sql::{RenderedBatch, Stmt, render_batch};
use tracing::debug;

use super::exec::{Db, ExecutionResult, send_statement};
use crate::Error;

/// An ordered group of statements executed together.
pub struct Batch<'a> {
    db: &'a Db<'a>,
    statements: Vec<Stmt>,
}

impl<'a> Db<'a> {
    /// Start an empty batch bound to this handle.
    pub fn batch(&self) -> Batch<'_> {
        Batch {
            db: self,
            statements: Vec::new(),
        }
    }
}

impl Batch<'_> {
    /// Append a statement to the pending list. Purely buffering; no
    /// rendering or I/O happens here.
    pub fn queue(&mut self, stmt: Stmt) {
        self.statements.push(stmt);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Render the queued statements without executing them.
    pub fn render(&self) -> Result<RenderedBatch, Error> {
        Ok(render_batch(&self.statements)?)
    }

    /// Execute all queued statements in queue order, inside one
    /// transaction, returning one result per statement.
    pub async fn execute(self) -> Result<Vec<ExecutionResult>, Error> {
        if self.statements.is_empty() {
            return Ok(Vec::new());
        }

        // Render everything before sending anything; a statement that
        // cannot render fails the batch with zero side effects.
        let rendered = self.render()?;
        debug!(statements = self.statements.len(), script = %rendered.script, "executing batch");

        let client = self.db.client;
        client.batch_execute("BEGIN").await?;

        let mut results = Vec::with_capacity(self.statements.len());
        for (index, (stmt, sql)) in self
            .statements
            .iter()
            .zip(&rendered.statements)
            .enumerate()
        {
            match send_statement(client, stmt, sql).await {
                Ok(result) => results.push(result),
                Err(source) => {
                    // Roll back and stop; the connection dropping would
                    // abort the transaction anyway if this fails.
                    let _ = client.batch_execute("ROLLBACK").await;
                    return Err(Error::BatchExecution {
                        index,
                        sql: sql.sql.clone(),
                        params: sql.params.clone(),
                        source,
                    });
                }
            }
        }

        client.batch_execute("COMMIT").await?;
        Ok(results)
    }
}
