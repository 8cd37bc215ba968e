//! Postgres query layer.
//!
//! This crate provides:
//! - Explicit schema descriptors (field → column mapping, no reflection)
//! - Schema-validated statement builders with build-time arity checking
//! - A single statement executor that surfaces rendered SQL and bound
//!   values on failure
//! - A transactional, fail-fast batch executor whose rendered script
//!   never reuses a placeholder ordinal across statements
//!
//! The SQL AST and parameter binder live in `marquee-sql`, re-exported
//! here as [`sql`].

mod error;
pub mod pool;
pub mod query;
mod row;
pub mod schema;

pub use error::Error;
pub use marquee_sql as sql;
pub use pool::{ConnectionProvider, Lease, Session};
pub use query::{Batch, Db, ExecutionResult};
pub use row::{Row, SqlParam, pg_row_to_row};
pub use schema::{Column, ForeignKey, PgType, Schema, Table};
