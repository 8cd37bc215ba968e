//! SQL AST, rendering and parameter binding.
//!
//! Build SQL as a typed AST, then render to a string with automatic
//! parameter numbering. Literal values can be inlined (escaped) or bound
//! as numbered placeholders; batches render with ordinals that never
//! collide across statement boundaries.

mod error;
mod expr;
mod render;
mod stmt;
mod value;

pub use error::*;
pub use expr::*;
pub use render::*;
pub use stmt::*;
pub use value::*;

/// Result of rendering one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    /// The SQL string with $1, $2, etc. placeholders.
    pub sql: String,
    /// Parameter values in ordinal order ($1 is `params[0]`).
    pub params: Vec<Value>,
}

/// Result of rendering a batch of statements together.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBatch {
    /// All statements as one script, with placeholder numbering continuing
    /// across statement boundaries (statement i+1 starts after statement i's
    /// last ordinal).
    pub script: String,
    /// Each statement rendered on its own, locally numbered from $1, with
    /// only its own parameter values.
    pub statements: Vec<RenderedSql>,
}

/// Quote a SQL identifier (table or column name).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape a string literal for direct inclusion in SQL text.
///
/// Doubles embedded single quotes and wraps the result in quotes; never
/// drops or truncates characters.
pub fn escape_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
