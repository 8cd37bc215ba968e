use marquee_sql::{RenderError, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("insert into \"{table}\" lists {columns} columns but {values} values")]
    ArityMismatch {
        table: String,
        columns: usize,
        values: usize,
    },

    #[error("insert into \"{0}\" has no columns")]
    EmptyInsert(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {table}.{column}")]
    UnknownColumn { table: String, column: String },

    #[error("statement failed: {source}\nsql: {sql}\nparams: {params:?}")]
    Execution {
        sql: String,
        params: Vec<Value>,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("batch statement #{index} failed: {source}\nsql: {sql}\nparams: {params:?}")]
    BatchExecution {
        index: usize,
        sql: String,
        params: Vec<Value>,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("pool error: {0}")]
    Pool(String),
}
