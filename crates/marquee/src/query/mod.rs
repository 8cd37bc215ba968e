//! Query building and execution.
//!
//! Builders validate against the schema descriptor and compile to
//! parameterized SQL; execution is synchronous per caller (each call
//! blocks until the round trip completes) with no retries.
//!
//! # Example
//!
//! ```ignore
//! use marquee::{Db, sql::Expr};
//!
//! let db = Db::new(&client, &schema);
//!
//! // INSERT, picking up the generated key
//! let genre = db.insert("genres")?
//!     .columns(["Name"])
//!     .values(["Genre's One and Only"])
//!     .execute()
//!     .await?;
//!
//! // SELECT with a contains filter
//! let rows = db.select("genres")?
//!     .columns(["GenreId", "Name"])?
//!     .filter(Expr::column("Name").in_list("Name", ["Genre's One and Only"]))
//!     .all()
//!     .await?;
//!
//! // Batch: queue, then execute atomically in queue order
//! let mut batch = db.batch();
//! batch.queue(db.insert("genres")?.columns(["Name"]).values(["Genre's Third"]).build()?);
//! batch.queue(db.insert("genres")?.columns(["Name"]).values(["Genre's Fourth"]).build()?);
//! let results = batch.execute().await?;
//! ```

mod batch;
mod exec;

pub use batch::Batch;
pub use exec::{
    Db, DeleteBuilder, ExecutionResult, InsertBuilder, SelectBuilder, UpdateBuilder,
};
