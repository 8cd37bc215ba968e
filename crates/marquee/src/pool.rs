//! Connection acquisition.
//!
//! [`ConnectionProvider`] abstracts over where connections come from: a
//! single shared `Arc<tokio_postgres::Client>` or a `deadpool_postgres`
//! pool (behind the `deadpool` feature). [`Session`] pairs a provider with
//! a schema descriptor; leasing from it yields a [`Lease`] whose [`Db`]
//! handle drives queries for as long as the lease is held. The connection
//! goes back to its source when the lease drops, on every exit path.
//!
//! The session is passed explicitly wherever queries run; there is no
//! ambient global connection.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use tokio_postgres::Client;

use crate::Error;
use crate::query::Db;
use crate::schema::Schema;

/// A source of database connections.
///
/// # Example
///
/// ```ignore
/// let session = Session::new(Arc::new(client), schema);
/// let lease = session.lease().await?;
/// let count = lease.db().select("genres")?.count().await?;
/// ```
pub trait ConnectionProvider: Clone + Send + Sync + 'static {
    /// Holds a live connection; dropping it releases the connection back
    /// to its source.
    type Guard<'a>: Deref<Target = Client> + Send
    where
        Self: 'a;

    /// Obtain a connection. A single shared connection returns
    /// immediately; a pool may wait for a free slot.
    fn get(&self) -> impl Future<Output = Result<Self::Guard<'_>, Error>> + Send;
}

/// A single shared connection, cloned on every lease. Enough for CLI
/// tools and tests.
impl ConnectionProvider for Arc<Client> {
    type Guard<'a> = Arc<Client>;

    async fn get(&self) -> Result<Self::Guard<'_>, Error> {
        Ok(self.clone())
    }
}

/// A connection provider paired with the schema descriptor it serves.
pub struct Session<P> {
    provider: P,
    schema: Schema,
}

impl<P: ConnectionProvider> Session<P> {
    pub fn new(provider: P, schema: Schema) -> Self {
        Self { provider, schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Lease a connection from the provider.
    pub async fn lease(&self) -> Result<Lease<'_, P>, Error> {
        let conn = self.provider.get().await?;
        Ok(Lease {
            conn,
            schema: &self.schema,
        })
    }
}

/// A leased connection scoped to its session's schema.
pub struct Lease<'s, P: ConnectionProvider + 's> {
    conn: P::Guard<'s>,
    schema: &'s Schema,
}

impl<'s, P: ConnectionProvider> Lease<'s, P> {
    /// A query handle over the leased connection.
    pub fn db(&self) -> Db<'_> {
        Db::new(&self.conn, self.schema)
    }
}

/// Guard over a pooled connection; the slot frees on drop.
#[cfg(feature = "deadpool")]
pub struct PoolGuard(deadpool_postgres::Object);

#[cfg(feature = "deadpool")]
impl Deref for PoolGuard {
    type Target = Client;

    fn deref(&self) -> &Client {
        // deadpool's Object derefs to ClientWrapper, then to Client.
        &self.0
    }
}

#[cfg(feature = "deadpool")]
impl ConnectionProvider for deadpool_postgres::Pool {
    type Guard<'a> = PoolGuard;

    async fn get(&self) -> Result<Self::Guard<'_>, Error> {
        self.get()
            .await
            .map(PoolGuard)
            .map_err(|e| Error::Pool(e.to_string()))
    }
}
