#[cfg(test)]
mod store_test;

pub mod file;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::recorder::SampledRecord;

pub use file::JsonLinesStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const SCHEME_SQLITE: &str = "sqlite";
pub const SCHEME_FILE: &str = "file";
pub const SCHEME_MEMORY: &str = "memory";

/// PacketStore is the durable destination of sampled records.
///
/// Implementations hold a handle to a single collection. `insert` writes
/// exactly one record; callers bound it with their own deadline.
#[async_trait]
pub trait PacketStore {
    /// ping checks the store is reachable and accepting writes.
    async fn ping(&self) -> Result<()>;

    /// insert writes one record.
    async fn insert(&self, record: &SampledRecord) -> Result<()>;

    /// close releases the underlying connection. Later inserts fail with
    /// ErrStoreClosed.
    async fn close(&self) -> Result<()>;
}

/// open connects to the store named by `url`.
///
/// Recognized forms are `sqlite://<path>` (`sqlite://:memory:` for a
/// private in-memory database), `file://<path>` for JSON lines, and
/// `memory://`.
pub async fn open(url: &str) -> Result<Arc<dyn PacketStore + Send + Sync>> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| Error::ErrInvalidUrl(url.to_owned()))?;

    match scheme {
        SCHEME_SQLITE => {
            if rest.is_empty() {
                return Err(Error::ErrInvalidUrl(url.to_owned()));
            }
            Ok(Arc::new(SqliteStore::open(rest).await?))
        }
        SCHEME_FILE => {
            if rest.is_empty() {
                return Err(Error::ErrInvalidUrl(url.to_owned()));
            }
            Ok(Arc::new(JsonLinesStore::open(rest).await?))
        }
        SCHEME_MEMORY => Ok(Arc::new(MemoryStore::new())),
        _ => Err(Error::ErrUnsupportedScheme(scheme.to_owned())),
    }
}
