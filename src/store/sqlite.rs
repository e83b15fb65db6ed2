use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::PacketStore;
use crate::error::{Error, Result};
use crate::recorder::SampledRecord;

pub const MEMORY_PATH: &str = ":memory:";

const CREATE_PACKETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS packets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    track INTEGER NOT NULL,
    NTP INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    sequence_number INTEGER NOT NULL,
    payload_type INTEGER NOT NULL,
    payload_length INTEGER NOT NULL
)
"#;

const INSERT_PACKET: &str = "INSERT INTO packets \
    (track, NTP, timestamp, sequence_number, payload_type, payload_length) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const SELECT_PACKETS: &str = "SELECT track, NTP, timestamp, sequence_number, payload_type, \
    payload_length FROM packets ORDER BY id";

type SharedConn = Arc<Mutex<Option<Connection>>>;

/// SqliteStore writes records into the `packets` table of a SQLite database.
///
/// SQLite integers are signed, so `NTP` holds the two's complement bit
/// pattern of the u64 value; `records` converts it back.
pub struct SqliteStore {
    path: String,
    conn: SharedConn,
}

impl SqliteStore {
    /// open opens or creates the database at `path` and ensures the packets
    /// table exists.
    pub async fn open(path: &str) -> Result<Self> {
        let owned = path.to_owned();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = if owned == MEMORY_PATH {
                Connection::open_in_memory()?
            } else {
                Connection::open(&owned)?
            };
            conn.execute(CREATE_PACKETS_TABLE, [])?;
            Ok(conn)
        })
        .await
        .map_err(|e| Error::ErrOthers(e.to_string()))??;

        log::info!("sqlite store opened at {}", path);

        Ok(SqliteStore {
            path: path.to_owned(),
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// records reads back every stored record in insert order.
    pub async fn records(&self) -> Result<Vec<SampledRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(SELECT_PACKETS)?;
            let rows = stmt.query_map([], |row| {
                Ok(SampledRecord {
                    track: row.get::<_, i64>(0)? as usize,
                    ntp: row.get::<_, i64>(1)? as u64,
                    timestamp: row.get(2)?,
                    sequence_number: row.get(3)?,
                    payload_type: row.get(4)?,
                    payload_length: row.get::<_, i64>(5)? as usize,
                })
            })?;

            let mut records = vec![];
            for r in rows {
                records.push(r?);
            }
            Ok(records)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Error::ErrOthers("sqlite connection poisoned".to_owned()))?;
            match &*guard {
                Some(c) => f(c),
                None => Err(Error::ErrStoreClosed),
            }
        })
        .await
        .map_err(|e| Error::ErrOthers(e.to_string()))?
    }
}

#[async_trait]
impl PacketStore for SqliteStore {
    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn insert(&self, record: &SampledRecord) -> Result<()> {
        let r = *record;
        self.with_conn(move |conn| {
            conn.execute(
                INSERT_PACKET,
                params![
                    r.track as i64,
                    r.ntp as i64,
                    r.timestamp,
                    r.sequence_number,
                    r.payload_type,
                    r.payload_length as i64,
                ],
            )
            .map_err(|e| Error::ErrStoreWrite(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::ErrOthers("sqlite connection poisoned".to_owned()))?;
            if let Some(c) = guard.take() {
                c.close().map_err(|(_, err)| Error::ErrSqliteError(err))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| Error::ErrOthers(e.to_string()))?
    }
}
