use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::PacketStore;
use crate::error::{Error, Result};
use crate::recorder::SampledRecord;

/// MemoryStore keeps records in process. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<SampledRecord>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// records returns a copy of everything inserted so far, in insert order.
    pub async fn records(&self) -> Vec<SampledRecord> {
        let records = self.records.lock().await;
        records.clone()
    }

    pub async fn len(&self) -> usize {
        let records = self.records.lock().await;
        records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PacketStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::ErrStoreClosed)
        } else {
            Ok(())
        }
    }

    async fn insert(&self, record: &SampledRecord) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ErrStoreClosed);
        }
        let mut records = self.records.lock().await;
        records.push(*record);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
