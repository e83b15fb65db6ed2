
pub mod sampled_record;

use std::sync::Arc;
use std::time::Duration;

pub use sampled_record::SampledRecord;

use crate::error::{Error, Result};
use crate::policy::{ByteOrder, ErrorClass};
use crate::store::PacketStore;

/// Header extension id carrying the send-time value.
pub const DEFAULT_EXTENSION_ID: u8 = 1;
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// MetadataRecorder turns a sampled packet into a SampledRecord and writes
/// it to the store.
pub struct MetadataRecorder {
    store: Arc<dyn PacketStore + Send + Sync>,
    write_timeout: Duration,
    extension_id: u8,
    byte_order: ByteOrder,
}

impl MetadataRecorder {
    pub fn new(store: Arc<dyn PacketStore + Send + Sync>) -> Self {
        MetadataRecorder {
            store,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            extension_id: DEFAULT_EXTENSION_ID,
            byte_order: ByteOrder::default(),
        }
    }

    /// with_write_timeout sets the deadline of each insert.
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// with_extension_id sets the header extension the send-time is read from.
    pub fn with_extension_id(mut self, extension_id: u8) -> Self {
        self.extension_id = extension_id;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn store(&self) -> &Arc<dyn PacketStore + Send + Sync> {
        &self.store
    }

    /// record extracts the record of `pkt` and inserts it. A call makes at
    /// most one insert; a repeated call writes a duplicate.
    pub async fn record(
        &self,
        track: usize,
        pkt: &rtp::packet::Packet,
    ) -> Result<SampledRecord> {
        let record =
            SampledRecord::from_packet(track, pkt, self.extension_id, self.byte_order)?;
        log::debug!("sampled {}", record);

        match tokio::time::timeout(self.write_timeout, self.store.insert(&record)).await {
            Ok(Ok(())) => Ok(record),
            Ok(Err(err)) if err.class() == ErrorClass::StoreWrite => Err(err),
            Ok(Err(err)) => Err(Error::ErrStoreWrite(err.to_string())),
            Err(_) => Err(Error::ErrStoreWriteTimeout(self.write_timeout)),
        }
    }
}
