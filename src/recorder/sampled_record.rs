use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::policy::ByteOrder;

/// Size in bytes of the send-time value carried in the header extension.
pub const SEND_TIME_LEN: usize = 8;

/// SampledRecord is the metadata persisted for one captured packet.
///
/// The serialized field names are the stored layout and must not change.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct SampledRecord {
    pub track: usize,
    #[serde(rename = "NTP")]
    pub ntp: u64,
    pub timestamp: u32,
    pub sequence_number: u16,
    pub payload_type: u8,
    pub payload_length: usize,
}

impl SampledRecord {
    /// from_packet extracts a record from `pkt` captured on `track`, decoding
    /// the send-time value from header extension `extension_id`.
    pub fn from_packet(
        track: usize,
        pkt: &rtp::packet::Packet,
        extension_id: u8,
        byte_order: ByteOrder,
    ) -> Result<Self> {
        let ext = pkt
            .header
            .get_extension(extension_id)
            .ok_or(Error::ErrExtensionNotFound(extension_id))?;
        if ext.len() < SEND_TIME_LEN {
            return Err(Error::ErrExtensionTooShort {
                id: extension_id,
                len: ext.len(),
            });
        }

        let mut raw = [0u8; SEND_TIME_LEN];
        raw.copy_from_slice(&ext[..SEND_TIME_LEN]);

        Ok(SampledRecord {
            track,
            ntp: byte_order.decode_u64(raw),
            timestamp: pkt.header.timestamp,
            sequence_number: pkt.header.sequence_number,
            payload_type: pkt.header.payload_type,
            payload_length: pkt.payload.len(),
        })
    }
}

impl fmt::Display for SampledRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "track={} NTP={} timestamp={} seq={} pt={} len={}",
            self.track,
            self.ntp,
            self.timestamp,
            self.sequence_number,
            self.payload_type,
            self.payload_length
        )
    }
}
