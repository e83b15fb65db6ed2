use std::fmt;

/// ByteOrder selects how the 8-byte send-time extension is decoded.
///
/// LittleEndian is the default because records already written by the
/// probe were decoded that way. NTP timestamps on the wire (RFC 6051) are
/// big-endian, so streams stamped by a standards-following sender need
/// BigEndian.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

const BYTE_ORDER_LITTLE_ENDIAN_STR: &str = "little-endian";
const BYTE_ORDER_BIG_ENDIAN_STR: &str = "big-endian";

impl Default for ByteOrder {
    fn default() -> Self {
        ByteOrder::LittleEndian
    }
}

impl ByteOrder {
    pub fn decode_u64(&self, raw: [u8; 8]) -> u64 {
        match *self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }
}

impl TryFrom<&str> for ByteOrder {
    type Error = crate::Error;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        match raw {
            BYTE_ORDER_LITTLE_ENDIAN_STR | "le" => Ok(ByteOrder::LittleEndian),
            BYTE_ORDER_BIG_ENDIAN_STR | "be" => Ok(ByteOrder::BigEndian),
            _ => Err(crate::Error::ErrInvalidConfig(format!(
                "unknown byte order {raw}"
            ))),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ByteOrder::LittleEndian => write!(f, "{BYTE_ORDER_LITTLE_ENDIAN_STR}"),
            ByteOrder::BigEndian => write!(f, "{BYTE_ORDER_BIG_ENDIAN_STR}"),
        }
    }
}
