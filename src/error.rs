use std::time::Duration;

use thiserror::Error;

use crate::policy::ErrorClass;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// ErrTrackIndexOutOfBounds indicates a packet arrived for a track index
    /// the gate array has no slot for.
    #[error("track index {index} out of bounds (capacity {capacity})")]
    ErrTrackIndexOutOfBounds { index: usize, capacity: usize },

    /// ErrZeroCapacity indicates a gate array was requested with no slots.
    #[error("gate array capacity must be greater than zero")]
    ErrZeroCapacity,

    /// ErrExtensionNotFound indicates the sampled packet carries no
    /// send-time header extension.
    #[error("header extension {0} not found")]
    ErrExtensionNotFound(u8),

    /// ErrExtensionTooShort indicates the send-time header extension holds
    /// fewer than 8 bytes.
    #[error("header extension {id} too short: {len} bytes, need 8")]
    ErrExtensionTooShort { id: u8, len: usize },

    /// ErrStoreWriteTimeout indicates an insert did not complete before its
    /// deadline.
    #[error("store write exceeded deadline of {0:?}")]
    ErrStoreWriteTimeout(Duration),

    /// ErrStoreWrite indicates the store rejected an insert.
    #[error("store write failed: {0}")]
    ErrStoreWrite(String),

    #[error("store connect exceeded deadline of {0:?}")]
    ErrStoreConnectTimeout(Duration),
    #[error("store ping exceeded deadline of {0:?}")]
    ErrStorePingTimeout(Duration),
    #[error("store is closed")]
    ErrStoreClosed,

    #[error("unsupported url scheme: {0}")]
    ErrUnsupportedScheme(String),
    #[error("invalid url: {0}")]
    ErrInvalidUrl(String),
    #[error("invalid configuration: {0}")]
    ErrInvalidConfig(String),

    #[error("session not started")]
    ErrSessionNotStarted,
    #[error("session already started")]
    ErrSessionAlreadyStarted,
    #[error("session closed")]
    ErrSessionClosed,
    #[error("on_packet handler not registered")]
    ErrNoPacketHandler,
    #[error("Invalid CloseRx Channel")]
    ErrInvalidCloseRx,

    #[error("IoError: {0}")]
    ErrIoError(#[from] std::io::Error),
    #[error("UtilError: {0}")]
    ErrUtilError(#[from] util::Error),
    #[error("RtpError: {0}")]
    ErrRtpError(#[from] rtp::Error),
    #[error("SqliteError: {0}")]
    ErrSqliteError(#[from] rusqlite::Error),
    #[error("JsonError: {0}")]
    ErrJsonError(#[from] serde_json::Error),
    #[error("UrlError: {0}")]
    ErrUrlError(#[from] url::ParseError),

    #[error("Other errors: {0}")]
    ErrOthers(String),
}

impl Error {
    /// class returns the fault class this error belongs to, which the
    /// ErrorPolicy maps to an action.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::ErrTrackIndexOutOfBounds { .. } => ErrorClass::OutOfBounds,
            Error::ErrExtensionNotFound(_) | Error::ErrExtensionTooShort { .. } => {
                ErrorClass::MalformedPacket
            }
            Error::ErrStoreWriteTimeout(_)
            | Error::ErrStoreWrite(_)
            | Error::ErrStoreClosed => ErrorClass::StoreWrite,
            _ => ErrorClass::Setup,
        }
    }
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<Error>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.to_string()).collect();
        Err(Error::ErrOthers(errs_strs.join("\n")))
    }
}
