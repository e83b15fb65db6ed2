
use std::time::Duration;

use crate::error::{Error, Result};
use crate::policy::{ByteOrder, ErrorPolicy};
use crate::recorder::{DEFAULT_EXTENSION_ID, DEFAULT_WRITE_TIMEOUT};
use crate::ticker::DEFAULT_SAMPLE_PERIOD;

pub const DEFAULT_STREAM_URL: &str = "udp://0.0.0.0:5004";
pub const DEFAULT_STORE_URL: &str = "sqlite://packets.db";
pub const DEFAULT_MAX_TRACKS: usize = 10;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// SamplerConfig holds every option of a sampling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// stream source, e.g. `udp://0.0.0.0:5004`
    pub stream_url: String,
    /// store destination, e.g. `sqlite://packets.db`
    pub store_url: String,
    /// interval between gate resets
    pub sample_period: Duration,
    /// number of gates, i.e. the highest track index plus one
    pub max_tracks: usize,
    /// deadline of each store insert
    pub write_timeout: Duration,
    /// deadline of opening the store
    pub connect_timeout: Duration,
    /// deadline of the initial store ping
    pub ping_timeout: Duration,
    /// header extension holding the send-time value
    pub extension_id: u8,
    pub byte_order: ByteOrder,
    pub error_policy: ErrorPolicy,
    /// time allowed for in-flight packet handlers on shutdown
    pub shutdown_grace: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            stream_url: DEFAULT_STREAM_URL.to_owned(),
            store_url: DEFAULT_STORE_URL.to_owned(),
            sample_period: DEFAULT_SAMPLE_PERIOD,
            max_tracks: DEFAULT_MAX_TRACKS,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            extension_id: DEFAULT_EXTENSION_ID,
            byte_order: ByteOrder::default(),
            error_policy: ErrorPolicy::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl SamplerConfig {
    pub fn builder() -> SamplerConfigBuilder {
        SamplerConfigBuilder::default()
    }

    /// validate rejects values that would leave the sampler unable to run.
    pub fn validate(&self) -> Result<()> {
        if self.stream_url.is_empty() {
            return Err(Error::ErrInvalidConfig("stream url is empty".to_owned()));
        }
        if self.store_url.is_empty() {
            return Err(Error::ErrInvalidConfig("store url is empty".to_owned()));
        }
        if self.max_tracks == 0 {
            return Err(Error::ErrInvalidConfig(
                "max tracks must be greater than zero".to_owned(),
            ));
        }
        // RFC 8285 extension ids start at 1
        if self.extension_id == 0 {
            return Err(Error::ErrInvalidConfig(
                "extension id must be greater than zero".to_owned(),
            ));
        }

        let durations = [
            ("sample period", self.sample_period),
            ("write timeout", self.write_timeout),
            ("connect timeout", self.connect_timeout),
            ("ping timeout", self.ping_timeout),
        ];
        for (name, d) in durations {
            if d.is_zero() {
                return Err(Error::ErrInvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}

/// SamplerConfigBuilder builds a validated SamplerConfig.
#[derive(Default)]
pub struct SamplerConfigBuilder {
    config: SamplerConfig,
}

impl SamplerConfigBuilder {
    pub fn with_stream_url(mut self, url: impl Into<String>) -> Self {
        self.config.stream_url = url.into();
        self
    }

    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.config.store_url = url.into();
        self
    }

    pub fn with_sample_period(mut self, period: Duration) -> Self {
        self.config.sample_period = period;
        self
    }

    pub fn with_max_tracks(mut self, max_tracks: usize) -> Self {
        self.config.max_tracks = max_tracks;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.config.ping_timeout = timeout;
        self
    }

    pub fn with_extension_id(mut self, id: u8) -> Self {
        self.config.extension_id = id;
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.config.byte_order = byte_order;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    pub fn build(self) -> Result<SamplerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
