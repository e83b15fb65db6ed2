#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// re-export sub-crates
pub use rtp;
pub use util;

pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod policy;
pub mod recorder;
pub mod sampler;
pub mod session;
pub mod stats;
pub mod store;
pub mod ticker;

pub use config::{SamplerConfig, SamplerConfigBuilder};
pub use controller::SamplingController;
pub use error::Error;
