pub mod byte_order;
pub mod error_policy;

pub use byte_order::ByteOrder;
pub use error_policy::{ErrorClass, ErrorPolicy, FaultAction};
