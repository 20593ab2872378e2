pub mod client;
pub mod error;

pub use client::{encode_segment, BackendClient, QueryParams};
pub use error::BackendError;
