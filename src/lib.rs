#![doc = include_str!("../README.md")]

pub mod encoder;
mod error;
pub mod model;
pub mod records;
pub mod repo;
pub mod weights;

pub use encoder::{TextEncoder, MAX_SEQ_LEN};
pub use error::{Error, Result};
pub use model::pooling::PoolingStrategy;
pub use repo::{download_snapshot, ModelSource};

/// Token counts consumed by an encoding run.
#[derive(Debug, PartialEq, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}
