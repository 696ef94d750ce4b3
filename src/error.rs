use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid model repository string: {0}")]
    InvalidRepoString(String),

    #[error("Model load error: {0}")]
    ModelLoad(&'static str),

    #[error("Invalid model architecture: {0}")]
    InvalidModelConfig(&'static str),

    #[error("Invalid pooling strategy: {0}")]
    InvalidPoolingStrategy(String),

    #[error("Missing model file: {}", .0.display())]
    MissingModelFile(PathBuf),

    #[error("No `embedding` field found in {}", .0.display())]
    MissingEmbedding(PathBuf),

    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Tokenization error: {0}")]
    Tokenization(#[from] tokenizers::Error),

    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("HF Hub error: {0}")]
    HFHub(#[from] hf_hub::api::sync::ApiError),
}

pub type Result<T> = std::result::Result<T, Error>;
