use crate::{Error, Result};
use candle_core::Tensor;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How the per-token hidden states of the encoder are collapsed into a single
/// vector per input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// Mean over the token axis. The default, and what most
    /// sentence-transformer checkpoints were trained with.
    #[default]
    Mean,
    Max,
    Sum,
}

impl FromStr for PoolingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match &*s.to_lowercase() {
            "mean" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            _ => Err(Error::InvalidPoolingStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for PoolingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Max => write!(f, "max"),
            Self::Sum => write!(f, "sum"),
        }
    }
}

/// Collapse a `(batch, tokens, hidden)` tensor into `(batch, hidden)`.
pub fn pool_embeddings(embeddings: &Tensor, strategy: PoolingStrategy) -> Result<Tensor> {
    match strategy {
        PoolingStrategy::Mean => {
            let (_, out_tokens, _) = embeddings.dims3()?;
            Ok((embeddings.sum(1)? / (out_tokens as f64))?)
        }
        PoolingStrategy::Max => Ok(embeddings.max(1)?),
        PoolingStrategy::Sum => Ok(embeddings.sum(1)?),
    }
}

/// L2-normalize each row of a `(batch, hidden)` tensor.
pub fn normalize_l2(v: &Tensor) -> Result<Tensor> {
    Ok(v.broadcast_div(&v.sqr()?.sum_keepdim(1)?.sqrt()?)?)
}
