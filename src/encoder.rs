use candle_core::Tensor;
use std::path::Path;
use tokenizers::tokenizer::Tokenizer;
use tokenizers::{EncodeInput, PaddingParams, PaddingStrategy, TruncationParams};

use crate::model::device::device;
use crate::model::embedder::{load_model, parse_config, EmbedderModel};
use crate::model::pooling::{normalize_l2, pool_embeddings, PoolingStrategy};
use crate::repo::{ModelFiles, ModelSource};
use crate::{Result, Usage};

/// Inputs are truncated and padded to this many tokens.
pub const MAX_SEQ_LEN: usize = 128;

/// A pretrained encoder model paired with its tokenizer.
///
/// ## Example
///
/// ```no_run
/// # use embedgen::{PoolingStrategy, TextEncoder};
/// # fn main() -> embedgen::Result<()> {
/// let encoder = TextEncoder::from_repo_string(
///     "sentence-transformers-testing/stsb-bert-tiny-safetensors",
/// )?;
/// let embedding = encoder.embed("Hello, how are you?", PoolingStrategy::Mean, false)?;
/// println!("{} dimensions", embedding.len());
/// # Ok(())
/// # }
/// ```
pub struct TextEncoder {
    model: Box<dyn EmbedderModel>,
    tokenizer: Tokenizer,
}

impl TextEncoder {
    pub(crate) fn new(model: Box<dyn EmbedderModel>, tokenizer: Tokenizer) -> Self {
        Self { model, tokenizer }
    }

    /// Load the encoder from a resolved model source.
    pub fn from_source(source: &ModelSource) -> Result<Self> {
        let ModelFiles {
            config,
            tokenizer,
            weights,
        } = source.resolve()?;

        let config_str = std::fs::read_to_string(config)?;
        let cfg = parse_config(&config_str)?;

        let tokenizer = Tokenizer::from_file(tokenizer)?;
        let tokenizer = configure_tokenizer(tokenizer)?;

        let model = load_model(&weights, &cfg)?;

        Ok(Self::new(model, tokenizer))
    }

    /// Load the encoder from a local directory holding `config.json`,
    /// `tokenizer.json` and the model weights.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::from_source(&ModelSource::from_dir(dir))
    }

    /// Load the encoder from an `owner/name[:revision]` hub repo string,
    /// downloading through the hub cache as needed.
    pub fn from_repo_string(repo_string: &str) -> Result<Self> {
        Self::from_source(&ModelSource::from_repo_string(repo_string)?)
    }

    /// Embed a batch of texts into a `(batch, hidden)` tensor, reporting how
    /// many non-padding tokens were consumed.
    pub fn encode_batch_with_usage<'s, E>(
        &self,
        texts: Vec<E>,
        pooling: PoolingStrategy,
        normalize: bool,
    ) -> Result<(Tensor, Usage)>
    where
        E: Into<EncodeInput<'s>> + Send,
    {
        let encodings = self.tokenizer.encode_batch(texts, true)?;

        let prompt_tokens: u32 = encodings
            .iter()
            .map(|e| e.get_attention_mask().iter().sum::<u32>())
            .sum();

        let token_ids = encodings
            .iter()
            .map(|e| {
                let ids = e.get_ids().to_vec();
                Tensor::new(ids.as_slice(), device())
            })
            .collect::<candle_core::Result<Vec<_>>>()?;
        let token_ids = Tensor::stack(&token_ids, 0)?;

        tracing::trace!("running inference on batch {:?}", token_ids.shape());
        let embeddings = self.model.encode(&token_ids)?;
        tracing::trace!("generated embeddings {:?}", embeddings.shape());

        let pooled = pool_embeddings(&embeddings, pooling)?;
        let pooled = if normalize {
            normalize_l2(&pooled)?
        } else {
            pooled
        };

        let usage = Usage {
            prompt_tokens,
            total_tokens: prompt_tokens,
        };

        Ok((pooled, usage))
    }

    /// Embed a batch of texts into a `(batch, hidden)` tensor.
    pub fn encode_batch<'s, E>(
        &self,
        texts: Vec<E>,
        pooling: PoolingStrategy,
        normalize: bool,
    ) -> Result<Tensor>
    where
        E: Into<EncodeInput<'s>> + Send,
    {
        let (pooled, _) = self.encode_batch_with_usage(texts, pooling, normalize)?;
        Ok(pooled)
    }

    /// Embed a single text into a 1-D vector.
    pub fn embed(
        &self,
        text: &str,
        pooling: PoolingStrategy,
        normalize: bool,
    ) -> Result<Vec<f32>> {
        let pooled = self.encode_batch(vec![text], pooling, normalize)?;
        Ok(pooled.get(0)?.to_vec1::<f32>()?)
    }
}

/// Force truncation and padding to [`MAX_SEQ_LEN`], whatever the checkpoint's
/// tokenizer config says.
fn configure_tokenizer(mut tokenizer: Tokenizer) -> Result<Tokenizer> {
    let padding = PaddingParams {
        strategy: PaddingStrategy::Fixed(MAX_SEQ_LEN),
        ..Default::default()
    };
    tokenizer.with_padding(Some(padding));

    let truncation = TruncationParams {
        max_length: MAX_SEQ_LEN,
        ..Default::default()
    };
    tokenizer.with_truncation(Some(truncation))?;

    Ok(tokenizer)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use candle_core::{DType, Device};
    use std::collections::HashMap;
    use tokenizers::models::wordlevel::WordLevel;

    pub(crate) fn tiny_tokenizer() -> Tokenizer {
        let vocab: HashMap<String, u32> = [("[UNK]", 0), ("hello", 1), ("world", 2)]
            .into_iter()
            .map(|(w, i)| (w.to_string(), i))
            .collect();
        let model = WordLevel::builder()
            .vocab(vocab)
            .unk_token("[UNK]".to_string())
            .build()
            .unwrap();
        Tokenizer::new(model)
    }

    /// Encoder that returns all-ones hidden states of a fixed width.
    pub(crate) struct StubModel {
        pub hidden: usize,
    }

    impl EmbedderModel for StubModel {
        fn encode(&self, token_ids: &Tensor) -> Result<Tensor> {
            let (batch, tokens) = token_ids.dims2()?;
            Ok(Tensor::ones(
                (batch, tokens, self.hidden),
                DType::F32,
                &Device::Cpu,
            )?)
        }
    }

    pub(crate) fn stub_encoder(hidden: usize) -> TextEncoder {
        let tokenizer = configure_tokenizer(tiny_tokenizer()).unwrap();
        TextEncoder::new(Box::new(StubModel { hidden }), tokenizer)
    }
}
