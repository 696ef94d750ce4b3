use candle_core::{DType, Module, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::Config as BertConfig;
use candle_transformers::models::jina_bert::Config as JinaBertConfig;
use serde::Deserialize;

// Re-exports
pub use candle_transformers::models::{bert::BertModel, jina_bert::BertModel as JinaBertModel};

use crate::model::device::device;
use crate::repo::WeightsFile;
use crate::{Error, Result};

/// Parsed `config.json` of a supported encoder checkpoint.
pub(crate) enum ModelConfig {
    Bert(BertConfig),
    JinaBert(JinaBertConfig),
}

#[derive(Deserialize)]
struct BaseModelConfig {
    architectures: Option<Vec<String>>,
}

/// Dispatch on the `architectures` field of `config.json` to figure out which
/// concrete configuration to deserialize.
pub(crate) fn parse_config(config_str: &str) -> Result<ModelConfig> {
    let base_config: BaseModelConfig = serde_json::from_str(config_str)?;

    let config = match base_config.architectures {
        Some(arch) => match arch.first().map(String::as_str) {
            Some("BertModel") | Some("BertForMaskedLM") => {
                let config: BertConfig = serde_json::from_str(config_str)?;
                ModelConfig::Bert(config)
            }
            Some("JinaBertForMaskedLM") => {
                let config: JinaBertConfig = serde_json::from_str(config_str)?;
                ModelConfig::JinaBert(config)
            }
            _ => return Err(Error::InvalidModelConfig("unsupported architecture")),
        },
        None => return Err(Error::InvalidModelConfig("no `architectures` field")),
    };

    Ok(config)
}

/// Trait for embedding models
pub trait EmbedderModel: Send + Sync {
    fn encode(&self, token_ids: &Tensor) -> Result<Tensor>;
}

impl EmbedderModel for BertModel {
    #[inline]
    fn encode(&self, token_ids: &Tensor) -> Result<Tensor> {
        let token_type_ids = token_ids.zeros_like()?;
        Ok(self.forward(token_ids, &token_type_ids)?)
    }
}

impl EmbedderModel for JinaBertModel {
    #[inline]
    fn encode(&self, token_ids: &Tensor) -> Result<Tensor> {
        Ok(self.forward(token_ids)?)
    }
}

/// Load the model weights and build the encoder described by `cfg`.
pub(crate) fn load_model(weights: &WeightsFile, cfg: &ModelConfig) -> Result<Box<dyn EmbedderModel>> {
    let vb = match weights {
        WeightsFile::Pth(path) => VarBuilder::from_pth(path, DType::F32, device())?,
        WeightsFile::Safetensors(path) => unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device())?
        },
    };

    match cfg {
        ModelConfig::Bert(cfg) => Ok(Box::new(BertModel::load(vb, cfg)?)),
        ModelConfig::JinaBert(cfg) => Ok(Box::new(JinaBertModel::new(vb, cfg)?)),
    }
}
