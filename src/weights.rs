//! Inspection of model weights files: list every tensor with its name, shape
//! and dtype, previewing the values of small tensors.

use candle_core::{DType, Device, Tensor};
use std::fmt;
use std::path::Path;

use crate::Result;

/// Tensors with fewer elements than this get their values printed.
const PREVIEW_LIMIT: usize = 20;

/// Summary of one tensor in a weights file.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
    /// Values of the tensor, present only when it is small enough to print.
    pub preview: Option<Vec<f32>>,
}

impl fmt::Display for TensorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} shape={:?} dtype={:?}",
            self.name, self.shape, self.dtype
        )?;
        match &self.preview {
            Some(values) => write!(f, "\n  values: {values:?}"),
            None => write!(f, "\n  (too large to print)"),
        }
    }
}

/// List the tensors stored in a safetensors file, sorted by name.
pub fn inspect_weights<P: AsRef<Path>>(path: P) -> Result<Vec<TensorInfo>> {
    let tensors = candle_core::safetensors::load(path, &Device::Cpu)?;

    let mut infos = tensors
        .into_iter()
        .map(|(name, tensor)| describe(name, &tensor))
        .collect::<Result<Vec<_>>>()?;
    infos.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(infos)
}

fn describe(name: String, tensor: &Tensor) -> Result<TensorInfo> {
    let preview = if tensor.elem_count() < PREVIEW_LIMIT {
        let values = tensor
            .flatten_all()?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?;
        Some(values)
    } else {
        None
    };

    Ok(TensorInfo {
        name,
        shape: tensor.dims().to_vec(),
        dtype: tensor.dtype(),
        preview,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_inspect_weights() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("model.safetensors");

        let mut tensors = HashMap::new();
        tensors.insert(
            "bias".to_string(),
            Tensor::from_vec(vec![1.0f32, 2.0, 3.0], (3,), &Device::Cpu)?,
        );
        tensors.insert(
            "weight".to_string(),
            Tensor::zeros((8, 8), DType::F32, &Device::Cpu)?,
        );
        candle_core::safetensors::save(&tensors, &path)?;

        let infos = inspect_weights(&path)?;
        assert_eq!(infos.len(), 2);

        // Sorted by name
        assert_eq!(infos[0].name, "bias");
        assert_eq!(infos[0].shape, vec![3]);
        assert_eq!(infos[0].dtype, DType::F32);
        assert_eq!(infos[0].preview, Some(vec![1.0, 2.0, 3.0]));

        assert_eq!(infos[1].name, "weight");
        assert_eq!(infos[1].shape, vec![8, 8]);
        assert_eq!(infos[1].preview, None);

        Ok(())
    }

    #[test]
    fn test_display_preview() -> Result<()> {
        let info = TensorInfo {
            name: "bias".to_string(),
            shape: vec![2],
            dtype: DType::F32,
            preview: Some(vec![1.0, 2.0]),
        };
        let rendered = info.to_string();
        assert!(rendered.starts_with("bias shape=[2] dtype=F32"));
        assert!(rendered.contains("values: [1.0, 2.0]"));

        Ok(())
    }

    #[test]
    fn test_inspect_missing_file() {
        assert!(inspect_weights("does-not-exist.safetensors").is_err());
    }
}
