use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

const SAFETENSORS_FILE: &str = "model.safetensors";
const PTH_FILE: &str = "pytorch_model.bin";
const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Where a model lives: a local directory, or a repository on the HF Hub.
pub enum ModelSource {
    Dir(PathBuf),
    Hub(Box<ApiRepo>),
}

impl ModelSource {
    pub fn from_dir<P>(root: P) -> Self
    where
        P: AsRef<Path>,
    {
        Self::Dir(root.as_ref().to_owned())
    }

    /// Build a hub source from an `owner/name[:revision]` string.
    pub fn from_repo_string(repo_string: &str) -> Result<Self> {
        let (repo_id, revision) = parse_repo_string(repo_string)?;
        let api = Api::new()?;
        let api_repo = api.repo(Repo::with_revision(
            repo_id.to_owned(),
            RepoType::Model,
            revision.to_owned(),
        ));
        Ok(Self::Hub(Box::new(api_repo)))
    }

    /// Locate the config, tokenizer, and weights files of this source.
    ///
    /// **Warning**: for a hub source this downloads any file not already in
    /// the Huggingface cache.
    pub(crate) fn resolve(&self) -> Result<ModelFiles> {
        let root = match self {
            ModelSource::Dir(pathbuf) => pathbuf.to_owned(),
            ModelSource::Hub(api_repo) => {
                let model_path = api_repo
                    .get(SAFETENSORS_FILE)
                    .or_else(|_e| api_repo.get(PTH_FILE))?;

                let _ = api_repo.get(CONFIG_FILE)?;
                let _ = api_repo.get(TOKENIZER_FILE)?;

                let root = model_path
                    .parent()
                    .ok_or(Error::ModelLoad("model path has no parent directory"))?;

                root.to_owned()
            }
        };

        let config = root.join(CONFIG_FILE);
        let tokenizer = root.join(TOKENIZER_FILE);

        for p in [&config, &tokenizer] {
            if !p.exists() {
                return Err(Error::MissingModelFile(p.to_owned()));
            }
        }

        // Safetensors get precedence over pth.
        let weights = if root.join(SAFETENSORS_FILE).exists() {
            WeightsFile::Safetensors(root.join(SAFETENSORS_FILE))
        } else if root.join(PTH_FILE).exists() {
            WeightsFile::Pth(root.join(PTH_FILE))
        } else {
            return Err(Error::ModelLoad("model directory contains no weights"));
        };

        Ok(ModelFiles {
            config,
            tokenizer,
            weights,
        })
    }
}

pub(crate) struct ModelFiles {
    pub(crate) config: PathBuf,
    pub(crate) tokenizer: PathBuf,
    pub(crate) weights: WeightsFile,
}

pub(crate) enum WeightsFile {
    Pth(PathBuf),
    Safetensors(PathBuf),
}

/// Split an `owner/name[:revision]` string; the revision defaults to `main`.
pub fn parse_repo_string(repo_string: &str) -> Result<(&str, &str)> {
    if repo_string.is_empty() {
        return Err(Error::InvalidRepoString(repo_string.to_string()));
    }

    const ILLEGAL_CHARS: [char; 6] = ['\\', '<', '>', '|', '?', '*'];
    if repo_string.chars().any(|c| ILLEGAL_CHARS.contains(&c)) {
        return Err(Error::InvalidRepoString(repo_string.to_string()));
    }

    let (repo_id, revision) = match repo_string.split_once(':') {
        Some((repo_id, revision)) if !revision.is_empty() => (repo_id, revision),
        Some((repo_id, _)) => (repo_id, "main"),
        None => (repo_string, "main"),
    };

    Ok((repo_id, revision))
}

/// Download a model snapshot into `target_dir` so later runs can use
/// `--model-dir` without network access.
///
/// Fetches the weights, `config.json`, and `tokenizer.json` through the hub
/// cache and copies them into `target_dir`. Returns the copied paths.
pub fn download_snapshot(repo_string: &str, target_dir: &Path) -> Result<Vec<PathBuf>> {
    let source = ModelSource::from_repo_string(repo_string)?;

    tracing::info!("fetching snapshot of {repo_string}");
    let ModelFiles {
        config,
        tokenizer,
        weights,
    } = source.resolve()?;

    let weights = match weights {
        WeightsFile::Safetensors(p) | WeightsFile::Pth(p) => p,
    };

    fs::create_dir_all(target_dir)?;

    let mut copied = Vec::new();
    for src in [&config, &tokenizer, &weights] {
        let file_name = src
            .file_name()
            .ok_or(Error::ModelLoad("snapshot file has no file name"))?;
        let dst = target_dir.join(file_name);
        fs::copy(src, &dst)?;
        tracing::info!("copied {} to {}", src.display(), dst.display());
        copied.push(dst);
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_repo_string() -> Result<()> {
        let (repo_id, revision) = parse_repo_string("sentence-transformers/all-MiniLM-L6-v2")?;
        assert_eq!(repo_id, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(revision, "main");

        let (repo_id, revision) =
            parse_repo_string("sentence-transformers/all-MiniLM-L6-v2:refs/pr/21")?;
        assert_eq!(repo_id, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(revision, "refs/pr/21");

        let (repo_id, revision) = parse_repo_string("sentence-transformers/all-MiniLM-L6-v2:")?;
        assert_eq!(repo_id, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(revision, "main");

        assert!(parse_repo_string("").is_err());
        assert!(parse_repo_string("owner/model*").is_err());

        Ok(())
    }

    #[test]
    fn test_resolve_valid_dir() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.json"), "{}")?;
        fs::write(dir.path().join("tokenizer.json"), "{}")?;
        fs::write(dir.path().join("model.safetensors"), "{}")?;

        let source = ModelSource::from_dir(dir.path());
        let files = source.resolve()?;
        assert!(matches!(files.weights, WeightsFile::Safetensors(_)));

        Ok(())
    }

    #[test]
    fn test_resolve_missing_tokenizer_names_file() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.json"), "{}")?;
        fs::write(dir.path().join("model.safetensors"), "{}")?;

        let source = ModelSource::from_dir(dir.path());
        match source.resolve() {
            Err(Error::MissingModelFile(p)) => {
                assert_eq!(p, dir.path().join("tokenizer.json"));
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("expected MissingModelFile"),
        }

        Ok(())
    }

    #[test]
    fn test_resolve_missing_weights() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.json"), "{}")?;
        fs::write(dir.path().join("tokenizer.json"), "{}")?;

        let source = ModelSource::from_dir(dir.path());
        assert!(source.resolve().is_err());

        Ok(())
    }

    #[test]
    fn test_resolve_pth_fallback() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.json"), "{}")?;
        fs::write(dir.path().join("tokenizer.json"), "{}")?;
        fs::write(dir.path().join("pytorch_model.bin"), r"\b")?;

        let source = ModelSource::from_dir(dir.path());
        let files = source.resolve()?;
        assert!(matches!(files.weights, WeightsFile::Pth(_)));

        Ok(())
    }
}
