use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use embedgen::records::{self, QueryEmbedding};
use embedgen::weights::inspect_weights;
use embedgen::{download_snapshot, ModelSource, PoolingStrategy, TextEncoder};

#[derive(Debug, Parser)]
#[command(name = "embedgen", version, about = "Generate text embeddings with pretrained models")]
struct App {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download a model snapshot from the Hugging Face Hub
    Download {
        /// Repository string, `owner/name[:revision]`
        repo: String,

        /// Directory to copy the snapshot into
        #[arg(short, long, default_value = "model")]
        dir: PathBuf,
    },

    /// Embed a single text and write a `{text, embedding}` JSON record
    Embed {
        /// The text to embed
        text: String,

        #[command(flatten)]
        model: ModelArgs,

        /// Output JSON file
        #[arg(short, long, default_value = "query_embedding.json")]
        output: PathBuf,
    },

    /// Embed the `input` field of every record in a JSON dataset
    EmbedFile {
        /// Input JSON file holding an array of instruction records
        input: PathBuf,

        /// Output JSON file
        output: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Report the vector length stored in an embedding JSON file
    Dims {
        #[arg(default_value = "query_embedding.json")]
        file: PathBuf,
    },

    /// List the tensors in a safetensors weights file
    Inspect {
        /// Path to a `model.safetensors` file
        weights: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Local directory holding config.json, tokenizer.json and model weights
    #[arg(long, conflicts_with = "repo")]
    model_dir: Option<PathBuf>,

    /// Hub repository string, `owner/name[:revision]`
    #[arg(long)]
    repo: Option<String>,

    /// Pooling strategy applied to the encoder output
    #[arg(long, default_value_t = PoolingStrategy::Mean)]
    pooling: PoolingStrategy,

    /// L2-normalize the pooled embeddings
    #[arg(long)]
    normalize: bool,
}

impl ModelArgs {
    fn encoder(&self) -> Result<TextEncoder> {
        let source = match (&self.model_dir, &self.repo) {
            (Some(dir), _) => ModelSource::from_dir(dir),
            (None, Some(repo)) => ModelSource::from_repo_string(repo)?,
            (None, None) => bail!("provide either --model-dir or --repo"),
        };

        TextEncoder::from_source(&source).context("failed to load the model")
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "embedgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = App::parse();

    match app.command {
        Command::Download { repo, dir } => {
            let copied = download_snapshot(&repo, &dir)
                .with_context(|| format!("failed to download {repo}"))?;
            println!("Downloaded {} files to {}", copied.len(), dir.display());
        }

        Command::Embed {
            text,
            model,
            output,
        } => {
            let encoder = model.encoder()?;
            let embedding = encoder.embed(&text, model.pooling, model.normalize)?;
            println!("{embedding:?}");
            records::write_compact(&output, &QueryEmbedding { text, embedding })?;
            println!("Embedding saved to {}", output.display());
        }

        Command::EmbedFile {
            input,
            output,
            model,
        } => {
            let encoder = model.encoder()?;
            let dataset = records::read_records(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let embedded =
                records::embed_records(&encoder, &dataset, model.pooling, model.normalize)?;
            records::write_pretty(&output, &embedded)?;
            println!("Embeddings generated and saved to {}", output.display());
        }

        Command::Dims { file } => {
            let dims = records::embedding_dims(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            println!("Embedding dimensions (dims): {dims}");
        }

        Command::Inspect { weights } => {
            for info in inspect_weights(&weights)? {
                println!("{info}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
