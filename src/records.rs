//! The flat JSON record formats the pipeline reads and writes.
//!
//! A dataset is a JSON array of instruction records. Embedding a dataset
//! appends an `embedding` array to each record; embedding a single text
//! produces one `{text, embedding}` record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::encoder::TextEncoder;
use crate::model::pooling::PoolingStrategy;
use crate::{Error, Result};

/// Records are embedded in batches of this many inputs.
const BATCH_SIZE: usize = 32;

/// One entry of an instruction dataset. Absent fields default to the empty
/// string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionRecord {
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
}

/// An instruction record with its computed embedding appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedRecord {
    pub instruction: String,
    pub input: String,
    pub output: String,
    pub embedding: Vec<f32>,
}

/// A single input text paired with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEmbedding {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Read an instruction dataset from a JSON file.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<InstructionRecord>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write any serializable value as pretty-printed JSON.
pub fn write_pretty<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// Write any serializable value as compact JSON.
pub fn write_compact<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), value)?;
    Ok(())
}

/// Read the `embedding` field of a JSON file and return its length.
pub fn embedding_dims<P: AsRef<Path>>(path: P) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;

    value
        .get("embedding")
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| Error::MissingEmbedding(path.to_owned()))
}

/// Embed the `input` field of every record, carrying the other fields over
/// unchanged.
pub fn embed_records(
    encoder: &TextEncoder,
    records: &[InstructionRecord],
    pooling: PoolingStrategy,
    normalize: bool,
) -> Result<Vec<EmbeddedRecord>> {
    let mut out = Vec::with_capacity(records.len());
    let mut prompt_tokens = 0u32;

    for chunk in records.chunks(BATCH_SIZE) {
        let inputs: Vec<&str> = chunk.iter().map(|r| r.input.as_str()).collect();
        let (pooled, usage) = encoder.encode_batch_with_usage(inputs, pooling, normalize)?;
        prompt_tokens += usage.prompt_tokens;

        for (record, embedding) in chunk.iter().zip(pooled.to_vec2::<f32>()?) {
            out.push(EmbeddedRecord {
                instruction: record.instruction.clone(),
                input: record.input.clone(),
                output: record.output.clone(),
                embedding,
            });
        }
    }

    tracing::info!(
        "embedded {} records ({prompt_tokens} prompt tokens)",
        out.len()
    );

    Ok(out)
}
