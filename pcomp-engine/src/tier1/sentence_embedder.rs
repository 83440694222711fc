//! Sentence embedding with Candle (paraphrase-MiniLM-L6-v2)
//!
//! Loads a BERT-family sentence-transformers model from a local directory or
//! the Hugging Face Hub and embeds text by mean pooling the last hidden
//! state over the attention mask. Output is L2-normalized, so cosine
//! similarity is a dot product.
//!
//! The model directory must hold `config.json`, `tokenizer.json` and
//! `model.safetensors`.

use crate::tier1::embedder::Embedder;
use crate::types::{EngineError, EngineResult};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Sentence-transformers model used for the semantic comparison layer
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/paraphrase-MiniLM-L6-v2";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

fn embedding_error(context: &str, e: impl Display) -> EngineError {
    EngineError::Embedding(format!("{}: {}", context, e))
}

/// BERT sentence embedder with mean pooling
pub struct SentenceEmbedder {
    name: String,
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl SentenceEmbedder {
    /// Load model files from a local directory
    pub fn from_dir(dir: &Path) -> EngineResult<Self> {
        let name = dir.display().to_string();
        Self::from_files(
            name,
            &dir.join(CONFIG_FILE),
            &dir.join(TOKENIZER_FILE),
            dir.join(WEIGHTS_FILE),
        )
    }

    /// Download (or reuse the cached copy of) a model from the Hugging Face Hub
    ///
    /// Files are cached under the Hugging Face cache directory
    /// (`~/.cache/huggingface`).
    pub fn from_hub(model_id: &str) -> EngineResult<Self> {
        info!("Fetching sentence embedding model: {}", model_id);

        let api = Api::new().map_err(|e| embedding_error("Failed to create HuggingFace API client", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get(CONFIG_FILE)
            .map_err(|e| embedding_error("Failed to download config.json", e))?;
        let tokenizer_path = repo
            .get(TOKENIZER_FILE)
            .map_err(|e| embedding_error("Failed to download tokenizer.json", e))?;
        let weights_path = repo
            .get(WEIGHTS_FILE)
            .map_err(|e| embedding_error("Failed to download model.safetensors", e))?;

        debug!("Model files downloaded to cache");
        Self::from_files(model_id.to_string(), &config_path, &tokenizer_path, weights_path)
    }

    fn from_files(
        name: String,
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: PathBuf,
    ) -> EngineResult<Self> {
        let device = Device::Cpu;

        let raw_config = std::fs::read_to_string(config_path)
            .map_err(|e| embedding_error(&format!("Failed to read {}", config_path.display()), e))?;
        let config: Config = serde_json::from_str(&raw_config)
            .map_err(|e| embedding_error(&format!("Failed to parse {}", config_path.display()), e))?;
        debug!("Model config: hidden_size={}", config.hidden_size);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| embedding_error(&format!("Failed to load {}", tokenizer_path.display()), e))?;

        if !weights_path.is_file() {
            return Err(EngineError::Embedding(format!(
                "Model weights not found: {}",
                weights_path.display()
            )));
        }
        // SAFETY: the weights file is memory-mapped read-only and must not be
        // modified while the model is alive.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| embedding_error("Failed to load model weights", e))?
        };
        let model =
            BertModel::load(vb, &config).map_err(|e| embedding_error("Failed to build BERT model", e))?;

        info!(
            "Sentence embedding model '{}' loaded ({} dimensions)",
            name, config.hidden_size
        );

        Ok(Self {
            name,
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
        })
    }

    fn forward(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {}", e)))?;

        let len = encoding.get_ids().len();
        let input_ids = Tensor::from_vec(encoding.get_ids().to_vec(), (1, len), &self.device)?;
        let token_type_ids = Tensor::from_vec(encoding.get_type_ids().to_vec(), (1, len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(encoding.get_attention_mask().to_vec(), (1, len), &self.device)?;

        // (1, seq_len, hidden)
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean over unmasked tokens
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = output.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = summed.broadcast_div(&counts)?;

        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        let normalized = pooled.broadcast_div(&norm)?;

        normalized.squeeze(0)?.to_vec1::<f32>()
    }
}

impl Embedder for SentenceEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        self.forward(text)
            .map_err(|e| embedding_error(&format!("Failed to embed '{}'", text), e))
    }
}
