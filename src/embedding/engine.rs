// Sentence embeddings via a BERT model running on candle
use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::embedding::Embedder;
use crate::errors::{PolicyError, Result};

/// Loaded model, tokenizer and device; shared across blocking tasks
struct BertEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Embedder backed by a sentence-transformers BERT checkpoint
#[derive(Clone)]
pub struct CandleEmbedder {
    encoder: Arc<BertEncoder>,
    model_id: String,
    dimension: usize,
}

impl CandleEmbedder {
    /// Load a model from the HuggingFace hub (downloads on first use)
    pub fn from_hub(model_id: &str) -> Result<Self> {
        Self::load(model_id).map_err(PolicyError::from)
    }

    fn load(model_id: &str) -> AnyResult<Self> {
        let device = Device::Cpu;

        let api = Api::new().context("Failed to create HuggingFace API client")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo.get("config.json")
            .context("Failed to download model config")?;
        let tokenizer_path = repo.get("tokenizer.json")
            .context("Failed to download tokenizer")?;
        let weights_path = repo.get("model.safetensors")
            .context("Failed to download model weights")?;

        let config_contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;
        let config: Config = serde_json::from_str(&config_contents)
            .context("Failed to parse model config")?;
        let dimension = config.hidden_size;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };

        let model = BertModel::load(vb, &config)
            .context("Failed to create BERT model")?;

        Ok(Self {
            encoder: Arc::new(BertEncoder { model, tokenizer, device }),
            model_id: model_id.to_string(),
            dimension,
        })
    }

    /// Embed several texts in one forward pass
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.encoder.encode(texts).map_err(PolicyError::from)
    }
}

impl BertEncoder {
    fn encode(&self, texts: &[&str]) -> AnyResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self.tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch_size = texts.len();

        // Pad sequences
        let mut padded_ids = vec![0u32; batch_size * max_len];
        let mut padded_mask = vec![0u32; batch_size * max_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            padded_ids[i * max_len..i * max_len + ids.len()].copy_from_slice(ids);
            padded_mask[i * max_len..i * max_len + mask.len()].copy_from_slice(mask);
        }

        let token_ids = Tensor::from_vec(padded_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(padded_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self.model.forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = Self::mean_pool(&hidden, &attention_mask)?;
        let normalized = Self::l2_normalize(&pooled)?;

        Ok(normalized.to_vec2::<f32>()?)
    }

    /// Mean pooling with attention mask
    fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> AnyResult<Tensor> {
        let mask = attention_mask
            .unsqueeze(2)?
            .expand(hidden.shape())?
            .to_dtype(hidden.dtype())?;

        let summed = (hidden * &mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(summed.broadcast_div(&counts)?)
    }

    fn l2_normalize(embeddings: &Tensor) -> AnyResult<Tensor> {
        let norms = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        Ok(embeddings.broadcast_div(&norms)?)
    }
}

#[async_trait]
impl Embedder for CandleEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoder = Arc::clone(&self.encoder);
        let text = text.to_string();

        let mut vectors = tokio::task::spawn_blocking(move || encoder.encode(&[text.as_str()]))
            .await
            .map_err(|e| PolicyError::EmbeddingFailure(format!("Embedding task failed: {}", e)))??;

        vectors
            .pop()
            .ok_or_else(|| PolicyError::EmbeddingFailure("Model returned no vector".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
