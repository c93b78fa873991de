use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use hn_core::{Error, InferenceModel, Result};

use crate::prompt;
use crate::Config;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
const DEFAULT_EMBED_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

#[derive(Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    temperature: f32,
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct GenerationResponse {
    generated_text: String,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    inputs: Vec<String>,
}

/// Remote model served by the HuggingFace Inference API: text generation
/// against a hosted instruct model, embeddings through the
/// feature-extraction pipeline.
pub struct HuggingFaceModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model_name: String,
    embed_model: String,
}

impl HuggingFaceModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("HUGGINGFACEHUB_API_TOKEN").ok())
            .ok_or_else(|| {
                Error::Config(
                    "HuggingFace model needs an API token (--api-key or HUGGINGFACEHUB_API_TOKEN)"
                        .to_string(),
                )
            })?;

        let model_name = std::env::var("HUGGINGFACE_MODEL_NAME")
            .ok()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            client: Arc::new(Client::new()),
            api_key,
            base_url: config
                .model_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model_name,
            embed_model: std::env::var("EMBED_MODEL_NAME")
                .ok()
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
        })
    }
}

impl fmt::Debug for HuggingFaceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuggingFaceModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("embed_model", &self.embed_model)
            .finish()
    }
}

#[async_trait]
impl InferenceModel for HuggingFaceModel {
    fn name(&self) -> &str {
        "HuggingFace"
    }

    async fn answer_question(&self, question: &str, context: &str) -> Result<String> {
        let request = GenerationRequest {
            inputs: prompt::answer_prompt(context, question),
            parameters: GenerationParameters {
                temperature: 0.7,
                max_new_tokens: 256,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.model_name))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Inference(format!("Generation request failed: {}", e)))?
            .json::<Vec<GenerationResponse>>()
            .await?;

        response
            .into_iter()
            .next()
            .map(|r| r.generated_text.trim().to_string())
            .ok_or_else(|| Error::Inference("Empty generation response".to_string()))
    }

    async fn generate_embeddings(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            inputs: vec![text.to_string()],
        };

        let response = self
            .client
            .post(format!(
                "{}/pipeline/feature-extraction/{}",
                self.base_url, self.embed_model
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Inference(format!("Embedding request failed: {}", e)))?
            .json::<Vec<Vec<f32>>>()
            .await?;

        response
            .into_iter()
            .next()
            .ok_or_else(|| Error::Inference("Empty embedding response".to_string()))
    }
}
