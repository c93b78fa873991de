use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use langchain_rust::language_models::llm::LLM;
use langchain_rust::llm::client::GenerationOptions;
use langchain_rust::llm::ollama::client::{Ollama, OllamaClient};

use hn_core::{Error, InferenceModel, Result};

use crate::prompt;
use crate::Config;

const DEFAULT_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Where the Ollama server lives and which model to run. The generation
/// model rides in the URL path, e.g. `http://localhost:11434/llama3.2`.
#[derive(Debug)]
struct OllamaEndpoint {
    host: String,
    port: u16,
    model: String,
}

impl OllamaEndpoint {
    fn from_config(config: &Config) -> Result<Self> {
        let url = config.model_url.as_deref().unwrap_or(DEFAULT_URL);
        let parsed = Url::parse(url)
            .map_err(|e| Error::Config(format!("Invalid model URL {}: {}", url, e)))?;

        let host = format!(
            "{}://{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or("localhost")
        );
        let model = parsed.path().trim_start_matches('/').to_string();

        Ok(Self {
            host,
            port: parsed.port().unwrap_or(11434),
            model: if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model
            },
        })
    }

    fn base_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Locally hosted model behind an Ollama server: generation through
/// langchain-rust, embeddings through the server's embeddings endpoint.
pub struct OllamaModel {
    llm: Ollama,
    http: Arc<reqwest::Client>,
    base_url: String,
    embed_model: String,
}

impl fmt::Debug for OllamaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModel")
            .field("llm", &"<Ollama>")
            .field("base_url", &self.base_url)
            .field("embed_model", &self.embed_model)
            .finish()
    }
}

impl OllamaModel {
    pub async fn new(config: &Config) -> Result<Self> {
        let endpoint = OllamaEndpoint::from_config(config)?;
        let client = Arc::new(OllamaClient::new(endpoint.host.clone(), endpoint.port));

        let llm = Ollama::new(
            client,
            endpoint.model.clone(),
            Some(GenerationOptions::default()),
        );

        // Probe once so a missing server or model fails at startup with an
        // actionable message instead of on the first query.
        if let Err(e) = llm.invoke("test").await {
            return Err(Error::External(anyhow!(
                "Ollama is not available at {}: {}. Ensure the server is running and the model '{}' is installed.",
                endpoint.base_url(),
                e,
                endpoint.model
            )));
        }

        Ok(Self {
            llm,
            http: Arc::new(reqwest::Client::new()),
            base_url: endpoint.base_url(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
        })
    }
}

#[async_trait]
impl InferenceModel for OllamaModel {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn answer_question(&self, question: &str, context: &str) -> Result<String> {
        let prompt = prompt::answer_prompt(context, question);
        self.llm
            .invoke(&prompt)
            .await
            .map_err(|e| Error::Inference(format!("Failed to generate answer: {}", e)))
    }

    async fn generate_embeddings(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.embed_model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .http
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Inference(format!("Embedding request failed: {}", e)))?
            .json::<EmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }
}
