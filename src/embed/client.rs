//! Embedding client for remote model providers

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::embed::{EmbedError, EmbedResult, EmbeddingModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const DIMENSION_PROBE: &str = "dimension probe";

/// HTTP-backed embedding model (Ollama or OpenAI-compatible)
pub struct RemoteModel {
    client: Client,
    provider: EmbeddingProvider,
    model: String,
    api_key: Option<String>,
    api_base_url: String,
    dimension: usize,
}

impl std::fmt::Debug for RemoteModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteModel")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl RemoteModel {
    /// Build the client and settle the model dimension.
    ///
    /// When the config does not pin a dimension, one probe request is sent
    /// and the length of the returned vector becomes D. Any failure here is
    /// reported as [`EmbedError::Init`].
    pub async fn connect(config: &EmbeddingConfig) -> EmbedResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedError::Init(e.to_string()))?;

        let api_base_url = config.api_base_url.clone().unwrap_or_else(|| {
            match config.provider {
                EmbeddingProvider::OpenAI => "https://api.openai.com/v1".to_string(),
                _ => "http://localhost:11434".to_string(),
            }
        });

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if config.provider == EmbeddingProvider::OpenAI && api_key.is_none() {
            return Err(EmbedError::Init("OpenAI requires an API key".to_string()));
        }

        let mut model = Self {
            client,
            provider: config.provider,
            model: config.model.clone(),
            api_key,
            api_base_url,
            dimension: config.dimension.unwrap_or(0),
        };

        if model.dimension == 0 {
            let probe = model
                .request(DIMENSION_PROBE)
                .await
                .map_err(|e| EmbedError::Init(format!("dimension probe failed: {}", e)))?;
            if probe.is_empty() {
                return Err(EmbedError::Init("model returned an empty embedding".to_string()));
            }
            model.dimension = probe.len();
        }

        info!(
            "Connected to {:?} embedding model '{}' at {}",
            model.provider, model.model, model.api_base_url
        );
        Ok(model)
    }

    async fn request(&self, text: &str) -> EmbedResult<Vec<f32>> {
        match self.provider {
            EmbeddingProvider::OpenAI => self.openai_embedding(text).await,
            EmbeddingProvider::Ollama => self.ollama_embedding(text).await,
            EmbeddingProvider::Hashing => Err(EmbedError::Config(
                "hashing provider has no remote endpoint".to_string(),
            )),
        }
    }

    async fn openai_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: [&'a str; 1],
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<OpenAIData>,
        }

        #[derive(Deserialize)]
        struct OpenAIData {
            embedding: Vec<f32>,
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbedError::Config("OpenAI requires API key".to_string()))?;

        let url = format!("{}/embeddings", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&OpenAIRequest {
                input: [text],
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| EmbedError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Api(format!("OpenAI returned error: {}", error_text)));
        }

        let result: OpenAIResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::Serialization(e.to_string()))?;
        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::Api("OpenAI returned no embeddings".to_string()))
    }

    async fn ollama_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&OllamaRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbedError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::Api(format!("Ollama returned error: {}", error_text)));
        }

        let result: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::Serialization(e.to_string()))?;
        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingModel for RemoteModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> EmbedResult<Vec<f32>> {
        self.request(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_openai_without_key_fails_init() {
        std::env::remove_var("OPENAI_API_KEY");
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            api_base_url: Some("http://127.0.0.1:9".to_string()),
            dimension: Some(1536),
            timeout_secs: 1,
        };
        let err = RemoteModel::connect(&config).await.unwrap_err();
        assert!(matches!(err, EmbedError::Init(_)));
    }

    #[tokio::test]
    async fn test_pinned_dimension_skips_probe() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Ollama,
            model: "nomic-embed-text".to_string(),
            api_key: None,
            api_base_url: Some("http://127.0.0.1:9".to_string()),
            dimension: Some(768),
            timeout_secs: 1,
        };
        let model = RemoteModel::connect(&config).await.unwrap();
        assert_eq!(model.dimension(), 768);
    }

    #[tokio::test]
    async fn test_unreachable_probe_fails_init() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Ollama,
            model: "nomic-embed-text".to_string(),
            api_key: None,
            api_base_url: Some("http://127.0.0.1:9".to_string()),
            dimension: None,
            timeout_secs: 1,
        };
        let err = RemoteModel::connect(&config).await.unwrap_err();
        assert!(matches!(err, EmbedError::Init(_)));
    }
}
