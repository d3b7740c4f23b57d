use crate::error::{ApiError, Result};
use crate::ml::Embedder;
use async_trait::async_trait;
use lazy_static::lazy_static;
use lru::LruCache;
use reqwest::Client;
use serde::Serialize;
use std::env;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;
const EMBEDDING_CACHE_SIZE: usize = 100;

lazy_static! {
    // Process-wide embedding cache. The embedder is a pure function of its
    // input text, so memoizing results only saves API round trips.
    static ref EMBEDDING_CACHE: RwLock<LruCache<String, Vec<f32>>> = {
        let size = NonZeroUsize::new(EMBEDDING_CACHE_SIZE).unwrap();
        RwLock::new(LruCache::new(size))
    };
}

/// Sentence embedder backed by the HuggingFace inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceEmbedder {
    client: Client,
    api_key: String,
    model_url: String,
    model_name: String,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
    options: EmbedOptions,
}

#[derive(Serialize)]
struct EmbedOptions {
    wait_for_model: bool,
    use_cache: bool,
}

impl HuggingFaceEmbedder {
    /// Create an embedder from the environment. The API key is the only
    /// required piece; model name, base URL, timeout and retry policy all
    /// fall back to compiled-in defaults.
    pub fn new() -> Result<Self> {
        let api_key = env::var("APP_HUGGINGFACE_API_KEY").map_err(|_| {
            ApiError::ModelLoadError(
                "Missing APP_HUGGINGFACE_API_KEY environment variable".to_string(),
            )
        })?;

        if api_key.trim().is_empty() {
            return Err(ApiError::ModelLoadError(
                "APP_HUGGINGFACE_API_KEY is empty".to_string(),
            ));
        }

        let base_url =
            env::var("APP_HUGGINGFACE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model_name = env::var("APP_HUGGINGFACE_MODEL_NAME")
            .unwrap_or_else(|_| DEFAULT_MODEL_NAME.to_string());
        let timeout_seconds = env::var("APP_HUGGINGFACE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        let retry_attempts = env::var("APP_HUGGINGFACE_RETRY_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_ATTEMPTS);
        let retry_delay_ms = env::var("APP_HUGGINGFACE_RETRY_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_DELAY_MS);

        Self::from_parts(
            &api_key,
            &base_url,
            &model_name,
            timeout_seconds,
            retry_attempts,
            retry_delay_ms,
        )
    }

    /// Create an embedder with explicit settings, bypassing the environment.
    pub fn from_parts(
        api_key: &str,
        base_url: &str,
        model_name: &str,
        timeout_seconds: u64,
        retry_attempts: u32,
        retry_delay_ms: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ApiError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let model_url = format!("{}/models/{}", base_url.trim_end_matches('/'), model_name);

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model_url,
            model_name: model_name.to_string(),
            retry_attempts: retry_attempts.max(1),
            retry_delay_ms,
        })
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let preprocessed = preprocess_text(text);

        if let Ok(cache) = EMBEDDING_CACHE.read() {
            if let Some(embedding) = cache.peek(&preprocessed).cloned() {
                debug!("Embedding cache hit for text of length {}", text.len());
                return Ok(embedding);
            }
        }

        let mut last_error = ApiError::ModelInferenceError(
            "All retry attempts failed when encoding text".to_string(),
        );

        for attempt in 1..=self.retry_attempts {
            match self.request_embedding(&preprocessed).await {
                Ok(embedding) => {
                    if let Ok(mut cache) = EMBEDDING_CACHE.write() {
                        cache.put(preprocessed.clone(), embedding.clone());
                    }
                    return Ok(embedding);
                }
                Err(e) => {
                    if attempt < self.retry_attempts {
                        warn!(
                            "Embedding request failed (attempt {}/{}): {}. Retrying...",
                            attempt, self.retry_attempts, e
                        );
                        let delay = self.retry_delay_ms * 2u64.pow(attempt - 1);
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn request_embedding(&self, input: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            inputs: input,
            options: EmbedOptions {
                wait_for_model: true,
                use_cache: true,
            },
        };

        let response = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ApiError::ModelInferenceError(format!("Failed to reach model API: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::ModelInferenceError(format!(
                "Model API returned non-success status for {}: {} - {}",
                self.model_name, status, text
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            ApiError::SerializationError(format!("Failed to parse model response: {}", e))
        })?;

        parse_embedding(&body)
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.encode(text).await
    }
}

/// The inference API rejects empty input, so blank text embeds a fixed
/// stand-in string instead.
fn preprocess_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty text".to_string();
    }
    trimmed.to_string()
}

/// The API answers `[[f32]]` for single-input requests on most sentence
/// models, bare `[f32]` on some others. Accept both.
fn parse_embedding(body: &serde_json::Value) -> Result<Vec<f32>> {
    let array = body.as_array().ok_or_else(|| {
        ApiError::ModelInferenceError("Model response is not an array".to_string())
    })?;

    if array.is_empty() {
        return Err(ApiError::ModelInferenceError(
            "Model returned an empty array".to_string(),
        ));
    }

    let floats = if array[0].is_array() {
        array[0].as_array().unwrap().as_slice()
    } else {
        array.as_slice()
    };

    let embedding: Vec<f32> = floats
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();

    if embedding.is_empty() {
        return Err(ApiError::ModelInferenceError(
            "Failed to extract embedding from response".to_string(),
        ));
    }

    Ok(embedding)
}
