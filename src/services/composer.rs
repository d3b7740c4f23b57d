use crate::error::{ApiError, Result};
use crate::models::Product;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Returned verbatim when matching produced no products.
pub const NO_MATCHES_MESSAGE: &str = "Sorry, I couldn't find any matching products.";

/// Returned verbatim when the generative model fails to produce text.
pub const GENERATION_FALLBACK_MESSAGE: &str = "Sorry, I couldn't generate a response.";

const CHAT_TIMEOUT_SECONDS: u64 = 120;

/// Phrases a natural-language recommendation by sending the query and the
/// matched products to a chat-completion model.
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ResponseComposer {
    pub fn new(base_url: &str, model: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(CHAT_TIMEOUT_SECONDS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Compose the recommendation text for a query and its matched products.
    ///
    /// An empty match list short-circuits to the fixed no-matches message
    /// without touching the model. A model failure of any kind (transport,
    /// status, missing reply text) degrades to the fixed fallback string.
    pub async fn compose(&self, query: &str, products: &[Product]) -> String {
        if products.is_empty() {
            return NO_MATCHES_MESSAGE.to_string();
        }

        let prompt = build_prompt(query, products);
        debug!("Sending prompt of {} chars to {}", prompt.len(), self.model);

        match self.chat(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Chat completion failed: {}", e);
                GENERATION_FALLBACK_MESSAGE.to_string()
            }
        }
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::ExternalServiceError(format!(
                "Chat model returned non-success status: {} - {}",
                status, text
            )));
        }

        let reply: ChatResponse = response.json().await.map_err(|e| {
            ApiError::SerializationError(format!("Failed to parse chat response: {}", e))
        })?;

        reply
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| ApiError::ExternalServiceError("Chat reply carried no text".to_string()))
    }
}

/// One bullet line per product, placeholders for absent fields, and the
/// original query embedded in a fixed instruction template.
fn build_prompt(query: &str, products: &[Product]) -> String {
    let product_list = products
        .iter()
        .map(|p| format!("- {} ({})", p.display_title(), p.display_kind()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "User Query: \"{}\"\nRecommended Products:\n{}\n\nProvide a short, natural response recommending these products.",
        query, product_list
    )
}
