use crate::ml::Embedder;
use crate::models::RecommendResponse;
use crate::services::composer::NO_MATCHES_MESSAGE;
use crate::services::{CatalogClient, ProductMatcher, ResponseComposer};
use std::sync::Arc;
use tracing::{info, warn};

/// Matches returned per request.
pub const DEFAULT_TOP_N: usize = 3;

/// Sequences the recommendation flow: fetch the catalog, rank it against
/// the query, then have the composer phrase the answer.
pub struct RecommendationService {
    catalog: CatalogClient,
    matcher: ProductMatcher,
    composer: ResponseComposer,
}

impl RecommendationService {
    pub fn new(
        catalog: CatalogClient,
        embedder: Arc<dyn Embedder>,
        composer: ResponseComposer,
    ) -> Self {
        Self {
            catalog,
            matcher: ProductMatcher::new(embedder),
            composer,
        }
    }

    /// Every upstream failure path lands in the no-matches branch, so the
    /// caller always receives a normal payload. The product list is only
    /// populated when matching found something.
    pub async fn recommend(&self, query: &str) -> RecommendResponse {
        let candidates = self.catalog.fetch_products().await;

        let matched = match self
            .matcher
            .find_best_matches(query, &candidates, DEFAULT_TOP_N)
            .await
        {
            Ok(matched) => matched,
            Err(e) => {
                warn!("Matching failed for query '{}': {}", query, e);
                Vec::new()
            }
        };

        if matched.is_empty() {
            info!("No products matched query '{}'", query);
            return RecommendResponse {
                response: NO_MATCHES_MESSAGE.to_string(),
                products: None,
            };
        }

        info!("Matched {} products for query '{}'", matched.len(), query);
        let response = self.composer.compose(query, &matched).await;

        RecommendResponse {
            response,
            products: Some(matched),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct KeywordEmbedder;

    const VOCAB: [&str; 4] = ["shoes", "hat", "footwear", "accessory"];

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(VOCAB
                .iter()
                .map(|word| lower.matches(word).count() as f32)
                .collect())
        }
    }

    fn service(catalog_url: &str, ollama_url: &str) -> RecommendationService {
        RecommendationService::new(
            CatalogClient::new(catalog_url),
            Arc::new(KeywordEmbedder),
            ResponseComposer::new(ollama_url, "mistral"),
        )
    }

    #[actix_web::test]
    async fn recommends_closest_product_with_composed_text() {
        let mut catalog = mockito::Server::new_async().await;
        catalog
            .mock("GET", "/api/products")
            .with_status(200)
            .with_body(
                json!({"products": [
                    {"title": "Red Shoes", "type": "Footwear"},
                    {"title": "Blue Hat", "type": "Accessory"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let mut ollama = mockito::Server::new_async().await;
        ollama
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::Regex("Red Shoes".to_string()))
            .with_status(200)
            .with_body(
                json!({"message": {"role": "assistant", "content": "The Red Shoes fit perfectly."}})
                    .to_string(),
            )
            .create_async()
            .await;

        let service = service(&format!("{}/api/products", catalog.url()), &ollama.url());
        let result = service.recommend("shoes").await;

        assert_eq!(result.response, "The Red Shoes fit perfectly.");
        let products = result.products.unwrap();
        assert_eq!(products[0].title.as_deref(), Some("Red Shoes"));
    }

    #[actix_web::test]
    async fn catalog_failure_degrades_to_no_matches_payload() {
        let mut ollama = mockito::Server::new_async().await;
        let chat_mock = ollama
            .mock("POST", "/api/chat")
            .expect(0)
            .create_async()
            .await;

        // Nothing is listening on port 9.
        let service = service("http://127.0.0.1:9/api/products", &ollama.url());
        let result = service.recommend("shoes").await;

        assert_eq!(result.response, NO_MATCHES_MESSAGE);
        assert!(result.products.is_none());
        chat_mock.assert_async().await;
    }

    #[actix_web::test]
    async fn non_json_catalog_body_degrades_to_no_matches_payload() {
        let mut catalog = mockito::Server::new_async().await;
        catalog
            .mock("GET", "/api/products")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let mut ollama = mockito::Server::new_async().await;
        let chat_mock = ollama
            .mock("POST", "/api/chat")
            .expect(0)
            .create_async()
            .await;

        let service = service(&format!("{}/api/products", catalog.url()), &ollama.url());
        let result = service.recommend("shoes").await;

        assert_eq!(result.response, NO_MATCHES_MESSAGE);
        assert!(result.products.is_none());
        chat_mock.assert_async().await;
    }
}
