use crate::error::Result;
use crate::ml::Embedder;
use crate::models::Product;
use ndarray::Array1;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ranks catalog entries by semantic similarity to a query.
pub struct ProductMatcher {
    embedder: Arc<dyn Embedder>,
}

impl ProductMatcher {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Return up to `top_n` products ordered by descending similarity to the
    /// query. Scoring is the raw dot product of the candidate and query
    /// embeddings, not cosine similarity: vector magnitude influences rank.
    ///
    /// Candidates that are not well-formed product records are skipped, as
    /// are candidates whose embedding cannot be computed. A failure to embed
    /// the query itself aborts the whole match.
    pub async fn find_best_matches(
        &self,
        query: &str,
        candidates: &[Value],
        top_n: usize,
    ) -> Result<Vec<Product>> {
        let query_embedding = Array1::from(self.embedder.embed(query).await?);

        let mut scored: Vec<(Product, f32)> = Vec::new();

        for candidate in candidates {
            let Some(product) = Product::from_value(candidate) else {
                debug!("Skipping malformed catalog entry");
                continue;
            };

            let embedding = match self.embedder.embed(&product.embedding_text()).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!("Skipping product {:?}: {}", product.title, e);
                    continue;
                }
            };

            // Array1::dot panics on length mismatch, so guard against a
            // candidate vector of unexpected dimension.
            if embedding.len() != query_embedding.len() {
                warn!(
                    "Skipping product {:?}: embedding dimension {} does not match query {}",
                    product.title,
                    embedding.len(),
                    query_embedding.len()
                );
                continue;
            }

            let score = Array1::from(embedding).dot(&query_embedding);
            scored.push((product, score));
        }

        // Stable sort keeps catalog order for equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_n);

        debug!(
            "Matched {} of {} candidates for query '{}'",
            scored.len(),
            candidates.len(),
            query
        );

        Ok(scored.into_iter().map(|(product, _)| product).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use async_trait::async_trait;
    use serde_json::json;

    /// Deterministic embedder: each dimension counts occurrences of one
    /// vocabulary word in the lowercased input.
    struct KeywordEmbedder;

    const VOCAB: [&str; 6] = ["shoes", "hat", "red", "blue", "footwear", "accessory"];

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

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(ApiError::ModelInferenceError("offline".to_string()))
        }
    }

    fn matcher() -> ProductMatcher {
        ProductMatcher::new(Arc::new(KeywordEmbedder))
    }

    fn sample_catalog() -> Vec<Value> {
        vec![
            json!({"title": "Red Shoes", "type": "Footwear"}),
            json!({"title": "Blue Hat", "type": "Accessory"}),
            json!({"title": "Red Scarf", "type": "Accessory"}),
        ]
    }

    #[actix_web::test]
    async fn empty_candidate_list_yields_empty_result() {
        let matches = matcher().find_best_matches("shoes", &[], 3).await.unwrap();
        assert!(matches.is_empty());
    }

    #[actix_web::test]
    async fn malformed_only_candidates_yield_empty_result() {
        let candidates = vec![json!("not a record"), json!(7), json!([1, 2, 3])];
        let matches = matcher()
            .find_best_matches("shoes", &candidates, 3)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[actix_web::test]
    async fn never_returns_more_than_top_n() {
        let matches = matcher()
            .find_best_matches("red", &sample_catalog(), 2)
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[actix_web::test]
    async fn only_returns_records_present_in_input() {
        let catalog = sample_catalog();
        let input_titles: Vec<String> = catalog
            .iter()
            .map(|v| v["title"].as_str().unwrap().to_string())
            .collect();

        let matches = matcher().find_best_matches("hat", &catalog, 3).await.unwrap();
        for product in matches {
            assert!(input_titles.contains(&product.title.unwrap()));
        }
    }

    #[actix_web::test]
    async fn ranks_closest_product_first() {
        let matches = matcher()
            .find_best_matches("shoes", &sample_catalog(), 3)
            .await
            .unwrap();
        assert_eq!(matches[0].title.as_deref(), Some("Red Shoes"));
    }

    #[actix_web::test]
    async fn ranking_is_deterministic() {
        let catalog = sample_catalog();
        let m = matcher();
        let first: Vec<_> = m
            .find_best_matches("red accessory", &catalog, 3)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        let second: Vec<_> = m
            .find_best_matches("red accessory", &catalog, 3)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(first, second);
    }

    #[actix_web::test]
    async fn query_embedding_failure_is_propagated() {
        let matcher = ProductMatcher::new(Arc::new(FailingEmbedder));
        let result = matcher.find_best_matches("shoes", &sample_catalog(), 3).await;
        assert!(result.is_err());
    }
}
