use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const CATALOG_TIMEOUT_SECONDS: u64 = 15;

/// Client for the upstream store catalog API.
///
/// Every failure mode degrades to an empty product list: downstream code
/// treats "no products" as a normal outcome, never an exceptional one.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    products: Vec<Value>,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(CATALOG_TIMEOUT_SECONDS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    /// Fetch the current product list. Entries are returned as raw JSON
    /// values; validation into `Product` records happens during matching.
    pub async fn fetch_products(&self) -> Vec<Value> {
        let response = match self.client.get(&self.base_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Catalog request failed: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(
                "Catalog returned non-success status {}, treating as empty",
                response.status()
            );
            return Vec::new();
        }

        match response.json::<CatalogResponse>().await {
            Ok(catalog) => {
                debug!("Fetched {} catalog entries", catalog.products.len());
                catalog.products
            }
            Err(e) => {
                warn!("Catalog response was not parseable: {}", e);
                Vec::new()
            }
        }
    }
}
