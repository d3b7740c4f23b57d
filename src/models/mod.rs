use serde::{Deserialize, Serialize};

pub use product::{Product, NO_CATEGORY, UNNAMED_PRODUCT};

mod product;

/// Query parameters for the recommendation endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendQuery {
    /// The shopping query to match products against
    pub query: String,
}

/// Payload returned by the recommendation endpoint. The product list is
/// omitted entirely when nothing matched, so the caller sees only the
/// apology text in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
}
