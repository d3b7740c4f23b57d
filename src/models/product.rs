use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNNAMED_PRODUCT: &str = "Unnamed Product";
pub const NO_CATEGORY: &str = "No category";

/// A product record as supplied by the store catalog. The four text fields
/// drive matching; everything else the catalog sends is carried through the
/// flattened map and serialized back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Product {
    /// Validate a raw catalog entry. Anything that is not an object with the
    /// expected field shapes is rejected, which is how malformed entries get
    /// dropped from matching.
    pub fn from_value(value: &Value) -> Option<Product> {
        serde_json::from_value(value.clone()).ok()
    }

    /// The text that represents this product for embedding purposes:
    /// title, description, type and metadata joined by single spaces, with
    /// absent fields contributing an empty string.
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or(""),
            self.kind.as_deref().unwrap_or(""),
            self.metadata.as_deref().unwrap_or(""),
        )
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNNAMED_PRODUCT)
    }

    pub fn display_kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(NO_CATEGORY)
    }
}
