use crate::error::Result;
use async_trait::async_trait;

pub use huggingface::HuggingFaceEmbedder;

pub mod huggingface;

/// Converts a piece of text into a fixed-length vector. Implementations are
/// pure from the caller's perspective: the same text yields the same vector
/// within one process lifetime.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
