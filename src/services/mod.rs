pub mod catalog;
pub mod composer;
pub mod matcher;
pub mod recommendation;

// Re-export public types
pub use catalog::CatalogClient;
pub use composer::ResponseComposer;
pub use matcher::ProductMatcher;
pub use recommendation::RecommendationService;
