pub mod health;
#[path = "recommend.rs"]
pub mod recommend_handler;

pub use health::health_check;
pub use recommend_handler::recommend;
