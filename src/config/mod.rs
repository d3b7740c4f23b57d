use std::env;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CATALOG_URL: &str = "http://localhost:6005/api/products";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "mistral";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub catalog_url: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
}

impl Config {
    /// Build the configuration from the environment. Every knob has a
    /// compiled-in default, so a bare process comes up pointing at a local
    /// store backend and a local Ollama instance.
    pub fn load() -> Self {
        Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            catalog_url: env::var("APP_CATALOG_URL")
                .unwrap_or_else(|_| DEFAULT_CATALOG_URL.to_string()),
            ollama_base_url: env::var("APP_OLLAMA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OLLAMA_BASE_URL.to_string()),
            ollama_model: env::var("APP_OLLAMA_MODEL")
                .unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string()),
        }
    }
}
