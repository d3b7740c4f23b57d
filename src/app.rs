use crate::{
    config::Config,
    error::Result,
    ml::{Embedder, HuggingFaceEmbedder},
    routes::api_routes,
    services::{CatalogClient, RecommendationService, ResponseComposer},
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use log::info;
use std::net::TcpListener;
use std::sync::Arc;

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        // Always bind to 0.0.0.0 for Docker compatibility
        let bind_address = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}:{}", self.host, self.port);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    /// This is useful for testing where we want to use a random port
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        // The embedding model client is process-wide state, created once and
        // shared by every request.
        let embedder: Arc<dyn Embedder> = Arc::new(
            HuggingFaceEmbedder::new().context("Failed to initialize sentence embedder")?,
        );

        let catalog = CatalogClient::new(&self.config.catalog_url);
        let composer =
            ResponseComposer::new(&self.config.ollama_base_url, &self.config.ollama_model);

        let recommendation_service =
            web::Data::new(RecommendationService::new(catalog, embedder, composer));

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(recommendation_service.clone())
                .service(api_routes())
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}
