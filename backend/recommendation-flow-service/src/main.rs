use actix_web::{web, App, HttpServer};
use anyhow::Context;
use recommendation_flow::controllers::PipelineContext;
use recommendation_flow::handlers::{self, AppState, Enricher};
use recommendation_flow::services::prediction::LinearModelWeights;
use recommendation_flow::store::{EngagementStore, InMemoryStore, RedisEngagementStore, Stores};
use recommendation_flow::{Config, RecommendationService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load config
    let config = Config::from_env().context("Failed to load config")?;

    info!(
        "Starting {} on HTTP:{}",
        config.service.service_name, config.service.http_port
    );

    // Catalog snapshot backs content metadata and embeddings
    let catalog = Arc::new(
        InMemoryStore::from_json_file(&config.data.catalog_path)
            .context("Failed to load catalog snapshot")?,
    );

    let engagement: Arc<dyn EngagementStore> = match &config.data.redis_url {
        Some(url) => {
            info!("Serving engagement signals from Redis");
            let redis_client = redis::Client::open(url.as_str()).context("Failed to create Redis client")?;
            Arc::new(RedisEngagementStore::new(redis_client))
        }
        None => {
            info!("Serving engagement signals from the catalog snapshot");
            catalog.clone()
        }
    };

    let stores = Stores::new(catalog.clone(), engagement, catalog);

    let weights = match &config.data.linear_model_weights_path {
        Some(path) => LinearModelWeights::from_json_file(path)?,
        None => LinearModelWeights::default(),
    };

    let context = PipelineContext::new(stores.clone(), config.pipeline_settings(), weights);
    let service = Arc::new(RecommendationService::new(&context));

    let state = web::Data::new(AppState {
        service,
        enricher: Enricher::new(stores.content.clone(), stores.engagement.clone()),
        default_limit: config.service.default_limit,
        max_limit: config.service.max_limit,
    });

    let addr = ("0.0.0.0", config.service.http_port);
    info!("HTTP server listening on {}:{}", addr.0, addr.1);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(handlers::configure))
        .bind(addr)
        .with_context(|| format!("Failed to bind HTTP port {}", addr.1))?
        .run()
        .await
        .context("HTTP server error")?;

    Ok(())
}
