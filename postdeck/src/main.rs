use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use postdeck::common::Client;
use postdeck::db::{self, ClientRepository, SqliteRepository};
use postdeck::server::{
    build_router,
    config::{Configuration, LogFormat},
    services::{
        CaptionRewriter, ChatCompletionGenerator, OAuthManager, PlatformRegistry,
        ScheduleGenerator, StateStore,
    },
    AppState,
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let configuration = Configuration::new()?;
    init_tracing(configuration.server.log_format);
    tracing::info!("Configuration loaded successfully");

    // Storage
    let pool = db::connect_sqlite(&configuration.database.url).await?;
    let repository = Arc::new(SqliteRepository::new(pool));
    for seed in &configuration.clients {
        repository
            .upsert_client(&Client {
                id: seed.id.clone(),
                name: seed.name.clone(),
                created_at: chrono::Utc::now(),
            })
            .await?;
    }

    // Initialize services
    let registry = PlatformRegistry::from_config(&configuration.oauth)?;

    let states = StateStore::new(
        &configuration.oauth.state_secret,
        configuration.server.state_ttl_seconds,
    );
    let oauth = Arc::new(OAuthManager::new(
        registry,
        repository.clone(),
        states,
        &configuration.server.public_url,
    ));

    let scheduler = Arc::new(ScheduleGenerator::new(
        repository.clone(),
        repository,
        configuration.schedule.output_dir.clone(),
    ));

    let rewriter = match ChatCompletionGenerator::from_config(&configuration.ai) {
        Some(generator) => Some(Arc::new(CaptionRewriter::new(Arc::new(generator)))),
        None => {
            tracing::warn!("AI API key not set, caption rewriting disabled");
            None
        }
    };

    let app = build_router(AppState {
        oauth,
        scheduler,
        rewriter,
    });

    // Start server
    let addr = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
