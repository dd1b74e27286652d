use std::net::SocketAddr;
use std::sync::Arc;

use easel_genai::{GenAiClient, GenAiConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easel_api::config::ServerConfig;
use easel_api::router::build_app_router;
use easel_api::state::AppState;

const DEFAULT_LOG_FILTER: &str = "easel_api=debug,easel_genai=debug,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    let genai_config = GenAiConfig::from_env();
    log_configuration(&config, &genai_config);

    let pool = connect_database().await;

    let generator = GenAiClient::new(genai_config).expect("Failed to build generation client");
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        generator: Arc::new(generator),
    };
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Easel API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn log_configuration(config: &ServerConfig, genai: &GenAiConfig) {
    tracing::info!(
        host = %config.host,
        port = config.port,
        teacher_key = config.teacher_key.is_some(),
        secure_cookies = config.cookies.secure,
        "Loaded server configuration"
    );
    tracing::info!(
        api_url = %genai.api_url,
        image_model = %genai.image_model,
        chat_model = %genai.chat_model,
        image_mode = ?genai.image_mode,
        timeout_secs = genai.timeout.as_secs(),
        "Loaded generation provider configuration"
    );
    if genai.timeout.as_secs() >= config.request_timeout_secs {
        tracing::warn!(
            genai_timeout_secs = genai.timeout.as_secs(),
            request_timeout_secs = config.request_timeout_secs,
            "Generation timeout is not below the request timeout; slow providers will surface as 408"
        );
    }
}

/// Connect, probe and migrate. Any failure aborts startup.
async fn connect_database() -> easel_db::DbPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = easel_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    easel_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    easel_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database ready");
    pool
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
