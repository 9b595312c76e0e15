pub mod catalog;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod search;
pub mod server;
pub mod types;
pub mod view;

#[cfg(test)]
mod testutil;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use config::{Config, MetricsBackend};
use metrics::{AppwriteRepository, MemoryRepository, MetricsRepo, SearchAnalytics, SqliteRepository};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),
    #[error("Metrics store error: {0}")]
    Metrics(#[from] metrics::MetricsError),
    #[error("Server error: {0}")]
    Server(String),
}

/// Open the metrics store selected by the configuration.
pub async fn open_metrics_repo(config: &Config) -> Result<Arc<dyn MetricsRepo>, ServerError> {
    let repo: Arc<dyn MetricsRepo> = match config.metrics.backend {
        MetricsBackend::Appwrite => {
            let appwrite = config
                .metrics
                .appwrite
                .as_ref()
                .ok_or_else(|| config::ConfigError::Missing("metrics.appwrite".to_string()))?;
            info!(
                "Using Appwrite metrics store at {} (database {}, table {})",
                appwrite.endpoint, appwrite.database, appwrite.table
            );
            Arc::new(AppwriteRepository::new(appwrite)?)
        }
        MetricsBackend::Sqlite => {
            let sqlite = config
                .metrics
                .sqlite
                .as_ref()
                .ok_or_else(|| config::ConfigError::Missing("metrics.sqlite.filename".to_string()))?;
            info!("Opening metrics database at {}", sqlite.filename);
            Arc::new(SqliteRepository::new(&sqlite.filename).await?)
        }
        MetricsBackend::Memory => {
            info!("Using in-memory metrics store; search counts are lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };
    Ok(repo)
}

pub async fn run(config_path: &str, debug_logs: bool) -> Result<(), ServerError> {
    let mut config = Config::from_file(config_path)?;
    config.apply_env();
    config.validate()?;
    config.debug_logs = debug_logs;

    info!("Using config file: {}", config_path);
    info!("Movie API: {}", config.tmdb.api_base);
    if debug_logs {
        info!("Debug logging enabled");
    }

    let catalog = Arc::new(catalog::TmdbClient::new(&config.tmdb)?);
    let repo = open_metrics_repo(&config).await?;
    let analytics = Arc::new(SearchAnalytics::new(
        repo,
        &config.tmdb.image_base,
        config.metrics.trending,
    ));

    let deps = view::ViewDeps { catalog, analytics };
    let sessions = Arc::new(view::SessionRepo::new(
        deps,
        config.search.debounce_window(),
        config.search.session_idle(),
    )
    .with_limit(config.search.max_sessions));
    sessions.clone().start_background_reaper(Duration::from_secs(60));

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let tls = match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
        _ => None,
    };

    let state = server::AppState::new(config, sessions);
    let app = server::build_router(state);

    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from {}", cert_path);
        info!("Loading TLS key from {}", key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

        info!("Serving HTTPS on {}", addr);

        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    } else {
        info!("Serving HTTP on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    }

    Ok(())
}
