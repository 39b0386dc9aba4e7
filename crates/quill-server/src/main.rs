use std::path::Path;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use quill_api::service::BlogService;
use quill_db::{Database, MirrorStore, SqliteMirror};
use quill_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "quill=debug,quill_api=debug,quill_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let mirror = connect_secondary(config.secondary_db_path.as_deref());
    let service = BlogService::new(db, mirror, config.mirror_timeout);
    let mirroring = service.has_mirror();

    let app = quill_api::router(Arc::new(service)).layer(TraceLayer::new_for_http());

    let addr = config.bind_addr()?;
    info!(
        "Quill listening on {} (mirroring {})",
        addr,
        if mirroring { "on" } else { "off" }
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Probe the secondary once. If it is not there now, the process runs
/// without it until restarted.
fn connect_secondary(path: Option<&Path>) -> Option<Arc<dyn MirrorStore>> {
    let path = path?;
    match SqliteMirror::probe(path) {
        Ok(mirror) => Some(Arc::new(mirror)),
        Err(e) => {
            warn!("Secondary store not available, continuing without it: {:#}", e);
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
