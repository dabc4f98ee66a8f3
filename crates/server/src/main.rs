use std::path::Path;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use klaxon_server::assemble::build_pipeline;
use klaxon_server::config;
use klaxon_server::rest::{self, AppState};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("ctrl-c handler");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config_path = std::env::var("KLAXON_CONFIG").unwrap_or_else(|_| "klaxon.yaml".into());
    let config = match config::load_from_file(Path::new(&config_path)) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(path = %config_path, error = %err, "failed to load config");
            std::process::exit(1);
        }
    };

    let (dispatcher, receivers, metrics) = build_pipeline(&config);
    tracing::info!(
        receivers = receivers.len(),
        timeout_secs = dispatcher.timeout().as_secs(),
        "notification pipelines ready"
    );

    let state = AppState {
        dispatcher,
        receivers,
        metrics,
        started_at: Instant::now(),
    };
    let app = rest::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("bind listen address");
    tracing::info!(addr = %config.listen_addr, "REST server starting");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}
