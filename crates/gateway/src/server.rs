use std::{future::Future, sync::Arc};

use {
    anyhow::Context,
    axum::{
        Router,
        extract::State,
        http::Uri,
        response::{IntoResponse, Response},
        routing::get,
    },
    readproxy_browser::{CdpEngine, Target},
    readproxy_common::Classify,
    readproxy_config::ProxyConfig,
    tokio::net::TcpListener,
    tower_http::trace::TraceLayer,
    tracing::{debug, error, info},
};

use crate::{response, state::AppState};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/robots.txt", get(robots_handler))
        .route("/", get(extract_handler))
        .route("/{*target}", get(extract_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves, then tear down browser
/// state.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sessions = Arc::clone(state.pipeline.sessions());
    let served = axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await;
    info!("server stopped, shutting down browser");
    sessions.shutdown().await;
    served.context("HTTP server failed")
}

/// Start the proxy with the real Chromium engine and run until a
/// termination signal arrives.
pub async fn start_gateway(config: &ProxyConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config, Arc::new(CdpEngine));
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %listener.local_addr()?,
        mode = %state.pipeline.sessions().mode(),
        "web text proxy listening"
    );
    serve(listener, state, shutdown_signal()).await
}

/// Resolves on Ctrl+C, or on SIGTERM/SIGINT on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM"),
                    _ = sigint.recv() => info!("received SIGINT"),
                }
            },
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C"),
        () = terminate => {},
    }
    info!("shutdown signal received, draining requests");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn robots_handler() -> impl IntoResponse {
    response::robots()
}

async fn extract_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let raw = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());
    let Some(target) = Target::resolve(raw) else {
        debug!(raw, "rejected request without a usable target");
        return response::invalid_target();
    };

    match state.pipeline.extract(&target).await {
        Ok(article) => response::article(&article.text),
        Err(err) => {
            let mode = state.pipeline.sessions().mode().to_string();
            let message = state
                .diagnostics
                .record(&err, [("target", target.to_string()), ("mode", mode)]);
            let detail = err.detail().map(|_| message);
            response::failure(err.kind(), detail)
        },
    }
}
