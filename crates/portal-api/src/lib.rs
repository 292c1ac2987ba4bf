//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Client portal HTTP API."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! JSON routes behind the client portal front end, plus the quotation
//! HTML/PDF downloads, `/metrics`, and optional static asset hosting.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, get_service, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod error;
pub mod extract;
pub mod metrics;
pub mod quote;
pub mod routes;
pub mod session;
pub mod state;

pub use error::ApiError;
pub use extract::JsonBody;
pub use metrics::PortalMetrics;
pub use quote::{price_quotation, QuoteError};
pub use routes::auth::ClientProfile;
pub use routes::quotations::RespondResponse;
pub use routes::system::StatusResponse;
pub use session::{session_cookie, ClientSession};
pub use state::PortalState;

/// Build the portal router around shared state.
pub fn router(state: Arc<PortalState>) -> Router {
    let static_dir = state.config().server.static_dir.clone();
    let api_routes = Router::new()
        .route("/api/login", post(routes::auth::login))
        .route("/api/logout", post(routes::auth::logout))
        .route("/api/me", get(routes::auth::me))
        .route("/api/projects", get(routes::projects::list))
        .route("/api/projects/:id", get(routes::projects::detail))
        .route("/api/quotations", get(routes::quotations::list))
        .route("/api/quotations/:id", get(routes::quotations::detail))
        .route(
            "/api/quotations/:id/response",
            post(routes::quotations::respond),
        )
        .route("/api/quotations/:id/html", get(routes::quotations::html))
        .route("/api/quotations/:id/pdf", get(routes::quotations::pdf))
        .route("/api/orders", get(routes::orders::list))
        .route("/api/status", get(routes::system::status))
        .route("/metrics", get(routes::system::metrics))
        .with_state(state);

    if let Some(dir) = static_dir {
        let service = get_service(ServeDir::new(dir).append_index_html_on_directories(true));
        Router::new()
            .merge(api_routes)
            .fallback_service(service)
            .layer(TraceLayer::new_for_http())
    } else {
        api_routes.layer(TraceLayer::new_for_http())
    }
}

/// Handle to the running portal server.
#[derive(Debug)]
pub struct PortalServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl PortalServer {
    /// Address the listener is bound to; resolves port `0` to the real port.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections, drain in-flight requests, and wait.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.wait().await
    }

    /// Wait for the server task to end.
    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

/// Bind `addr` and serve the portal until [`PortalServer::shutdown`].
pub fn spawn_portal_server(state: Arc<PortalState>, addr: SocketAddr) -> Result<PortalServer> {
    let router = router(state);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind portal listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure portal listener as non-blocking")?;
    let addr = listener
        .local_addr()
        .context("failed to read portal listener address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %addr, "portal listening");
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %addr, error = %err, "portal server exited with error");
            return Err(err.into());
        }
        info!(address = %addr, "portal stopped");
        Ok(())
    });

    Ok(PortalServer {
        addr,
        shutdown: Some(shutdown_tx),
        task,
    })
}
