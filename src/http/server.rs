//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router around the dispatcher
//! - Wire up the gatekeeping chain and tower layers (request ID, trace, timeout)
//! - Bind server to listener
//! - Run background maintenance (limiter sweep, revocation pruning)
//!
//! # Layer Order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → Timeout
//!     → RateLimiter → CORS → Dispatcher (bounded body read)
//! ```
//!
//! The body limit is enforced by the dispatcher rather than a tower layer so
//! an oversized request gets the same JSON error body as every other failure.

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::handlers::catalog_dispatcher;
use crate::observability::metrics;
use crate::routing::dispatch_handler;
use crate::security::cors::cors_middleware;
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::{AuthGate, CorsPolicy, RateLimiter};
use crate::store::{DocumentStore, RevocationStore};

/// HTTP server for the catalog API.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    limiter: RateLimiter,
    gate: Arc<AuthGate>,
}

impl HttpServer {
    /// Create a new HTTP server over the given stores.
    pub fn new(
        config: GatewayConfig,
        revocations: Arc<dyn RevocationStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let limiter = RateLimiter::new(&config.rate_limit);
        Self::with_limiter(config, limiter, revocations, documents)
    }

    /// Like [`HttpServer::new`] with a caller-built limiter (e.g. on a manual clock).
    pub fn with_limiter(
        config: GatewayConfig,
        limiter: RateLimiter,
        revocations: Arc<dyn RevocationStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let gate = Arc::new(AuthGate::new(&config.auth, revocations));
        let cors = Arc::new(CorsPolicy::new(&config.cors));
        let dispatcher = Arc::new(catalog_dispatcher(
            gate.clone(),
            documents,
            config.security.max_body_size,
        ));

        let router = Self::build_router(&config, dispatcher, limiter.clone(), cors);
        Self {
            router,
            config,
            limiter,
            gate,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &GatewayConfig,
        dispatcher: Arc<crate::routing::Dispatcher>,
        limiter: RateLimiter,
        cors: Arc<CorsPolicy>,
    ) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The gate this server authenticates with; mints tokens it will accept.
    pub fn auth_gate(&self) -> Arc<AuthGate> {
        self.gate.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_window_sweep(
            self.limiter.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            shutdown.resubscribe(),
        );
        spawn_revocation_prune(
            self.gate.clone(),
            Duration::from_secs(self.config.auth.revocation_prune_interval_secs),
            shutdown.resubscribe(),
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Periodically drop client windows that have fully elapsed.
fn spawn_window_sweep(
    limiter: RateLimiter,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiter.prune_expired();
                    metrics::record_client_windows(limiter.tracked_clients());
                    if removed > 0 {
                        tracing::debug!(removed, "Swept expired rate-limit windows");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Rate-limit sweep stopped");
    });
}

/// Periodically remove revocation entries whose tokens can no longer verify.
fn spawn_revocation_prune(
    gate: Arc<AuthGate>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => match gate.prune_revocations().await {
                    Ok(0) => {}
                    Ok(pruned) => tracing::info!(pruned, "Pruned revocation entries"),
                    Err(e) => tracing::warn!(error = %e, "Revocation pruning failed"),
                },
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Revocation pruning stopped");
    });
}
