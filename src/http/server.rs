//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, access guard, timeouts)
//! - Hold the shared origin client and the swappable configuration snapshot
//! - Apply configuration updates atomically while serving
//! - Bind server to listener and shut down on signal, cutting off streams
//!   that outlive the grace period

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::http::middleware::access_control::{guard_companion, guard_stream};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::{link, relay};
use crate::origin::{OriginClient, OriginTarget};
use crate::security::{Clock, SystemClock, TokenCodec};

/// Everything a request reads from configuration, resolved once per reload.
#[derive(Debug)]
pub struct Settings {
    pub config: RelayConfig,
    pub codec: TokenCodec,
    pub origin: OriginTarget,
}

impl Settings {
    pub fn from_config(config: RelayConfig) -> Self {
        Self {
            codec: TokenCodec::new(config.signing.secret.as_bytes()),
            origin: OriginTarget::from_config(&config.origin),
            config,
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ArcSwap<Settings>>,
    pub origin: OriginClient,
    pub clock: Arc<dyn Clock>,
    /// Cancelled when open streams must end.
    pub streams: CancellationToken,
}

impl AppState {
    pub fn new(config: RelayConfig, clock: Arc<dyn Clock>) -> Self {
        let origin = OriginClient::new(Duration::from_secs(config.timeouts.connect_secs));
        Self {
            settings: Arc::new(ArcSwap::from_pointee(Settings::from_config(config))),
            origin,
            clock,
            streams: CancellationToken::new(),
        }
    }

    /// Read-only view of the configuration.
    ///
    /// Request handling takes this once, in the route's guard layer, and reads
    /// it back as an `Extension<Arc<Settings>>`.
    pub fn snapshot(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    /// Replace the configuration wholesale.
    pub fn apply(&self, config: RelayConfig) {
        self.settings.store(Arc::new(Settings::from_config(config)));
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

async fn health() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a server whose token checks use `clock`.
    pub fn with_clock(config: RelayConfig, clock: Arc<dyn Clock>) -> Self {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = AppState::new(config, clock);
        let router = Self::build_router(request_timeout, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Only the companion routes get a request timeout; streams may run for hours.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        let companion = Router::new()
            .route("/link/{resource_id}", get(link::signed_link))
            .route_layer(middleware::from_fn_with_state(state.clone(), guard_companion))
            .layer(TimeoutLayer::new(request_timeout));

        let stream = Router::new()
            .route(
                "/proxy/{resource_id}/{expiry}/{signature}/stream.mp4",
                get(relay::proxy_stream),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), guard_stream));

        Router::new()
            .route("/health", get(health))
            .merge(companion)
            .merge(stream)
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Shared state, e.g. for applying configuration out of band.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration updates received on `config_updates` replace the active
    /// snapshot; requests already in flight keep the one they started with.
    /// After shutdown is signalled, streams still open once
    /// `timeouts.shutdown_grace_secs` has passed are ended.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.apply(config);
                tracing::info!("Configuration reloaded");
            }
        });

        let mut drain_started = shutdown.resubscribe();

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => return finish(result),
            _ = drain_started.recv() => {}
        }

        let grace = Duration::from_secs(self.state.snapshot().config.timeouts.shutdown_grace_secs);

        // Draining: new connections are refused, open streams get `grace`.
        tokio::select! {
            result = &mut server => return finish(result),
            _ = tokio::time::sleep(grace) => {}
        }

        tracing::warn!(grace_secs = grace.as_secs(), "Grace period over, ending open streams");
        self.state.streams.cancel();

        match tokio::time::timeout(grace.max(Duration::from_secs(1)), &mut server).await {
            Ok(result) => finish(result),
            Err(_) => {
                tracing::warn!("Connections still open after streams ended, abandoning them");
                Ok(())
            }
        }
    }
}

fn finish(result: Result<(), std::io::Error>) -> Result<(), std::io::Error> {
    result?;
    tracing::info!("HTTP server stopped");
    Ok(())
}
