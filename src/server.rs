pub mod handlers;
pub mod responses;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use color_eyre::eyre::{Context, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::domain::ports::PayloadOpener;
use crate::inbound::FunnelCrypto;
use crate::infrastructure::registry::{DispatchTable, FunnelRegistry};
use crate::outbound::dispatch::Dispatcher;
use crate::server::handlers::funnel::relay;
use crate::server::handlers::status::health_check;

/// Largest delivery body the relay reads
pub const MAX_DELIVERY_SIZE: usize = 2 * 1024 * 1024;

#[derive(Clone)]
/// State shared by all request handlers. Everything in it is read-only
/// once the server is built.
pub struct RelayState {
    registry: Arc<FunnelRegistry>,
    dispatch_table: Arc<DispatchTable>,
    dispatcher: Dispatcher,
    opener: Arc<dyn PayloadOpener>,
}

impl RelayState {
    /// Build state from a registry, deriving its dispatch table
    pub fn new(registry: FunnelRegistry, dispatcher: Dispatcher) -> Self {
        let dispatch_table = registry.dispatch_table();
        Self {
            registry: Arc::new(registry),
            dispatch_table: Arc::new(dispatch_table),
            dispatcher,
            opener: Arc::new(FunnelCrypto),
        }
    }

    /// Replace the crypto used to verify and open deliveries
    pub fn with_opener(mut self, opener: Arc<dyn PayloadOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Replace the derived dispatch table
    pub fn with_dispatch_table(mut self, dispatch_table: DispatchTable) -> Self {
        self.dispatch_table = Arc::new(dispatch_table);
        self
    }

    pub fn registry(&self) -> &FunnelRegistry {
        &self.registry
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch_table
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn opener(&self) -> &dyn PayloadOpener {
        self.opener.as_ref()
    }
}

pub fn router(state: RelayState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &'_ axum::extract::Request<_>| {
            // Path only: the query carries the endpoint id
            let path = request.uri().path().to_string();
            tracing::info_span!("request", method = %request.method(), path)
        });

    Router::new()
        .route("/funnel", post(relay))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_DELIVERY_SIZE))
        .layer(trace_layer)
        .with_state(state)
}

pub struct Server {
    router: Router,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the relay listener.
    pub async fn new(host: &str, port: u16, state: RelayState) -> Result<Self> {
        let listener = TcpListener::bind(format!("{host}:{port}"))
            .await
            .wrap_err_with(|| format!("Failed to bind to port {port}"))?;
        let local_addr = listener
            .local_addr()
            .wrap_err("Failed to read listener address")?;

        Ok(Self {
            router: router(state),
            listener,
            local_addr,
        })
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Runs the relay until the process exits.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Relay listening on {}", self.local_addr);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
