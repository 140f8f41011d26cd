use axum::{
    http::{header, HeaderName, Method, Request},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SgqConfig;
use crate::handlers::{self, crud};
use crate::middleware::{ACCESS_LEVEL_HEADER, OPERATOR_ID_HEADER};
use crate::models::{Client, Employee, Product, Service};
use crate::services::InvoiceService;
use crate::store::{Datastore, Repositories};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SgqConfig>,
    pub datastore: Datastore,
    pub repos: Repositories,
    pub invoices: InvoiceService,
}

impl AppState {
    pub fn new(config: SgqConfig, datastore: Datastore) -> Self {
        let repos = datastore.repositories();
        let invoices = InvoiceService::new(
            repos.clone(),
            datastore.unit_of_work(),
            config.inventory.clone(),
            config.invoicing.clone(),
        );
        Self {
            config: Arc::new(config),
            datastore,
            repos,
            invoices,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/login", post(handlers::auth::login))
        .route(
            "/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            "/invoices/upcoming-pickups",
            get(handlers::invoices::upcoming_pickups),
        )
        .route("/invoices/form-data", get(handlers::invoices::form_data))
        .route(
            "/invoices/:id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route(
            "/invoices/:id/document",
            get(handlers::invoices::invoice_document),
        )
        .route("/products/low-stock", get(handlers::products::low_stock))
        .merge(resource_routes::<Client>("/clients"))
        .merge(resource_routes::<Product>("/products"))
        .merge(resource_routes::<Service>("/services"))
        .merge(resource_routes::<Employee>("/employees"))
        .route(
            "/company",
            get(handlers::company::get_company).put(handlers::company::update_company),
        )
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    HeaderName::from_static(OPERATOR_ID_HEADER),
                    HeaderName::from_static(ACCESS_LEVEL_HEADER),
                ])
                .expose_headers([HeaderName::from_static("x-request-id")]),
        )
}

fn resource_routes<E: crud::Resource>(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(crud::list::<E>).post(crud::create::<E>))
        .route(
            &format!("{}/:id", base),
            get(crud::get::<E>)
                .put(crud::update::<E>)
                .delete(crud::delete::<E>),
        )
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: SgqConfig) -> Result<Self, AppError> {
        let datastore = Datastore::connect(&config.database).await.map_err(|e| {
            tracing::error!("Failed to open datastore: {}", e);
            e
        })?;
        Self::build_with_datastore(config, datastore).await
    }

    /// Builds the server on an already opened datastore.
    pub async fn build_with_datastore(
        config: SgqConfig,
        datastore: Datastore,
    ) -> Result<Self, AppError> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Invalid listen address {}:{}: {}",
                    config.server.host,
                    config.server.port,
                    e
                ))
            })?;

        let state = AppState::new(config, datastore);
        let app = build_router(state.clone());

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "HTTP server listening");

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
