pub mod config;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::{Config, StoreBackend};
use services::{
    MemoryStore, MongoStore, OrderInitiator, PaymentVerifier, RazorpayClient, RegistrationStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RegistrationStore>,
    pub razorpay: RazorpayClient,
    pub orders: OrderInitiator,
    pub verifier: PaymentVerifier,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    store: Arc<dyn RegistrationStore>,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn RegistrationStore> = match config.store.backend {
            StoreBackend::Mongodb => Arc::new(
                MongoStore::connect(config.store.url.expose_secret(), &config.store.db_name)
                    .await?,
            ),
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        let razorpay = RazorpayClient::new(config.razorpay.clone());
        if razorpay.is_configured() {
            tracing::info!("Razorpay client initialized");
        } else {
            tracing::warn!("Razorpay credentials not configured - paid registrations will fail");
        }

        let orders = OrderInitiator::new(razorpay.clone(), store.clone());
        let verifier = PaymentVerifier::new(razorpay.clone(), store.clone());

        let state = AppState {
            config: config.clone(),
            store: store.clone(),
            razorpay,
            orders,
            verifier,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            // Paid registration flow
            .route("/orders", post(handlers::orders::create_order))
            .route("/payments/verify", post(handlers::payments::verify_payment))
            // Free registrations and the caller's bookings list
            .route(
                "/registrations",
                post(handlers::registrations::register_free)
                    .get(handlers::registrations::list_my_registrations),
            )
            // Walk-up bookings and the check-in console
            .route("/bookings", post(handlers::bookings::create_booking))
            .route("/bookings/:code", get(handlers::bookings::lookup_booking))
            .route(
                "/check-ins/:id",
                post(handlers::bookings::check_in).delete(handlers::bookings::undo_check_in),
            )
            .layer(CorsLayer::permissive())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
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
                        user_id = tracing::field::Empty,
                    )
                }),
            )
            .with_state(state);

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
            store,
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Handle on the store, for test harnesses.
    pub fn store(&self) -> Arc<dyn RegistrationStore> {
        self.store.clone()
    }
}
