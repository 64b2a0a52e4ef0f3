//! HTTP handlers for notify-relay.
//!
//! Each handler maps one route onto one relay operation; the relay core owns
//! all channel and message semantics.

use crate::config::{Config, StorageBackend};
use crate::error::ApiError;
use crate::live;
use crate::metrics;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::StringRejection, DefaultBodyLimit, MatchedPath, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use notify_relay_core::{RedbStore, Relay};
use relay_protocol::{ChannelView, EndpointInfo, Meta, Subscription};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Shared server state.
pub struct AppState {
    /// The relay core.
    pub relay: Relay,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create app state with the storage backend named in the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be opened.
    pub fn new(config: Config) -> Result<Self> {
        let relay_config = config.relay_config();
        let relay = match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage; data is lost on restart");
                Relay::in_memory(relay_config)
            }
            StorageBackend::Redb => {
                let path = shellexpand::tilde(&config.storage.path).into_owned();
                let store = RedbStore::open(&path)
                    .with_context(|| format!("Failed to open redb store at {}", path))?;
                info!("Using redb storage at {}", path);
                Relay::with_store(Arc::new(store), relay_config)
            }
        };

        Ok(Self::with_relay(config, relay))
    }

    /// Create app state around an existing relay.
    #[must_use]
    pub fn with_relay(config: Config, relay: Relay) -> Self {
        Self { relay, config }
    }

    fn endpoint_info(&self, channel_id: String) -> EndpointInfo {
        EndpointInfo {
            endpoint: self.config.public.endpoint(&channel_id),
            channel_page: self.config.public.channel_page(&channel_id),
            channel_id,
        }
    }
}

/// Run the HTTP server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone())?);

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let app = router(state);

    // Bind and serve
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("notify-relay listening on {}", addr);
    info!("Public endpoint base: {}", config.public.api_url);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route("/register_channel", post(register_handler))
        .route(
            "/:channel_id",
            get(channel_handler)
                .post(message_handler)
                .layer(DefaultBodyLimit::max(state.config.limits.max_message_size)),
        )
        .route("/:channel_id/info", get(info_handler))
        .route("/:channel_id/subscribe", post(subscribe_handler));

    if state.config.live.enabled {
        app = app.route("/:channel_id/live", get(live::live_handler));
    }

    app.layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Record route, status and latency of every request.
async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    let response = next.run(request).await;
    metrics::record_request(
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create a channel. The optional JSON object body becomes its metadata.
async fn register_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<EndpointInfo>, ApiError> {
    let meta = parse_meta(&body)?;
    let channel_id = state.relay.register_channel(meta).await?;
    metrics::record_registration();

    Ok(Json(state.endpoint_info(channel_id)))
}

fn parse_meta(body: &[u8]) -> Result<Meta, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Meta::new());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Channel metadata must be a JSON object: {}", e)))
}

/// Channel view: messages newest first, subscriber ids and push key.
async fn channel_handler(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelView>, ApiError> {
    let record = state.relay.get_channel(&channel_id).await?;
    let messages = state.relay.get_messages(&channel_id).await?;

    Ok(Json(ChannelView {
        subscriptions: record.subscriber_ids(),
        channel_id: record.channel_id,
        created: record.created,
        messages,
        pub_key: state.config.web_push.vapid_public_key.clone(),
    }))
}

/// Post a message. The raw body is the message text.
async fn message_handler(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    message: Result<String, StringRejection>,
) -> Result<Json<Value>, ApiError> {
    let message = match message {
        Ok(message) => message,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ApiError::PayloadTooLarge {
                limit: state.config.limits.max_message_size,
            });
        }
        Err(rejection) => return Err(ApiError::BadRequest(rejection.body_text())),
    };

    let bytes = message.len();
    state.relay.put_message(&channel_id, message).await?;
    metrics::record_message(bytes);
    debug!(channel = %channel_id, bytes, "Message accepted");

    Ok(Json(json!({})))
}

/// Endpoint links for an existing channel.
async fn info_handler(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<Json<EndpointInfo>, ApiError> {
    let record = state.relay.get_channel(&channel_id).await?;
    Ok(Json(state.endpoint_info(record.channel_id)))
}

/// Register or replace a push subscription.
async fn subscribe_handler(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    Json(subscription): Json<Subscription>,
) -> Result<Json<Value>, ApiError> {
    state
        .relay
        .add_subscription(&channel_id, subscription)
        .await?;
    metrics::record_subscription();

    Ok(Json(json!({})))
}
