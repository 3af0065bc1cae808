//! Purpose: Provide the HTTP sender boundary in front of the parsing core.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based endpoint that decodes send requests, runs the parser,
//! annotates request metadata, and hands envelopes to delivery (out of scope
//! here; this build logs the audit projection instead).
//! Invariants: TypeMismatch maps to HTTP 400; the envelope is annotated with
//! `ipAddress`/`clientIdentifier` before anything else can observe it.
//! Invariants: Loopback-only unless explicitly allowed.

use axum::Router;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pushgate::api::{Error, ErrorKind, MessageEnvelope};

/// Header the sender clients use to identify themselves.
const CLIENT_HEADER: &str = "aerogear-sender";

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub token: Option<String>,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
}

#[derive(Clone)]
struct AppState {
    token: Option<String>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let state = Arc::new(AppState {
        token: config.token,
    });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/rest/sender", post(submit_message))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("server failed")
            .with_source(err)
    })
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 1048576."));
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

fn authorize(headers: &HeaderMap, state: &AppState) -> Result<(), Error> {
    let Some(token) = state.token.as_ref() else {
        return Ok(());
    };
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Err(Error::new(ErrorKind::Permission).with_message("missing bearer token"));
    };
    let value = value.to_str().unwrap_or_default();
    let expected = format!("Bearer {token}");
    if value != expected {
        return Err(Error::new(ErrorKind::Permission).with_message("invalid bearer token"));
    }
    Ok(())
}

async fn healthz() -> Response {
    json_response(json!({ "ok": true }))
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

async fn submit_message(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(err) = authorize(&headers, &state) {
        return error_response(err);
    }

    let Some(document) = body.as_object() else {
        return error_response(
            Error::new(ErrorKind::TypeMismatch)
                .with_message("request body must be a JSON object"),
        );
    };

    let mut envelope = match MessageEnvelope::from_document(document) {
        Ok(envelope) => envelope,
        Err(err) => return error_response(err),
    };
    envelope.set_ip_address(peer.ip().to_string());
    if let Some(sender) = client_identifier(&headers) {
        envelope.set_client_identifier(sender);
    }

    tracing::info!("send request accepted: {}", envelope.to_audit_json());

    let received = match now_rfc3339() {
        Ok(received) => received,
        Err(err) => return error_response(err),
    };
    let mut response = json_response(json!({ "job": { "received": received } }));
    *response.status_mut() = StatusCode::ACCEPTED;
    response
}

fn client_identifier(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(CLIENT_HEADER)?;
    match value.to_str() {
        Ok(sender) => Some(sender),
        Err(_) => {
            // leaves clientIdentifier unset; explain the gap in the logs
            tracing::debug!("ignoring {CLIENT_HEADER} header with non-UTF-8 value");
            None
        }
    }
}

fn now_rfc3339() -> Result<String, Error> {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("timestamp format failed")
            .with_source(err)
    })
}

fn json_response(payload: Value) -> Response {
    Json(payload).into_response()
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::TypeMismatch | ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::Permission => StatusCode::UNAUTHORIZED,
        ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            field: err.field().map(str::to_string),
            hint: err.hint().map(str::to_string),
        },
    };
    (status, Json(body)).into_response()
}
