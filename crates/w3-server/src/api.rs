use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::Method,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use w3_shared::{AdminAuthority, UserId};
use w3_sync::{DocPath, DocumentStore, MemoryDocumentStore};

use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub docs: MemoryDocumentStore,
    /// `None` when admin login is disabled.
    pub authority: Option<Arc<AdminAuthority>>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/db/{*path}",
            get(db_get).put(db_set).post(db_push).delete(db_remove),
        )
        .route("/subscribe/{*path}", get(subscribe))
        .route("/admin/login", post(admin_login))
        .route("/admin/pubkey", get(admin_pubkey))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct PushResponse {
    key: String,
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminLoginRequest {
    user_id: UserId,
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminLoginResponse {
    credential: String,
    expires_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PubkeyResponse {
    public_key: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Document tree ───

async fn db_get(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let path = DocPath::parse(&path)?;
    let value = state.docs.get(&path).await?;
    Ok(Json(value.unwrap_or(Value::Null)))
}

async fn db_set(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<Value>, ServerError> {
    let path = DocPath::parse(&path)?;
    state.docs.set(&path, value).await?;
    debug!(path = %path, "document set");
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn db_push(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<PushResponse>, ServerError> {
    let path = DocPath::parse(&path)?;
    let key = state.docs.push(&path, value).await?;
    debug!(path = %path, key = %key, "document pushed");
    Ok(Json(PushResponse { key }))
}

async fn db_remove(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<DeleteResponse>, ServerError> {
    let path = DocPath::parse(&path)?;
    let deleted = state.docs.remove(&path).await?;
    if deleted {
        info!(path = %path, "document removed");
    }
    Ok(Json(DeleteResponse { deleted }))
}

/// Server-sent events: one JSON `DocEvent` per message, starting with a
/// snapshot. The listener is detached when the client goes away.
async fn subscribe(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let path = DocPath::parse(&path)?;
    let subscription = state.docs.subscribe(&path).await?;
    debug!(path = %path, "event stream opened");

    let events = stream::unfold(subscription, |mut subscription| async move {
        loop {
            let event = subscription.next().await?;
            match Event::default().json_data(&event) {
                Ok(sse) => return Some((Ok(sse), subscription)),
                Err(e) => warn!(error = %e, "could not encode document event"),
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// ─── Admin authority ───

async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, ServerError> {
    let Some(authority) = &state.authority else {
        return Err(ServerError::Forbidden(
            "Admin login is disabled (no ADMIN_PASSWORD_HASH configured)".into(),
        ));
    };
    if req.user_id.as_str().trim().is_empty() {
        return Err(ServerError::BadRequest("userId is required".into()));
    }

    let credential = match authority.login(&req.user_id, &req.username, &req.password) {
        Ok(credential) => credential,
        Err(e) => {
            warn!(user_id = %req.user_id, error = %e, "admin login rejected");
            return Err(e.into());
        }
    };

    info!(user_id = %req.user_id, "admin credential issued");
    Ok(Json(AdminLoginResponse {
        credential: credential.encode()?,
        expires_at: credential.payload.expires_at.to_rfc3339(),
    }))
}

async fn admin_pubkey(State(state): State<AppState>) -> Result<Json<PubkeyResponse>, ServerError> {
    let authority = state
        .authority
        .as_ref()
        .ok_or_else(|| ServerError::NotFound("admin login is disabled".into()))?;
    Ok(Json(PubkeyResponse {
        public_key: hex::encode(authority.public_key()),
    }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
