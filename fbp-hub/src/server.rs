// OAuth proxy: a small HTTP service that keeps the Discord client secret off
// the browser. Every response carries permissive CORS headers.

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::auth::discord::{DiscordClient, DiscordError};

pub const SERVICE_NAME: &str = "FBP Hub Auth";

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced to the caller as `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    BadRequest(&'static str),
    Unauthorized(&'static str),
    NotFound,
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::NotFound => StatusCode::NOT_FOUND,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProxyError::BadRequest(m) | ProxyError::Unauthorized(m) => *m,
            ProxyError::NotFound => "Not found",
            ProxyError::Internal(m) => m.as_str(),
        }
    }

    /// Discord rejections become `rejected`; anything else is a 500.
    fn from_discord(err: DiscordError, rejected: ProxyError) -> Self {
        match err {
            DiscordError::Rejected { .. } => rejected,
            other => ProxyError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        if let ProxyError::Internal(ref m) = self {
            warn!("Proxy error: {}", m);
        }
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(discord: DiscordClient) -> Router {
    Router::new()
        .route("/token", post(token).fallback(not_found))
        .route("/user", get(user).fallback(not_found))
        .route("/refresh", post(refresh).fallback(not_found))
        .route("/health", any(health))
        .route("/", any(health))
        .fallback(not_found)
        .layer(middleware::from_fn(cors))
        .with_state(discord)
}

/// Bind `addr` and serve until the task is dropped.
pub async fn run(addr: &str, discord: DiscordClient) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, discord).await
}

pub async fn serve(listener: TcpListener, discord: DiscordClient) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    if !discord.is_configured() {
        warn!("Discord credentials missing; token routes will return 500");
    }
    info!("OAuth proxy listening on {local_addr}");
    axum::serve(listener, router(discord)).await?;
    Ok(())
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert("access-control-allow-methods", HeaderValue::from_static(ALLOW_METHODS));
    headers.insert("access-control-allow-headers", HeaderValue::from_static(ALLOW_HEADERS));
}

async fn cors(req: Request, next: Next) -> Response {
    debug!("{} {}", req.method(), req.uri().path());
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    apply_cors(resp.headers_mut());
    resp
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct TokenRequest {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    redirect_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ProxyError> {
    serde_json::from_slice(body).map_err(|e| ProxyError::Internal(e.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn token(State(discord): State<DiscordClient>, body: Bytes) -> Result<Response, ProxyError> {
    let req: TokenRequest = parse_body(&body)?;
    let code = non_empty(req.code).ok_or(ProxyError::BadRequest("Missing code parameter"))?;
    let tokens = discord
        .exchange_code(&code, req.redirect_uri.as_deref())
        .await
        .map_err(|e| ProxyError::from_discord(e, ProxyError::BadRequest("Failed to exchange code")))?;
    Ok(Json(tokens).into_response())
}

async fn user(State(discord): State<DiscordClient>, headers: HeaderMap) -> Result<Response, ProxyError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ProxyError::Unauthorized("Missing or invalid authorization header"))?;
    let user = discord
        .current_user(token)
        .await
        .map_err(|e| ProxyError::from_discord(e, ProxyError::Unauthorized("Failed to fetch user info")))?;
    Ok(Json(user).into_response())
}

async fn refresh(State(discord): State<DiscordClient>, body: Bytes) -> Result<Response, ProxyError> {
    let req: RefreshRequest = parse_body(&body)?;
    let refresh_token =
        non_empty(req.refresh_token).ok_or(ProxyError::BadRequest("Missing refresh_token parameter"))?;
    let tokens = discord
        .refresh(&refresh_token)
        .await
        .map_err(|e| ProxyError::from_discord(e, ProxyError::BadRequest("Failed to refresh token")))?;
    Ok(Json(tokens).into_response())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn not_found() -> ProxyError {
    ProxyError::NotFound
}
