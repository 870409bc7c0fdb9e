use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine as _;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Role attached to an authenticated principal. Admin implies everything a
/// regular user may do, plus CSV import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

/// The verified identity for the current request, stored as an extension by
/// [`require_basic_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: Role,
}

#[derive(Clone)]
struct Principal {
    username: &'static str,
    password: String,
    role: Role,
}

/// HTTP Basic auth settings: two fixed principals, `admin` and `user`.
#[derive(Clone)]
pub struct AuthState {
    principals: Arc<Vec<Principal>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from the two password settings.
    ///
    /// In development, missing passwords disable auth for local iteration.
    /// In non-development envs, at least the admin password is required.
    pub fn from_config(
        is_development: bool,
        admin_password: Option<&str>,
        user_password: Option<&str>,
    ) -> anyhow::Result<Self> {
        let mut principals = Vec::new();
        if let Some(password) = admin_password {
            principals.push(Principal {
                username: "admin",
                password: password.to_string(),
                role: Role::Admin,
            });
        }
        if let Some(password) = user_password {
            principals.push(Principal {
                username: "user",
                password: password.to_string(),
                role: Role::User,
            });
        }

        if admin_password.is_none() {
            if is_development {
                tracing::warn!(
                    "TEDTALKS_ADMIN_PASSWORD not set; basic auth disabled in development environment"
                );
                return Ok(Self {
                    principals: Arc::new(Vec::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "TEDTALKS_ADMIN_PASSWORD is required outside development; \
                 set it (and optionally TEDTALKS_USER_PASSWORD) to enable basic auth"
            );
        }

        Ok(Self {
            principals: Arc::new(principals),
            enabled: true,
        })
    }

    fn verify(&self, username: &str, password: &str) -> Option<AuthenticatedUser> {
        self.principals.iter().find_map(|principal| {
            let name_matches = principal.username == username;
            // Constant-time comparison so response timing leaks nothing about
            // the password contents.
            let password_matches: bool = principal
                .password
                .as_bytes()
                .ct_eq(password.as_bytes())
                .into();
            (name_matches && password_matches).then(|| AuthenticatedUser {
                username: principal.username.to_string(),
                role: principal.role,
            })
        })
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing HTTP Basic auth when enabled.
///
/// On success the verified [`AuthenticatedUser`] is stored as a request
/// extension for handlers that need the role. When auth is disabled
/// (development only) every request runs as an anonymous admin.
pub async fn require_basic_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        req.extensions_mut().insert(AuthenticatedUser {
            username: "anonymous".to_string(),
            role: Role::Admin,
        });
        return next.run(req).await;
    }

    let user = decode_basic_credentials(req.headers().get(AUTHORIZATION))
        .and_then(|(username, password)| auth.verify(&username, &password));

    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            let mut res = (
                StatusCode::UNAUTHORIZED,
                Json(MiddlewareErrorBody {
                    error: MiddlewareError {
                        code: "unauthorized",
                        message: "missing or invalid credentials",
                    },
                }),
            )
                .into_response();
            res.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"tedtalks\""),
            );
            res
        }
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "rate limit exceeded",
                },
            }),
        )
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn decode_basic_credentials(value: Option<&HeaderValue>) -> Option<(String, String)> {
    let encoded = value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
