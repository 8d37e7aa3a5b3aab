pub mod health;
pub mod rooms;
pub mod uploads;

use axum::extract::FromRequestParts;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::Router;

use crate::join::RequestOrigin;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .merge(health::health_routes())
        .with_state(state)
}

/// API v1 routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/rooms", rooms::room_routes())
        .nest("/uploads", uploads::upload_routes())
}

impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http")
            .to_string();

        if let Some(host) = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|h| !h.is_empty())
        {
            return Ok(RequestOrigin {
                scheme,
                host: host.to_string(),
            });
        }

        // No Host header: fall back to the configured public base URL.
        let origin = match reqwest::Url::parse(&state.config.base_url) {
            Ok(url) => {
                let host = match (url.host_str(), url.port()) {
                    (Some(h), Some(p)) => format!("{}:{}", h, p),
                    (Some(h), None) => h.to_string(),
                    (None, _) => "localhost".to_string(),
                };
                RequestOrigin {
                    scheme: url.scheme().to_string(),
                    host,
                }
            }
            Err(_) => RequestOrigin {
                scheme,
                host: "localhost".to_string(),
            },
        };

        Ok(origin)
    }
}
