//! Staff/public boundary for the HTTP surface

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use crate::server::AppState;
use crate::server::routes::ErrorResponse;

/// Reject staff requests that do not carry the configured bearer token.
/// With no token configured every request passes.
pub async fn require_staff(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.staff_token.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    if presented.is_some_and(|token| tokens_match(token.as_bytes(), expected.as_bytes())) {
        return next.run(request).await;
    }

    tracing::warn!("Rejected staff request to {}", request.uri().path());
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::message("staff authentication required")),
    )
        .into_response()
}

/// Compare without exiting at the first differing byte, so response timing
/// does not reveal how much of the token matched.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    let mut diff = presented.len() ^ expected.len();
    for i in 0..presented.len().max(expected.len()) {
        let a = presented.get(i).copied().unwrap_or(0);
        let b = expected.get(i).copied().unwrap_or(0);
        diff |= usize::from(a ^ b);
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match(b"staff-secret", b"staff-secret"));
        assert!(!tokens_match(b"staff-secreT", b"staff-secret"));
        assert!(!tokens_match(b"staff", b"staff-secret"));
        assert!(!tokens_match(b"staff-secret-extra", b"staff-secret"));
        assert!(!tokens_match(b"", b"staff-secret"));
        assert!(tokens_match(b"", b""));
    }
}
