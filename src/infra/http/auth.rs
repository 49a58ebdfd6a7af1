//! Identity extraction from the upstream authentication proxy.
//!
//! Authentication happens in front of this service; the proxy forwards
//! the verified identity in headers. A request without a subject header
//! never reaches a handler.

use axum::body::Body;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::ApiError;

pub const SUBJECT_HEADER: &str = "x-auth-subject";
pub const NAME_HEADER: &str = "x-auth-name";
pub const EMAIL_HEADER: &str = "x-auth-email";

/// Verified identity of the caller, as asserted by the proxy.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Identity provider's stable subject; primary key for profiles.
    pub user_id: String,
    pub display_name: String,
    pub email: String,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reject unauthenticated requests and expose [`CurrentUser`] to
/// handlers via request extensions.
pub async fn require_identity(mut request: Request<Body>, next: Next) -> Response {
    let Some(user_id) = header_value(request.headers(), SUBJECT_HEADER) else {
        return ApiError::unauthorized().into_response();
    };

    let display_name =
        header_value(request.headers(), NAME_HEADER).unwrap_or_else(|| user_id.clone());
    let email = header_value(request.headers(), EMAIL_HEADER).unwrap_or_default();

    request.extensions_mut().insert(CurrentUser {
        user_id,
        display_name,
        email,
    });

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn blank_headers_count_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(SUBJECT_HEADER, HeaderValue::from_static("  "));
        assert_eq!(header_value(&headers, SUBJECT_HEADER), None);
    }

    #[test]
    fn header_values_are_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(NAME_HEADER, HeaderValue::from_static(" Ada Lovelace "));
        assert_eq!(
            header_value(&headers, NAME_HEADER).as_deref(),
            Some("Ada Lovelace")
        );
    }
}
