//! Finishes error responses once the caller is known.
//!
//! Counts every error in the metrics, turns bare 405s into JSON errors and,
//! for callers holding `ServerAdmin`, puts `detail` back into the body and
//! adds the request path and method.

use super::super::api_error::{ApiError, ErrorBody, ErrorDebug};
use super::super::session::{extract_session_token, resolve_session};
use super::super::state::ServerState;
use crate::server::metrics::record_error;
use crate::user::Permission;
use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_LENGTH, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

pub async fn error_details(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_session_token(request.headers());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    if response.status() == StatusCode::METHOD_NOT_ALLOWED
        && response.extensions().get::<ErrorBody>().is_none()
    {
        response = ApiError::MethodNotAllowed(method.clone()).into_response();
    }

    let Some(body) = response.extensions().get::<ErrorBody>().cloned() else {
        return response;
    };
    record_error(body.error, &path);

    let privileged = token
        .and_then(|token| resolve_session(&state.user_manager, token))
        .is_some_and(|session| session.has_permission(Permission::ServerAdmin));
    if !privileged {
        return response;
    }

    let body = ErrorBody {
        debug: Some(ErrorDebug { path, method }),
        ..body
    };
    let json = match serde_json::to_vec(&body) {
        Ok(json) => json,
        Err(err) => {
            error!("Failed to serialize error details: {}", err);
            return response;
        }
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(json))
}
