use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::{HeaderMap, Request, header::AUTHORIZATION, request::Parts};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::application::auth::{bearer_token, token_matches};

use super::error::ApiError;
use super::state::ApiState;

/// Gate for the cache administration routes.
pub async fn require_admin(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = extract_token(request.headers())
        .is_some_and(|token| token_matches(token, &state.admin_token));
    if !authorized {
        warn!(
            target = "headway::api::admin",
            path = %request.uri().path(),
            "rejected cache administration request"
        );
        return ApiError::unauthorized().into_response();
    }

    next.run(request).await
}

/// Proof that the request was approved by the [`MutationAuthorizer`].
///
/// [`MutationAuthorizer`]: crate::application::auth::MutationAuthorizer
#[derive(Debug, Clone, Copy)]
pub struct MutationGrant;

impl FromRequestParts<ApiState> for MutationGrant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        if state.authorizer.authorize(extract_token(&parts.headers)) {
            Ok(MutationGrant)
        } else {
            Err(ApiError::unauthorized())
        }
    }
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    bearer_token(raw)
}
