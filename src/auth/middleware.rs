use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::helpers::{extract_bearer, validate_token};
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::ActorClaims;

/// Extractor that requires a valid bearer token and yields the caller's
/// claims, rebuilt from the current user row.
pub struct RequireActor {
    pub claims: ActorClaims,
    pub token_id: String,
}

impl FromRequestParts<Arc<AppState>> for RequireActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let raw_token = extract_bearer(auth_header)?;
        let (token, user) = validate_token(state.store.as_ref(), raw_token)?;

        Ok(RequireActor {
            claims: ActorClaims::from(&user),
            token_id: token.id,
        })
    }
}
