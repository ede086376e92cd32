use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Header carrying the identity of the caller performing a mutation.
/// Set by the authenticating proxy in front of this service.
pub const ACTOR_HEADER: &str = "x-actor";
pub const UNKNOWN_ACTOR: &str = "unknown";

/// Extractor for the acting identity recorded in audit entries
pub struct Actor(pub String);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_ACTOR);

        Ok(Actor(actor.to_string()))
    }
}
