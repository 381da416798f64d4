use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use shared_models::auth::PatientIdentity;

use crate::identity::IdentityResolver;

// Resolves the caller once per request. Unauthenticated requests still reach the handler so the
// service can answer with its own auth error.
pub async fn identity_middleware(
    State(resolver): State<Arc<dyn IdentityResolver>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match resolver.resolve(request.headers()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
        }
        Err(e) => {
            debug!("Request continues unauthenticated: {}", e);
        }
    }

    next.run(request).await
}

/// The identity attached by [`identity_middleware`], if any.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Option<PatientIdentity>);

impl CurrentIdentity {
    pub fn identity(&self) -> Option<&PatientIdentity> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentIdentity(parts.extensions.get::<PatientIdentity>().cloned()))
    }
}
