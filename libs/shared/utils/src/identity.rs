use async_trait::async_trait;
use axum::http::HeaderMap;
use headers::{authorization::Bearer, Authorization, HeaderMapExt};

use shared_config::AppConfig;
use shared_models::auth::PatientIdentity;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Maps an inbound request to the patient it acts for.
///
/// Implementations never hold session state; every call resolves from the request alone.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<PatientIdentity, AppError>;
}

/// Resolves `Authorization: Bearer <jwt>` against the shared HS256 secret.
pub struct JwtIdentityResolver {
    jwt_secret: String,
}

impl JwtIdentityResolver {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret.clone())
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<PatientIdentity, AppError> {
        let auth = headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or_else(|| AppError::Auth("Missing or malformed authorization header".to_string()))?;

        validate_token(auth.token(), &self.jwt_secret).map_err(AppError::Auth)
    }
}
