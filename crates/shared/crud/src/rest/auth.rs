//! Authentication middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{ACCEPT_LANGUAGE, AUTHORIZATION},
        Request,
    },
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use common::{AppError, AppResult, JwtConfig};
use domain::{RoleHierarchy, UserPrincipal, BEARER_TOKEN_PREFIX};

use crate::security::{self, RequestContext};

/// Verifies bearer tokens issued by the authentication server.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
    hierarchy: Option<Arc<RoleHierarchy>>,
}

impl JwtAuthenticator {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation: Validation::default(),
            hierarchy: config
                .role_hierarchy
                .as_deref()
                .map(|rules| Arc::new(RoleHierarchy::parse(rules))),
        }
    }

    /// Decode and verify a token into its principal.
    pub fn verify(&self, token: &str) -> AppResult<UserPrincipal> {
        let data = decode::<UserPrincipal>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }

    fn context(&self, request: &Request<Body>) -> AppResult<RequestContext> {
        let mut context = match extract_token(request)? {
            Some(token) => {
                let principal = self.verify(token)?;
                tracing::debug!(user = %principal.username, "Authenticated request");
                RequestContext::for_user(principal)
            }
            None => RequestContext::anonymous(),
        };

        if let Some(language) = preferred_language(request) {
            context = context.with_language(language);
        }
        Ok(context.with_hierarchy(self.hierarchy.clone()))
    }
}

/// Run the request inside a security context.
///
/// Requests without a token run anonymously; a malformed or invalid token is
/// rejected.
pub async fn authenticate(
    State(authenticator): State<Arc<JwtAuthenticator>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let context = authenticator.context(&request)?;
    if let Some(principal) = &context.principal {
        request.extensions_mut().insert(principal.clone());
    }

    Ok(security::scope(context, next.run(request)).await)
}

/// Bearer token from the Authorization header, if any.
fn extract_token(request: &Request<Body>) -> AppResult<Option<&str>> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header.to_str().map_err(|_| AppError::Unauthorized)?;

    header
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .map(|token| Some(token.trim()))
        .ok_or(AppError::Unauthorized)
}

/// First tag of Accept-Language, without region weights.
fn preferred_language(request: &Request<Body>) -> Option<String> {
    let header = request.headers().get(ACCEPT_LANGUAGE)?.to_str().ok()?;
    header
        .split(',')
        .next()
        .and_then(|tag| tag.split(';').next())
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .map(str::to_string)
}
