//! Admin JWT authentication for the management API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

/// JWT claims for storefront users
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub role: Role,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated admin extracted from JWT
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub user_id: i64,
    pub role: Role,
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a JWT token for a user (tooling and tests; login lives elsewhere)
pub fn create_token(
    user_id: i64,
    role: Role,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a bearer token and require the admin role
pub fn authenticate(auth_header: Option<&str>, secret: &str) -> Result<AdminIdentity, AppError> {
    let token = auth_header
        .ok_or_else(AppError::not_authenticated)?
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))?;

    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    let user_id = token_data
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::invalid_token("Invalid subject"))?;

    if token_data.claims.role != Role::Admin {
        tracing::warn!(user_id, "Non-admin user denied access to admin API");
        return Err(AppError::new(ErrorCode::PermissionDenied));
    }

    Ok(AdminIdentity {
        user_id,
        role: token_data.claims.role,
    })
}

/// Middleware that extracts and verifies the admin JWT from the Authorization header
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let identity = authenticate(header, &state.jwt_secret)?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn admin_token_is_accepted() {
        let token = create_token(42, Role::Admin, SECRET).unwrap();
        let identity = authenticate(Some(&bearer(&token)), SECRET).unwrap();
        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn missing_header_is_unauthenticated() {
        let err = authenticate(None, SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
        assert_eq!(err.http_status(), http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token(42, Role::Admin, "other").unwrap();
        let err = authenticate(Some(&bearer(&token)), SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn customers_are_forbidden() {
        let token = create_token(7, Role::Customer, SECRET).unwrap();
        let err = authenticate(Some(&bearer(&token)), SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.http_status(), http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let err = authenticate(Some("Basic abc"), SECRET).unwrap_err();
        assert_eq!(err.http_status(), http::StatusCode::UNAUTHORIZED);
    }
}
