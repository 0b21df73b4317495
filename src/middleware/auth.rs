//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the token from the Authorization header
//! 2. Hash it and look it up among active access tokens
//! 3. Inject the caller's principal into the request
//! 4. Reject unknown tokens with HTTP 401
//!
//! Tokens are issued elsewhere; this service only resolves them.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::access_token::{AccessToken, Principal},
};

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>` and ask for the
/// principal they need.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token_id: Uuid,
    pub principal: Principal,
}

impl AuthContext {
    /// The caller's account, or `Forbidden` for admin tokens.
    pub fn account_id(&self) -> Result<Uuid, AppError> {
        match self.principal {
            Principal::Account(id) => Ok(id),
            Principal::Admin(_) => Err(AppError::Forbidden),
        }
    }

    /// The calling admin, or `Forbidden` for account tokens.
    pub fn admin_id(&self) -> Result<Uuid, AppError> {
        match self.principal {
            Principal::Admin(id) => Ok(id),
            Principal::Account(_) => Err(AppError::Forbidden),
        }
    }
}

/// Hex SHA-256 of a bearer token, as stored in `access_tokens.token_hash`.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Hash the `<token>` using SHA-256
/// 3. Query database for matching hash where `is_active = true`
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let token_hash = hash_token(token);

    let record = sqlx::query_as::<_, AccessToken>(
        "SELECT * FROM access_tokens WHERE token_hash = $1 AND is_active = true",
    )
    .bind(&token_hash)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let principal = record.principal().ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthContext {
        token_id: record.id,
        principal,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_hex_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn principals_are_not_interchangeable() {
        let id = Uuid::new_v4();
        let user = AuthContext {
            token_id: Uuid::new_v4(),
            principal: Principal::Account(id),
        };
        assert_eq!(user.account_id().unwrap(), id);
        assert!(matches!(user.admin_id(), Err(AppError::Forbidden)));

        let admin = AuthContext {
            token_id: Uuid::new_v4(),
            principal: Principal::Admin(id),
        };
        assert!(matches!(admin.account_id(), Err(AppError::Forbidden)));
    }
}
