// src/auth.rs
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_log;
use crate::core::config_manager::AuthSettings;
use crate::core::database::{Database, User, UserRepository};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub staff: bool,
    pub iat: usize,
    pub exp: usize,
}

/// The acting user behind a request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.jwt_secret.clone(), settings.token_ttl_hours)
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue_token(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id.to_string(),
            username: principal.username.clone(),
            staff: principal.is_staff,
            iat: now.timestamp().max(0) as usize,
            exp: (now + self.ttl).timestamp().max(0) as usize,
        };
        self.encode_claims(&claims)
    }

    pub fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            app_log!(error, "Failed to sign token: {}", e);
            AuthError::TokenVerificationFailed
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            app_log!(warn, "Token verification failed: {}", e);
            AuthError::TokenVerificationFailed
        })?;

        Ok(data.claims)
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("Authorization token required")]
    MissingToken,
    #[error("Invalid authorization token format")]
    InvalidToken,
    #[error("Token verification failed")]
    TokenVerificationFailed,
    #[error("User does not exist or is inactive")]
    UnknownUser,
    #[error("Staff access required")]
    NotAuthorized,
    #[error("Database error occurred")]
    DatabaseError,
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::NotAuthorized => Status::Forbidden,
            AuthError::DatabaseError => Status::InternalServerError,
            _ => Status::Unauthorized,
        }
    }
}

/// Per-request memo of the authentication outcome
struct AuthResolution(Result<Principal, AuthError>);

async fn authenticate(req: &Request<'_>) -> Result<Principal, AuthError> {
    let token = match req.headers().get_one("Authorization") {
        Some(header) => header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidToken)?,
        None => return Err(AuthError::MissingToken),
    };

    let auth_config = req
        .guard::<&State<AuthConfig>>()
        .await
        .succeeded()
        .ok_or(AuthError::DatabaseError)?;
    let database = req
        .guard::<&State<Database>>()
        .await
        .succeeded()
        .ok_or(AuthError::DatabaseError)?;

    let claims = auth_config.verify_token(token)?;
    let user_id: i64 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

    let user = UserRepository::new(database.pool())
        .find_by_id(user_id)
        .await
        .map_err(|e| {
            app_log!(error, "User lookup failed: {}", e);
            AuthError::DatabaseError
        })?;

    match user {
        Some(user) if user.is_active => Ok(Principal::from(&user)),
        _ => {
            app_log!(warn, "Token presented for unknown or inactive user {}", user_id);
            Err(AuthError::UnknownUser)
        }
    }
}

/// Resolve the request's principal once; later guards reuse the result.
pub async fn resolve_principal(req: &Request<'_>) -> Result<Principal, AuthError> {
    req.local_cache_async(async { AuthResolution(authenticate(req).await) })
        .await
        .0
        .clone()
}

/// Valid bearer token for an existing, active user
pub struct AuthenticatedUser(pub Principal);

impl AuthenticatedUser {
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_principal(req).await {
            Ok(principal) => Outcome::Success(AuthenticatedUser(principal)),
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}

/// Authenticated user with the staff flag
pub struct StaffUser(pub Principal);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StaffUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_principal(req).await {
            Ok(principal) if principal.is_staff => Outcome::Success(StaffUser(principal)),
            Ok(principal) => {
                app_log!(warn, "User {} denied staff access", principal.username);
                let e = AuthError::NotAuthorized;
                Outcome::Error((e.status(), e))
            }
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}

// Optional auth guard that doesn't fail if no auth is provided
pub struct OptionalAuth {
    pub user: Option<Principal>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(OptionalAuth {
            user: resolve_principal(req).await.ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal {
            id: 42,
            username: "alice".to_string(),
            is_staff: true,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let config = AuthConfig::new("test-secret", 24);
        let token = config.issue_token(&principal()).unwrap();

        let claims = config.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "alice");
        assert!(claims.staff);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let token = AuthConfig::new("one", 24).issue_token(&principal()).unwrap();
        assert_eq!(
            AuthConfig::new("two", 24).verify_token(&token),
            Err(AuthError::TokenVerificationFailed)
        );
    }

    #[test]
    fn test_rejects_tampered_token() {
        let config = AuthConfig::new("test-secret", 24);
        let token = config.issue_token(&principal()).unwrap();
        let forged = config
            .issue_token(&Principal {
                username: "mallory".to_string(),
                ..principal()
            })
            .unwrap();

        let original: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let tampered = format!("{}.{}.{}", original[0], forged_parts[1], original[2]);

        assert!(config.verify_token(&tampered).is_err());
        assert!(config.verify_token("not-a-token").is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let config = AuthConfig::new("test-secret", 24);
        let issued = Utc::now() - Duration::hours(3);
        let token = config
            .encode_claims(&Claims {
                sub: "42".to_string(),
                username: "alice".to_string(),
                staff: false,
                iat: issued.timestamp() as usize,
                exp: (issued + Duration::hours(1)).timestamp() as usize,
            })
            .unwrap();

        assert_eq!(
            config.verify_token(&token),
            Err(AuthError::TokenVerificationFailed)
        );
    }

    #[test]
    fn test_error_status() {
        assert_eq!(AuthError::MissingToken.status(), Status::Unauthorized);
        assert_eq!(AuthError::NotAuthorized.status(), Status::Forbidden);
        assert_eq!(AuthError::DatabaseError.status(), Status::InternalServerError);
    }
}
