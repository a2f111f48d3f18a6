use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use casbin::{CoreApi, Enforcer};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::Modify;

use crate::error::ApiError;
use crate::model::{Role, Staff};

pub const SESSION_COOKIE: &str = "hotel_session";
const SESSION_TTL_DAYS: i64 = 1;

pub struct Keys {
    encoding_session_key: EncodingKey,
    decoding_session_key: DecodingKey,
    secure_cookie: bool,
}

impl Keys {
    pub fn new(session_secret: &str, secure_cookie: bool) -> Self {
        Self {
            encoding_session_key: EncodingKey::from_secret(session_secret.as_bytes()),
            decoding_session_key: DecodingKey::from_secret(session_secret.as_bytes()),
            secure_cookie,
        }
    }

    /// Issues a session for `staff` and stores it in the jar.
    pub fn start_session(&self, jar: CookieJar, staff: &Staff) -> Result<CookieJar, ApiError> {
        let claims = SessionClaims {
            sub: staff.id,
            username: staff.username.clone(),
            role: staff.role,
            exp: (Utc::now() + TimeDelta::days(SESSION_TTL_DAYS)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_session_key)
            .map_err(|e| ApiError::Internal(format!("Token creation error: {}", e)))?;
        let cookie = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie);
        Ok(jar.add(cookie))
    }

    pub fn end_session(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    fn read_session(&self, jar: &CookieJar) -> Option<SessionClaims> {
        let token = jar.get(SESSION_COOKIE)?;
        decode::<SessionClaims>(
            token.value(),
            &self.decoding_session_key,
            &Validation::default(),
        )
        .map_err(|e| tracing::debug!("rejected session cookie: {}", e))
        .ok()
        .map(|data| data.claims)
    }
}

/// The logged-in staff member, carried in a signed session cookie.
///
/// Extracting it is the "must be logged in" guard; use `Option<SessionClaims>`
/// where a session is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i32,
    pub username: String,
    pub role: Role,
    pub exp: i64,
}

impl SessionClaims {
    /// The "must have role" guard: the ACL decides whether this session's
    /// role may perform `action` on `resource`.
    pub fn authorize(
        &self,
        enforcer: &Enforcer,
        resource: &str,
        action: &str,
    ) -> Result<(), ApiError> {
        if permits(enforcer, self.role, resource, action) {
            Ok(())
        } else {
            tracing::debug!(
                user = %self.username,
                role = %self.role,
                resource,
                action,
                "permission denied"
            );
            Err(ApiError::roles_only(&allowed_roles(enforcer, resource, action)))
        }
    }
}

/// Loads the ACL model and policy files.
pub async fn load_enforcer(model: &'static str, policy: &'static str) -> casbin::Result<Enforcer> {
    Enforcer::new(model, policy).await
}

pub fn permits(enforcer: &Enforcer, role: Role, resource: &str, action: &str) -> bool {
    enforcer
        .enforce((role.to_string(), resource, action))
        .unwrap_or_default()
}

/// Roles the ACL lets perform `action` on `resource`.
pub fn allowed_roles(enforcer: &Enforcer, resource: &str, action: &str) -> Vec<Role> {
    Role::ALL
        .iter()
        .copied()
        .filter(|role| permits(enforcer, *role, resource, action))
        .collect()
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionClaims
where
    Arc<Keys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<Keys>::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        keys.read_session(&jar).ok_or_else(ApiError::login_required)
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing error: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::debug!("stored password hash is unreadable: {}", e);
            false
        }
    }
}

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(role: Role) -> Staff {
        Staff {
            id: 7,
            username: "rick".to_string(),
            password_hash: String::new(),
            role,
            first_name: "Rick".to_string(),
            last_name: "Desk".to_string(),
            email: "rick@hotel.test".to_string(),
            manager_id: None,
        }
    }

    async fn enforcer() -> Enforcer {
        load_enforcer(
            concat!(env!("CARGO_MANIFEST_DIR"), "/acl/model.conf"),
            concat!(env!("CARGO_MANIFEST_DIR"), "/acl/policy.csv"),
        )
        .await
        .unwrap()
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("S3cret", &hash));
        assert!(!verify_password("s3cret", "not a phc string"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(
            hash_password("same").unwrap(),
            hash_password("same").unwrap()
        );
    }

    #[test]
    fn session_cookie_round_trips() {
        let keys = Keys::new("0123456789abcdef0123456789abcdef", false);
        let jar = keys
            .start_session(CookieJar::new(), &staff(Role::Manager))
            .unwrap();
        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.http_only(), Some(true));

        let claims = keys.read_session(&jar).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.username, "rick");
    }

    #[test]
    fn session_signed_with_another_secret_is_rejected() {
        let ours = Keys::new("0123456789abcdef0123456789abcdef", false);
        let theirs = Keys::new("fedcba9876543210fedcba9876543210", false);
        let jar = theirs
            .start_session(CookieJar::new(), &staff(Role::Admin))
            .unwrap();
        assert!(ours.read_session(&jar).is_none());
    }

    #[test]
    fn ended_session_has_no_cookie() {
        let keys = Keys::new("0123456789abcdef0123456789abcdef", false);
        let jar = keys
            .start_session(CookieJar::new(), &staff(Role::Admin))
            .unwrap();
        let jar = keys.end_session(jar);
        assert!(keys.read_session(&jar).is_none());
    }

    #[tokio::test]
    async fn acl_grants_follow_the_policy_file() {
        let enforcer = enforcer().await;
        assert_eq!(allowed_roles(&enforcer, "staff", "read"), vec![Role::Admin]);
        assert_eq!(
            allowed_roles(&enforcer, "bookings", "create"),
            vec![Role::Manager, Role::Receptionist]
        );
        assert_eq!(
            allowed_roles(&enforcer, "customers", "create"),
            vec![Role::Receptionist]
        );
        assert!(!permits(&enforcer, Role::Receptionist, "staff", "create"));
    }

    #[tokio::test]
    async fn wrong_role_is_forbidden_with_the_allowed_roles_named() {
        let enforcer = enforcer().await;
        let claims = SessionClaims {
            sub: 1,
            username: "ann".to_string(),
            role: Role::Admin,
            exp: 0,
        };
        let err = claims
            .authorize(&enforcer, "bookings", "create")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Access denied. Allowed roles: Manager, Receptionist."
        );
        assert!(claims.authorize(&enforcer, "staff", "read").is_ok());
    }
}
