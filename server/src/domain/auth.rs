//! Password hashing and session tokens
//!
//! Passwords are stored as argon2 PHC strings. Session tokens are HS256
//! JWTs with an `exp` claim. Revoking a user bumps a per-user generation
//! counter, so tokens minted before the bump stop resolving even though
//! their signature and expiry are still valid.

use std::time::Duration;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::data::types::Role;
use crate::domain::error::DomainError;
use crate::domain::models::User;

const GENERATED_PASSWORD_LEN: usize = 24;

/// Owner of a valid session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: u64,
    pub role: Role,
}

/// Issues and resolves bearer tokens
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<String, DomainError>;

    /// Owner of the token, if it is well-formed, unexpired and not revoked
    fn resolve(&self, token: &str) -> Option<TokenSubject>;

    /// Invalidate every token issued to a user so far
    fn revoke_user(&self, user_id: u64);
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// User id
    sub: String,
    role: Role,
    generation: u64,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Signs session tokens with a shared HMAC secret
pub struct JwtTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    generations: DashMap<u64, u64>,
}

impl JwtTokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
            generations: DashMap::new(),
        }
    }

    /// Issuer keyed by a random secret; its tokens die with the process
    pub fn ephemeral(ttl: Duration) -> Self {
        let secret: [u8; 32] = rand::random();
        Self::new(&secret, ttl)
    }

    fn generation(&self, user_id: u64) -> u64 {
        self.generations.get(&user_id).map_or(0, |g| *g)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, DomainError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| DomainError::Internal(format!("Failed to sign token: {e}")))
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, user: &User) -> Result<String, DomainError> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.sign(&SessionClaims {
            sub: user.id.to_string(),
            role: user.role,
            generation: self.generation(user.id),
            iat,
            exp: iat.saturating_add(ttl),
            jti: uuid::Uuid::new_v4().to_string(),
        })
    }

    fn resolve(&self, token: &str) -> Option<TokenSubject> {
        let claims = match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                return None;
            }
        };
        let user_id = claims.sub.parse::<u64>().ok()?;
        if claims.generation != self.generation(user_id) {
            tracing::debug!(user_id, "Session token was revoked");
            return None;
        }
        Some(TokenSubject {
            user_id,
            role: claims.role,
        })
    }

    fn revoke_user(&self, user_id: u64) {
        *self.generations.entry(user_id).or_insert(0) += 1;
    }
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Random alphanumeric password for accounts created without one
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, role: Role) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: None,
            role,
            status: "active".to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new(b"test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn test_password_roundtrip() {
        let stored = hash_password("hunter22").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert!(!verify_password("x", "no-separator"));
        assert!(!verify_password("x", "salt$short"));
        assert!(!verify_password("x", ""));
    }

    #[test]
    fn test_generated_password() {
        let a = generate_password();
        assert_eq!(a.len(), GENERATED_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, generate_password());
    }

    #[test]
    fn test_token_issue_resolve_revoke() {
        let issuer = issuer();
        let a = issuer.issue(&user(1, Role::Admin)).unwrap();
        let b = issuer.issue(&user(2, Role::Member)).unwrap();
        assert_ne!(a, b);
        assert_eq!(
            issuer.resolve(&a),
            Some(TokenSubject {
                user_id: 1,
                role: Role::Admin
            })
        );

        issuer.revoke_user(1);
        assert_eq!(issuer.resolve(&a), None);
        assert_eq!(issuer.resolve(&b).map(|s| s.role), Some(Role::Member));
        assert_eq!(issuer.resolve("bogus"), None);

        // Tokens minted after the revocation are valid again
        let c = issuer.issue(&user(1, Role::Admin)).unwrap();
        assert_eq!(issuer.resolve(&c).map(|s| s.user_id), Some(1));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let expired = issuer
            .sign(&SessionClaims {
                sub: "1".to_string(),
                role: Role::Admin,
                generation: 0,
                iat: now - 7200,
                exp: now - 60,
                jti: "old".to_string(),
            })
            .unwrap();
        assert_eq!(issuer.resolve(&expired), None);

        let fresh = issuer.issue(&user(1, Role::Admin)).unwrap();
        assert!(issuer.resolve(&fresh).is_some());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = JwtTokenIssuer::new(b"another-secret", Duration::from_secs(3600));
        let token = other.issue(&user(1, Role::Admin)).unwrap();
        assert_eq!(issuer().resolve(&token), None);
        assert!(other.resolve(&token).is_some());
    }

    #[test]
    fn test_ephemeral_issuers_do_not_share_secrets() {
        let a = JwtTokenIssuer::ephemeral(Duration::from_secs(60));
        let b = JwtTokenIssuer::ephemeral(Duration::from_secs(60));
        let token = a.issue(&user(5, Role::Member)).unwrap();
        assert!(a.resolve(&token).is_some());
        assert_eq!(b.resolve(&token), None);
    }
}
