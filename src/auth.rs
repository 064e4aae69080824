//! Password hashing and bearer tokens
use super::error::{MarketError, MarketResult};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub fn hash_password(password: &str) -> MarketResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MarketError::Crypto(format!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, stored: &str) -> MarketResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| MarketError::Crypto(format!("stored password hash is malformed: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // account id
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks HS256 access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDelta,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> MarketResult<Self> {
        let ttl = TimeDelta::try_hours(ttl_hours)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| MarketError::Validation(format!("token lifetime of {ttl_hours} hours is out of range")))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn issue(&self, account_id: &str) -> MarketResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .ok_or_else(|| MarketError::Validation("token expiry is out of range".into()))?
                .timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| MarketError::Crypto(format!("failed to sign token: {e}")))
    }

    /// Any malformed, forged or expired token is `Unauthorized`.
    pub fn verify(&self, token: &str) -> MarketResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| MarketError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
        assert!(verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn tokens_roundtrip_and_reject_forgeries() {
        let issuer = TokenIssuer::new("secret-a", 24).unwrap();
        let token = issuer.issue("user_1abc").unwrap();
        assert_eq!(issuer.verify(&token).unwrap().sub, "user_1abc");

        let other = TokenIssuer::new("secret-b", 24).unwrap();
        assert!(matches!(other.verify(&token), Err(MarketError::Unauthorized)));
        assert!(matches!(issuer.verify("garbage"), Err(MarketError::Unauthorized)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new("secret", -2).unwrap();
        let token = issuer.issue("user_1abc").unwrap();
        assert!(matches!(issuer.verify(&token), Err(MarketError::Unauthorized)));
    }

    #[test]
    fn out_of_range_lifetimes_are_refused() {
        assert!(matches!(
            TokenIssuer::new("secret", i64::MAX),
            Err(MarketError::Validation(_))
        ));
        // representable as a duration, but not as an expiry date
        assert!(TokenIssuer::new("secret", 1_000_000_000_000).is_err());
        assert!(TokenIssuer::new("secret", 24 * 365).is_ok());
    }
}
