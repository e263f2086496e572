//! Signed, time-limited bearer tokens.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::Value;
use thiserror::Error;

use quill_types::api::Claims;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Token settings supplied at startup.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub algorithm: String,
    pub expires_in: Duration,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    header: Header,
    validation: Validation,
    expires_in: Duration,
}

impl TokenCodec {
    /// Only the HMAC family is accepted since the key is a shared secret.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|_| TokenError::UnsupportedAlgorithm(config.algorithm.clone()))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(TokenError::UnsupportedAlgorithm(config.algorithm.clone()));
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            header: Header::new(algorithm),
            validation,
            expires_in: config.expires_in,
        })
    }

    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: Value::from(user_id),
            exp: (now + self.expires_in).timestamp().max(0) as u64,
        };
        Ok(encode(&self.header, &claims, &self.encoding)?)
    }

    /// Check signature and expiry, returning the identity claim as a string.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::InvalidToken)?;
        canonical_identity(&data.claims.user_id).ok_or(TokenError::InvalidToken)
    }
}

fn canonical_identity(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&TokenConfig {
            secret: secret.into(),
            algorithm: "HS256".into(),
            expires_in: Duration::minutes(30),
        })
        .unwrap()
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let codec = codec("secret");
        let token = codec.issue(17).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), "17");
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec("secret");
        let token = codec
            .issue_at(17, Utc::now() - Duration::hours(1))
            .unwrap();
        assert!(matches!(codec.verify(&token), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = codec("one").issue(17).unwrap();
        assert!(matches!(
            codec("two").verify(&token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(matches!(
            codec("secret").verify("not.a.jwt"),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn string_identity_is_accepted() {
        let claims = Claims {
            user_id: Value::from("17"),
            exp: (Utc::now() + Duration::minutes(5)).timestamp() as u64,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(codec("secret").verify(&token).unwrap(), "17");
    }

    #[test]
    fn null_identity_is_rejected() {
        let claims = Claims {
            user_id: Value::Null,
            exp: (Utc::now() + Duration::minutes(5)).timestamp() as u64,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(codec("secret").verify(&token).is_err());
    }

    #[test]
    fn asymmetric_algorithm_is_refused() {
        let result = TokenCodec::new(&TokenConfig {
            secret: "secret".into(),
            algorithm: "RS256".into(),
            expires_in: Duration::minutes(30),
        });
        assert!(matches!(result, Err(TokenError::UnsupportedAlgorithm(_))));
    }
}
