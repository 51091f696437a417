//! Signed bearer tokens.

use super::AuthError;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mockbase_engine::Principal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The principal the token was issued to
    pub sub: Principal,
    /// Issued-at, seconds since the epoch
    pub iat: u64,
    /// Expiry, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Any other claims supplied when the token was issued
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Issues and verifies HS256 tokens with one shared secret.
#[derive(Clone)]
pub struct AuthGuard {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: Option<u64>,
}

impl AuthGuard {
    pub fn new(secret: &str, ttl_secs: Option<u64>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is optional: tokens issued without a TTL never expire.
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Sign `claims`, stamping `iat` (and `exp` when a TTL is configured).
    ///
    /// `sub` is required and may be a string or a number; numbers are kept as
    /// their decimal text. Caller-supplied `iat`/`exp` are ignored.
    pub fn generate_token(
        &self,
        mut claims: Map<String, Value>,
        now_secs: u64,
    ) -> Result<String, AuthError> {
        let sub = match claims.remove("sub") {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(AuthError::MissingSubject),
        };
        claims.remove("iat");
        claims.remove("exp");

        let claims = Claims {
            sub,
            iat: now_secs,
            exp: self.ttl_secs.map(|ttl| now_secs.saturating_add(ttl)),
            extra: claims,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Check the signature and expiry of `token` and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }

    pub fn ttl_secs(&self) -> Option<u64> {
        self.ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn now_secs() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    #[test]
    fn round_trip_keeps_extra_claims() {
        let guard = AuthGuard::new("secret", None);
        let token = guard
            .generate_token(claims(json!({"sub": "alice", "role": "admin"})), now_secs())
            .unwrap();

        let verified = guard.verify(&token).unwrap();
        assert_eq!(verified.sub, "alice");
        assert_eq!(verified.exp, None);
        assert_eq!(verified.extra.get("role"), Some(&json!("admin")));
    }

    #[test]
    fn numeric_subject() {
        let guard = AuthGuard::new("secret", Some(60));
        let token = guard.generate_token(claims(json!({"sub": 42})), now_secs()).unwrap();

        let verified = guard.verify(&token).unwrap();
        assert_eq!(verified.sub, "42");
        assert_eq!(verified.exp, Some(verified.iat + 60));
    }

    #[test]
    fn missing_subject() {
        let guard = AuthGuard::new("secret", None);
        let result = guard.generate_token(claims(json!({"role": "admin"})), now_secs());
        assert_eq!(result, Err(AuthError::MissingSubject));
    }

    #[test]
    fn expired_token() {
        let guard = AuthGuard::new("secret", Some(10));
        let token = guard
            .generate_token(claims(json!({"sub": "alice"})), now_secs() - 3600)
            .unwrap();

        assert_eq!(guard.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn wrong_secret() {
        let issuer = AuthGuard::new("secret", None);
        let other = AuthGuard::new("other", None);
        let token = issuer
            .generate_token(claims(json!({"sub": "alice"})), now_secs())
            .unwrap();

        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken(_))));
        assert!(matches!(issuer.verify("not-a-token"), Err(AuthError::InvalidToken(_))));
    }
}
