use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, Principal, Role, SessionVerifier, UserId};
use crate::config::SessionConfig;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 verifier for session tokens.
#[derive(Clone)]
pub struct JwtSessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionVerifier {
    pub fn new(config: &SessionConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }
}

impl SessionVerifier for JwtSessionVerifier {
    fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(err.to_string()),
            },
        )?;

        let claims = data.claims;
        Ok(Principal {
            user_id: UserId(claims.sub),
            role: claims.role,
            name: claims.name,
        })
    }
}

/// Issues session tokens signed with the configured secret.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::minutes(config.ttl_minutes),
        }
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.user_id.0.clone(),
            role: principal.role,
            name: principal.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Issue(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_config(ttl_minutes: i64) -> SessionConfig {
        SessionConfig {
            secret: "unit-test-secret".to_string(),
            ttl_minutes,
        }
    }

    #[test]
    fn issued_tokens_round_trip_to_principal() {
        let config = session_config(30);
        let principal = Principal::new("owner-7", Role::Executive, "Ravi");
        let token = SessionIssuer::new(&config)
            .issue(&principal)
            .expect("token issued");

        let verified = JwtSessionVerifier::new(&config)
            .verify(&token)
            .expect("token verifies");
        assert_eq!(verified, principal);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = session_config(-60);
        let token = SessionIssuer::new(&config)
            .issue(&Principal::new("u1", Role::User, "Asha"))
            .expect("token issued");

        let result = JwtSessionVerifier::new(&config).verify(&token);
        assert_eq!(result, Err(AuthError::Expired));
    }

    #[test]
    fn tokens_signed_with_other_secret_are_invalid() {
        let token = SessionIssuer::new(&session_config(30))
            .issue(&Principal::new("u1", Role::Admin, "Asha"))
            .expect("token issued");
        let other = SessionConfig {
            secret: "different".to_string(),
            ttl_minutes: 30,
        };

        assert!(matches!(
            JwtSessionVerifier::new(&other).verify(&token),
            Err(AuthError::Invalid(_))
        ));
    }
}
