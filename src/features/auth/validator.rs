use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::model::{AuthenticatedUser, Claims};
use crate::core::config::AuthConfig;
use crate::core::error::AppError;

/// Validates HS256 access tokens issued by the identity service
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.leeway = config.jwt_leeway.as_secs();
        validation.validate_nbf = true;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("Rejected access token: {}", e);
                AppError::Unauthorized("Invalid or expired token".to_string())
            })?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized("Token has no subject".to_string()));
        }

        let username = claims
            .username
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| claims.sub.clone());

        Ok(AuthenticatedUser {
            sub: claims.sub,
            username,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: SECRET.to_string(),
            issuer: "wastewise-identity".to_string(),
            audience: "wastewise-core".to_string(),
            jwt_leeway: Duration::from_secs(0),
        }
    }

    fn now() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    fn token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims() -> Claims {
        Claims {
            sub: "user-42".into(),
            username: Some("siti".into()),
            roles: vec!["moderator".into()],
            iss: "wastewise-identity".into(),
            aud: "wastewise-core".into(),
            exp: now() + 600,
            iat: Some(now()),
        }
    }

    #[test]
    fn test_valid_token() {
        let user = JwtValidator::new(&config())
            .validate_token(&token(&claims(), SECRET))
            .unwrap();
        assert_eq!(user.sub, "user-42");
        assert_eq!(user.username, "siti");
        assert!(user.can_moderate());
    }

    #[test]
    fn test_username_falls_back_to_sub() {
        let mut c = claims();
        c.username = None;
        let user = JwtValidator::new(&config())
            .validate_token(&token(&c, SECRET))
            .unwrap();
        assert_eq!(user.username, "user-42");
    }

    #[test]
    fn test_rejects_wrong_secret_audience_and_expiry() {
        let validator = JwtValidator::new(&config());

        let wrong_secret = token(&claims(), "ffffffffffffffffffffffffffffffff");
        assert!(validator.validate_token(&wrong_secret).is_err());

        let mut c = claims();
        c.aud = "someone-else".into();
        assert!(validator.validate_token(&token(&c, SECRET)).is_err());

        let mut c = claims();
        c.exp = now() - 3600;
        assert!(validator.validate_token(&token(&c, SECRET)).is_err());
    }
}
