use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::config::AppConfig;
use crate::models::auth::{AuthUser, Claims};
use crate::utils::errors::ServiceError;

/// Verifies an access token issued by the hosted auth service and returns
/// the user it was issued to.
pub fn authenticate(auth: Option<&BearerAuth>, config: &AppConfig) -> Result<AuthUser, ServiceError> {
    let auth = auth.ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;
    verify_token(auth.token(), config)
}

pub fn verify_token(token: &str, config: &AppConfig) -> Result<AuthUser, ServiceError> {
    let mut validation = Validation::new(Algorithm::HS256);
    match config.jwt_audience {
        Some(ref audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let data = decode::<Claims>(token, &DecodingKey::from_secret(config.jwt_secret.as_ref()), &validation)?;

    if data.claims.sub.trim().is_empty() {
        return Err(ServiceError::Unauthorized("Token has no subject".to_string()));
    }

    Ok(AuthUser::from(data.claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn config(audience: Option<&str>) -> AppConfig {
        AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/todo".to_string()),
            "JWT_SECRET" => Some("test-secret".to_string()),
            "JWT_AUDIENCE" => audience.map(str::to_string),
            _ => None,
        })
        .unwrap()
    }

    fn token(sub: &str, aud: Option<&str>, expires_in: Duration, secret: &str) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            email: Some("user@example.com".to_string()),
            aud: aud.map(str::to_string),
            exp: (now + expires_in).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
    }

    #[test]
    fn valid_token_yields_the_subject() {
        let user = verify_token(&token("user-1", None, Duration::hours(1), "test-secret"), &config(None)).unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn expired_or_foreign_tokens_are_rejected() {
        let cfg = config(None);
        let expired = token("user-1", None, Duration::hours(-2), "test-secret");
        assert!(matches!(verify_token(&expired, &cfg), Err(ServiceError::Unauthorized(_))));

        let foreign = token("user-1", None, Duration::hours(1), "other-secret");
        assert!(matches!(verify_token(&foreign, &cfg), Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn audience_is_checked_only_when_configured() {
        let cfg = config(Some("authenticated"));
        let good = token("user-1", Some("authenticated"), Duration::hours(1), "test-secret");
        assert!(verify_token(&good, &cfg).is_ok());

        let wrong = token("user-1", Some("anon"), Duration::hours(1), "test-secret");
        assert!(verify_token(&wrong, &cfg).is_err());
    }
}
