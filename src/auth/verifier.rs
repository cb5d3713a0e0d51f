//! HS256 bearer token verification

use anyhow::{Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::Claims;

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // `set_issuer`/`set_audience` only compare claims that are present.
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }
        match audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a JWT and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .context("JWT validation failed")?;
        Ok(data.claims)
    }
}

/// Sign claims with the shared secret. Used by tests and local tooling to
/// mint tokens the verifier accepts.
pub fn sign(secret: &str, claims: &Claims) -> Result<String> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to sign JWT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn claims(exp_offset: i64) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            exp: Utc::now().timestamp() + exp_offset,
            iat: Some(Utc::now().timestamp()),
            iss: None,
            aud: None,
            email: Some("ada@example.com".into()),
        }
    }

    #[test]
    fn accepts_tokens_signed_with_the_shared_secret() {
        let verifier = TokenVerifier::new("s3cret", None, None);
        let original = claims(3600);
        let token = sign("s3cret", &original).unwrap();

        let verified = verifier.verify(&token).unwrap();
        assert_eq!(verified.sub, original.sub);
        assert_eq!(verified.email, original.email);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let verifier = TokenVerifier::new("s3cret", None, None);
        assert!(verifier.verify(&sign("other", &claims(3600)).unwrap()).is_err());
        assert!(verifier.verify(&sign("s3cret", &claims(-3600)).unwrap()).is_err());
        assert!(verifier.verify("not-a-jwt").is_err());
    }

    #[test]
    fn enforces_issuer_when_configured() {
        let verifier = TokenVerifier::new("s3cret", Some("https://id.example.com"), None);
        assert!(verifier.verify(&sign("s3cret", &claims(3600)).unwrap()).is_err());

        let mut issued = claims(3600);
        issued.iss = Some("https://id.example.com".into());
        assert!(verifier.verify(&sign("s3cret", &issued).unwrap()).is_ok());
    }

    #[test]
    fn rejects_foreign_issuer() {
        let verifier = TokenVerifier::new("s3cret", Some("https://id.example.com"), None);
        let mut foreign = claims(3600);
        foreign.iss = Some("https://evil.example.com".into());
        assert!(verifier.verify(&sign("s3cret", &foreign).unwrap()).is_err());
    }

    #[test]
    fn issuer_is_optional_when_not_configured() {
        let verifier = TokenVerifier::new("s3cret", None, None);
        let mut issued = claims(3600);
        issued.iss = Some("https://anyone.example.com".into());
        assert!(verifier.verify(&sign("s3cret", &issued).unwrap()).is_ok());
        assert!(verifier.verify(&sign("s3cret", &claims(3600)).unwrap()).is_ok());
    }

    #[test]
    fn enforces_audience_when_configured() {
        let verifier = TokenVerifier::new("s3cret", None, Some("gigmarket"));
        assert!(verifier.verify(&sign("s3cret", &claims(3600)).unwrap()).is_err());

        let mut wrong = claims(3600);
        wrong.aud = Some("other-app".into());
        assert!(verifier.verify(&sign("s3cret", &wrong).unwrap()).is_err());

        let mut right = claims(3600);
        right.aud = Some("gigmarket".into());
        let verified = verifier.verify(&sign("s3cret", &right).unwrap()).unwrap();
        assert_eq!(verified.aud.as_deref(), Some("gigmarket"));
    }
}
