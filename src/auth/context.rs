use super::Claims;
use uuid::Uuid;

/// Verified identity taken from a bearer token.
///
/// Carries no role: the role of a principal is read from storage, so a
/// token can never grant one.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Principal ID (from JWT sub claim)
    pub user_id: Uuid,

    /// Email if the token carries one
    pub email: Option<String>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;

        Ok(Self {
            user_id,
            email: claims.email.clone(),
        })
    }
}
