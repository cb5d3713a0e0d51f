//! Principals: authenticated actors with a fixed role.
//!
//! Role-dependent fields live inside [`RoleProfile`], so a client can never
//! carry an availability or payment account and a freelancer can never carry
//! company fields. Requests that try to set a field of the other role are
//! rejected at the boundary instead of being silently cleared.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{Money, Skill, SkillName, ValidationError};

pub const MAX_USERNAME_LEN: usize = 150;

/// Principal role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Freelancer,
}

impl Role {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Freelancer => "freelancer",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Self::Client),
            "freelancer" => Some(Self::Freelancer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "CLIENT"),
            Self::Freelancer => write!(f, "FREELANCER"),
        }
    }
}

/// Freelancer availability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    #[default]
    Available,
    Busy,
    NotAvailable,
}

impl Availability {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::NotAvailable => "not_available",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "busy" => Some(Self::Busy),
            "not_available" => Some(Self::NotAvailable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientProfile {
    pub company_name: Option<String>,
    pub company_website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreelancerProfile {
    pub availability: Availability,
    pub hourly_rate: Option<Money>,
    pub skills: Vec<Skill>,
    /// Opaque connected-account id at the payment processor.
    pub payment_account: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleProfile {
    Client(ClientProfile),
    Freelancer(FreelancerProfile),
}

/// Principal entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile: RoleProfile,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn new_client(id: Uuid, username: &str, name: &str, profile: ClientProfile) -> Self {
        Self::with_profile(id, username, name, RoleProfile::Client(profile))
    }

    pub fn new_freelancer(
        id: Uuid,
        username: &str,
        name: &str,
        profile: FreelancerProfile,
    ) -> Self {
        Self::with_profile(id, username, name, RoleProfile::Freelancer(profile))
    }

    fn with_profile(id: Uuid, username: &str, name: &str, profile: RoleProfile) -> Self {
        Self {
            id,
            username: username.to_string(),
            name: name.to_string(),
            email: None,
            bio: None,
            profile,
            created_at: Utc::now(),
        }
    }

    /// Build a principal from a registration request. `skills` must already
    /// be resolved against the skill directory.
    pub fn register(
        id: Uuid,
        req: RegisterRequest,
        skills: Vec<Skill>,
    ) -> Result<Self, ValidationError> {
        let username = validate_username(&req.username)?;
        let name = required_text("name", &req.name)?;
        let email = optional_email(req.email.as_deref())?;

        reject_foreign_fields(
            req.role,
            &[
                ("company_name", req.company_name.is_some()),
                ("company_website", req.company_website.is_some()),
            ],
            &[
                ("availability", req.availability.is_some()),
                ("hourly_rate", req.hourly_rate.is_some()),
                ("skills", req.skills.is_some()),
            ],
        )?;

        let profile = match req.role {
            Role::Client => RoleProfile::Client(ClientProfile {
                company_name: optional_text(req.company_name.as_deref()),
                company_website: optional_text(req.company_website.as_deref()),
            }),
            Role::Freelancer => RoleProfile::Freelancer(FreelancerProfile {
                availability: req.availability.unwrap_or_default(),
                hourly_rate: req.hourly_rate.map(positive_rate).transpose()?,
                skills,
                payment_account: None,
            }),
        };

        let mut principal = Self::with_profile(id, &username, &name, profile);
        principal.email = email;
        principal.bio = optional_text(req.bio.as_deref());
        Ok(principal)
    }

    pub fn role(&self) -> Role {
        match self.profile {
            RoleProfile::Client(_) => Role::Client,
            RoleProfile::Freelancer(_) => Role::Freelancer,
        }
    }

    pub fn is_client(&self) -> bool {
        self.role() == Role::Client
    }

    pub fn is_freelancer(&self) -> bool {
        self.role() == Role::Freelancer
    }

    pub fn as_freelancer(&self) -> Option<&FreelancerProfile> {
        match &self.profile {
            RoleProfile::Freelancer(f) => Some(f),
            RoleProfile::Client(_) => None,
        }
    }

    pub fn as_client(&self) -> Option<&ClientProfile> {
        match &self.profile {
            RoleProfile::Client(c) => Some(c),
            RoleProfile::Freelancer(_) => None,
        }
    }

    pub fn payment_account(&self) -> Option<&str> {
        self.as_freelancer()
            .and_then(|f| f.payment_account.as_deref())
    }

    pub fn skills(&self) -> &[Skill] {
        self.as_freelancer().map(|f| f.skills.as_slice()).unwrap_or(&[])
    }

    /// Apply a profile patch. Fields of the other role are a validation
    /// error; `skills` must be resolved when the patch names any.
    pub fn apply_update(
        &mut self,
        req: UpdateProfileRequest,
        skills: Option<Vec<Skill>>,
    ) -> Result<(), ValidationError> {
        reject_foreign_fields(
            self.role(),
            &[
                ("company_name", req.company_name.is_some()),
                ("company_website", req.company_website.is_some()),
            ],
            &[
                ("availability", req.availability.is_some()),
                ("hourly_rate", req.hourly_rate.is_some()),
                ("skills", req.skills.is_some()),
            ],
        )?;

        if let Some(name) = req.name.as_deref() {
            self.name = required_text("name", name)?;
        }
        if let Some(email) = req.email.as_deref() {
            self.email = optional_email(Some(email))?;
        }
        if let Some(bio) = req.bio.as_deref() {
            self.bio = optional_text(Some(bio));
        }

        match &mut self.profile {
            RoleProfile::Client(client) => {
                if let Some(company) = req.company_name.as_deref() {
                    client.company_name = optional_text(Some(company));
                }
                if let Some(website) = req.company_website.as_deref() {
                    client.company_website = optional_text(Some(website));
                }
            }
            RoleProfile::Freelancer(freelancer) => {
                if let Some(availability) = req.availability {
                    freelancer.availability = availability;
                }
                if let Some(rate) = req.hourly_rate {
                    freelancer.hourly_rate = Some(positive_rate(rate)?);
                }
                if let Some(skills) = skills {
                    freelancer.skills = skills;
                }
            }
        }

        Ok(())
    }
}

fn reject_foreign_fields(
    role: Role,
    client_fields: &[(&'static str, bool)],
    freelancer_fields: &[(&'static str, bool)],
) -> Result<(), ValidationError> {
    let foreign = match role {
        Role::Client => freelancer_fields,
        Role::Freelancer => client_fields,
    };

    match foreign.iter().find(|(_, present)| *present) {
        Some((field, _)) => Err(ValidationError::new(format!(
            "field '{field}' is not valid for {role} accounts"
        ))),
        None => Ok(()),
    }
}

fn validate_username(raw: &str) -> Result<String, ValidationError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(ValidationError::new("username must not be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::new(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::new(
            "username may only contain letters, digits and @/./+/-/_",
        ));
    }
    Ok(username.to_string())
}

fn required_text(field: &str, raw: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::new(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional_email(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match optional_text(raw) {
        Some(email) if !email.contains('@') => Err(ValidationError::new(format!(
            "'{email}' is not a valid email address"
        ))),
        other => Ok(other),
    }
}

fn positive_rate(rate: Decimal) -> Result<Money, ValidationError> {
    let rate = Money::from_decimal(rate)?;
    if !rate.is_positive() {
        return Err(ValidationError::new("hourly_rate must be greater than zero"));
    }
    Ok(rate)
}

/// Request DTO for registering the authenticated identity as a principal
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_website: Option<String>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
}

impl RegisterRequest {
    pub fn skill_names(&self) -> Result<Vec<SkillName>, ValidationError> {
        match &self.skills {
            Some(skills) => SkillName::parse_all(skills.iter().map(String::as_str)),
            None => Ok(Vec::new()),
        }
    }
}

/// Request DTO for updating the caller's own profile. The role is not
/// patchable; an unknown `role` key fails deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_website: Option<String>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
}

impl UpdateProfileRequest {
    pub fn skill_names(&self) -> Result<Option<Vec<SkillName>>, ValidationError> {
        self.skills
            .as_ref()
            .map(|skills| SkillName::parse_all(skills.iter().map(String::as_str)))
            .transpose()
    }
}

/// Response DTO for a principal
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalResponse {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<Skill>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments_onboarded: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl PrincipalResponse {
    /// View of someone else's profile; contact details are left out.
    pub fn public(p: Principal) -> Self {
        let mut response = Self::from(p);
        response.email = None;
        response
    }
}

impl From<Principal> for PrincipalResponse {
    fn from(p: Principal) -> Self {
        let role = p.role();
        let mut response = Self {
            id: p.id,
            username: p.username,
            name: p.name,
            role,
            email: p.email,
            bio: p.bio,
            company_name: None,
            company_website: None,
            availability: None,
            hourly_rate: None,
            skills: None,
            payments_onboarded: None,
            created_at: p.created_at,
        };

        match p.profile {
            RoleProfile::Client(c) => {
                response.company_name = c.company_name;
                response.company_website = c.company_website;
            }
            RoleProfile::Freelancer(f) => {
                response.availability = Some(f.availability);
                response.hourly_rate = f.hourly_rate;
                response.payments_onboarded = Some(f.payment_account.is_some());
                response.skills = Some(f.skills);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn register(role: Role) -> RegisterRequest {
        RegisterRequest {
            username: "ada".into(),
            name: "Ada".into(),
            role,
            email: Some("ada@example.com".into()),
            bio: None,
            company_name: None,
            company_website: None,
            availability: None,
            hourly_rate: None,
            skills: None,
        }
    }

    #[test]
    fn client_registration_rejects_freelancer_fields() {
        let mut req = register(Role::Client);
        req.availability = Some(Availability::Busy);

        let err = Principal::register(Uuid::new_v4(), req, vec![]).unwrap_err();
        assert!(err.0.contains("availability"), "{err}");
    }

    #[test]
    fn freelancer_registration_rejects_company_fields() {
        let mut req = register(Role::Freelancer);
        req.company_name = Some("Acme".into());

        let err = Principal::register(Uuid::new_v4(), req, vec![]).unwrap_err();
        assert!(err.0.contains("company_name"), "{err}");
    }

    #[test]
    fn freelancer_defaults_to_available_without_account() {
        let mut req = register(Role::Freelancer);
        req.hourly_rate = Some(Decimal::from_str("45.50").unwrap());

        let p = Principal::register(Uuid::new_v4(), req, vec![]).unwrap();
        let f = p.as_freelancer().unwrap();
        assert_eq!(f.availability, Availability::Available);
        assert_eq!(f.hourly_rate, Some(Money::from_cents(4550)));
        assert!(p.payment_account().is_none());
        assert_eq!(p.role(), Role::Freelancer);
    }

    #[test]
    fn update_cannot_cross_roles() {
        let mut client = Principal::new_client(Uuid::new_v4(), "c", "C", ClientProfile::default());
        let patch = UpdateProfileRequest {
            hourly_rate: Some(Decimal::from(10)),
            ..Default::default()
        };
        assert!(client.apply_update(patch, None).is_err());
        assert!(client.as_client().is_some());
    }

    #[test]
    fn update_applies_own_role_fields() {
        let mut freelancer =
            Principal::new_freelancer(Uuid::new_v4(), "f", "F", FreelancerProfile::default());
        let patch = UpdateProfileRequest {
            bio: Some("  Rust and React  ".into()),
            availability: Some(Availability::NotAvailable),
            ..Default::default()
        };
        freelancer.apply_update(patch, None).unwrap();

        assert_eq!(freelancer.bio.as_deref(), Some("Rust and React"));
        assert_eq!(
            freelancer.as_freelancer().unwrap().availability,
            Availability::NotAvailable
        );
    }

    #[test]
    fn role_is_not_patchable() {
        let body = serde_json::json!({ "role": "CLIENT" });
        assert!(serde_json::from_value::<UpdateProfileRequest>(body).is_err());
    }

    #[test]
    fn usernames_are_checked() {
        let mut req = register(Role::Client);
        req.username = "bad name".into();
        assert!(Principal::register(Uuid::new_v4(), req, vec![]).is_err());
    }
}
