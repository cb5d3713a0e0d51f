//! Skill directory types
//!
//! Skill names are compared by a normalized key (whitespace collapsed,
//! lower-cased). The same normalization is applied when a skill is written
//! and whenever a name is looked up, so "React", " react " and "REACT" all
//! address the same row.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

pub const MAX_SKILL_NAME_LEN: usize = 100;

/// Skill entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
}

/// A validated skill name together with its lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SkillName {
    display: String,
    key: String,
}

impl SkillName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let display = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if display.is_empty() {
            return Err(ValidationError::new("skill name must not be empty"));
        }
        if display.chars().count() > MAX_SKILL_NAME_LEN {
            return Err(ValidationError::new(format!(
                "skill name must be at most {MAX_SKILL_NAME_LEN} characters"
            )));
        }

        let key = normalize_skill_key(&display);
        Ok(Self { display, key })
    }

    /// Parse a list of names, dropping duplicates by key and keeping the
    /// first spelling seen.
    pub fn parse_all<'a, I>(raw: I) -> Result<Vec<Self>, ValidationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names: Vec<Self> = Vec::new();
        for item in raw {
            let name = Self::parse(item)?;
            if !names.iter().any(|n| n.key == name.key) {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Lookup key for a skill name: whitespace collapsed and lower-cased.
pub fn normalize_skill_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Request DTO for creating a skill
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSkillRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_whitespace_collapse_to_one_key() {
        let a = SkillName::parse("React").unwrap();
        let b = SkillName::parse("  react ").unwrap();
        let c = SkillName::parse("Machine   Learning").unwrap();

        assert_eq!(a.key(), b.key());
        assert_eq!(a.display(), "React");
        assert_eq!(c.display(), "Machine Learning");
        assert_eq!(c.key(), "machine learning");
        assert_eq!(normalize_skill_key(" Machine\tLEARNING "), "machine learning");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(SkillName::parse("   ").is_err());
        assert!(SkillName::parse("").is_err());
    }

    #[test]
    fn parse_all_dedupes_by_key() {
        let names = SkillName::parse_all(["Django", "react", "DJANGO "]).unwrap();
        let keys: Vec<_> = names.iter().map(SkillName::key).collect();
        assert_eq!(keys, vec!["django", "react"]);
        assert_eq!(names[0].display(), "Django");
    }
}
