//! Farmer login profile.
//!
//! Login only records who is using the dashboard. It is held in memory and is
//! not an authentication mechanism.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::language::Language;

/// Name and farm location entered at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmerProfile {
    pub name: String,
    pub location: String,
}

impl FarmerProfile {
    /// Build a profile from raw form input. Both fields are trimmed and must
    /// not be empty afterwards.
    pub fn new(name: &str, location: &str) -> ModelResult<Self> {
        let name = name.trim();
        let location = location.trim();
        if name.is_empty() {
            return Err(ModelError::EmptyField("name"));
        }
        if location.is_empty() {
            return Err(ModelError::EmptyField("location"));
        }
        Ok(Self {
            name: name.to_string(),
            location: location.to_string(),
        })
    }
}

/// Logged-in dashboard session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmerSession {
    pub id: Uuid,
    pub profile: FarmerProfile,
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

impl FarmerSession {
    pub fn new(profile: FarmerProfile, language: Language) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile,
            language,
            created_at: Utc::now(),
        }
    }

    /// Greeting shown in the dashboard header.
    pub fn greeting(&self) -> String {
        match self.language {
            Language::En => format!("Welcome, {} ({})", self.profile.name, self.profile.location),
            Language::Hi => format!("स्वागत है, {} ({})", self.profile.name, self.profile.location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_trims_input() {
        let profile = FarmerProfile::new("  Ramesh ", "\tNashik\n").unwrap();
        assert_eq!(profile.name, "Ramesh");
        assert_eq!(profile.location, "Nashik");
    }

    #[test]
    fn test_profile_rejects_blank_fields() {
        assert_eq!(
            FarmerProfile::new("   ", "Nashik").unwrap_err(),
            ModelError::EmptyField("name")
        );
        assert_eq!(
            FarmerProfile::new("Ramesh", "").unwrap_err(),
            ModelError::EmptyField("location")
        );
    }

    #[test]
    fn test_greeting_follows_language() {
        let profile = FarmerProfile::new("Asha", "Pune").unwrap();
        let mut session = FarmerSession::new(profile, Language::En);
        assert_eq!(session.greeting(), "Welcome, Asha (Pune)");

        session.language = Language::Hi;
        assert!(session.greeting().starts_with("स्वागत है"));
    }
}
