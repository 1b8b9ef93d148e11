//! Patient intake form and the validated profile built from it.

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;

use serde::{Deserialize, Serialize};

use super::ValidationError;

pub const DEFAULT_CONTACT: &str = "Not provided";
pub const DEFAULT_MEDICAL_HISTORY: &str = "None provided";

/// Raw intake form values, exactly as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub contact: String,
    pub medical_history: String,
}

/// Validated patient profile. Immutable for the lifetime of a session and
/// serialized as the `/start_session` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub contact: String,
    pub medical_history: String,
}

impl ProfileForm {
    /// Build a [`PatientProfile`], or report which required fields are missing.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingRequired`] when name, age or gender is
    /// blank, and [`ValidationError::InvalidAge`] when the age does not start
    /// with a non-negative integer.
    pub fn validate(&self) -> Result<PatientProfile, ValidationError> {
        let name = self.name.trim();
        let age = self.age.trim();
        let gender = self.gender.trim();

        let missing: Vec<&'static str> = [("name", name), ("age", age), ("gender", gender)]
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(field, _)| field)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingRequired { fields: missing });
        }

        let age = parse_leading_age(age).ok_or_else(|| ValidationError::InvalidAge(age.to_owned()))?;

        Ok(PatientProfile {
            name: name.to_owned(),
            age,
            gender: gender.to_owned(),
            contact: or_default(&self.contact, DEFAULT_CONTACT),
            medical_history: or_default(&self.medical_history, DEFAULT_MEDICAL_HISTORY),
        })
    }
}

/// Parse the leading run of digits, so `"42 years"` reads as 42.
fn parse_leading_age(raw: &str) -> Option<u32> {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<u32>().ok()
}

fn or_default(raw: &str, default: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() { default.to_owned() } else { trimmed.to_owned() }
}
