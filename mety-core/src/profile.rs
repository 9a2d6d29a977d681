//! User profile: the demographics collected on the About Me page.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gender as the prediction model codes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Numeric code sent to the backend (0 = male, 1 = female).
    pub fn code(self) -> u8 {
        match self {
            Gender::Male => 0,
            Gender::Female => 1,
        }
    }

    /// Parse a numeric plan value back into a gender.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(Gender::Male)
        } else if value == 1.0 {
            Some(Gender::Female)
        } else {
            None
        }
    }
}

impl TryFrom<u8> for Gender {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Gender::Male),
            1 => Ok(Gender::Female),
            other => Err(format!("invalid gender code {other}, expected 0 or 1")),
        }
    }
}

impl From<Gender> for u8 {
    fn from(gender: Gender) -> Self {
        gender.code()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

/// Partial user profile. Every field may still be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.gender.is_none()
    }

    /// Overlay the known fields of `other` onto this profile.
    pub fn merge(&mut self, other: &UserProfile) {
        if let Some(name) = &other.name {
            self.name = Some(name.clone());
        }
        if other.age.is_some() {
            self.age = other.age;
        }
        if other.gender.is_some() {
            self.gender = other.gender;
        }
    }

    pub fn age_value(&self) -> Option<f64> {
        self.age.map(f64::from)
    }

    pub fn gender_value(&self) -> Option<f64> {
        self.gender.map(|g| f64::from(g.code()))
    }
}
