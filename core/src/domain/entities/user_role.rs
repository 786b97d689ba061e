//! Role a phone number is being verified for.

use serde::{Deserialize, Serialize};

/// Registration role carried through issuance and returned on success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Resident,
    Official,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Resident => "resident",
            UserRole::Official => "official",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resident" => Ok(UserRole::Resident),
            "official" => Ok(UserRole::Official),
            other => Err(format!("Unknown user role: {}", other)),
        }
    }
}
