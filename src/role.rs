use serde::{Deserialize, Serialize};

/// Which side of the marketplace an account belongs to.
///
/// Mentors and mentees live in two independent stores; the role selects the
/// store and is fixed at creation (it is embedded in the session token).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
    Mentee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mentor => "mentor",
            Role::Mentee => "mentee",
        }
    }

    /// Directory segment for uploaded media, e.g. `uploads/mentors/<file>`.
    pub fn media_dir(&self) -> &'static str {
        match self {
            Role::Mentor => "mentors",
            Role::Mentee => "mentees",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Mentor).unwrap(), "\"mentor\"");
        assert_eq!(serde_json::to_string(&Role::Mentee).unwrap(), "\"mentee\"");
    }

    #[test]
    fn deserializes_lowercase() {
        let role: Role = serde_json::from_str("\"mentee\"").unwrap();
        assert_eq!(role, Role::Mentee);
    }
}
