use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Short random token the relay assigns to every accepted connection.
///
/// It is the unit of addressing for signaling messages and carries no
/// relation to any user account.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    /// Generates a lowercase alphanumeric identity of `len` characters (capped at 32).
    pub fn generate(len: usize) -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        let len = len.clamp(1, raw.len());
        Self(raw[..len].to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for MemberId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
