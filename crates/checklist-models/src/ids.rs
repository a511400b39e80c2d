//! Type-safe ID wrappers for scopes and principals.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a checklist scope (one chat surface).
///
/// Stored as an opaque string so that both integer chat ids and string
/// handles round-trip unchanged through the JSON document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    /// Creates an ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interprets the scope as a numeric chat id, if it is one.
    pub fn as_chat_id(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ScopeId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ScopeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScopeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ScopeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of an acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PrincipalId(pub u64);

impl PrincipalId {
    /// Returns the raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PrincipalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// Older documents stored principal ids as strings.
impl<'de> Deserialize<'de> for PrincipalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid principal id: {:?}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_id_from_chat_id() {
        let id = ScopeId::from(-100123_i64);
        assert_eq!(id.as_str(), "-100123");
        assert_eq!(id.as_chat_id(), Some(-100123));
    }

    #[test]
    fn test_scope_id_non_numeric() {
        let id = ScopeId::from("kitchen");
        assert_eq!(id.as_chat_id(), None);
        assert_eq!(id.to_string(), "kitchen");
    }

    #[test]
    fn test_principal_id_accepts_number_and_string() {
        let a: PrincipalId = serde_json::from_str("42").unwrap();
        let b: PrincipalId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "42");
    }

    #[test]
    fn test_principal_id_rejects_garbage() {
        let result: Result<PrincipalId, _> = serde_json::from_str("\"alice\"");
        assert!(result.is_err());
    }
}
