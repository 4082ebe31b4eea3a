//! Action vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Actions a principal can attempt on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    List,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 5] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::List,
    ];

    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action name outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action `{0}`")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("read", Action::Read)]
    #[test_case("create", Action::Create)]
    #[test_case("update", Action::Update)]
    #[test_case("delete", Action::Delete)]
    #[test_case("list", Action::List)]
    fn test_parse(name: &str, expected: Action) {
        assert_eq!(name.parse::<Action>().unwrap(), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            "Read".parse::<Action>(),
            Err(ParseActionError("Read".into()))
        );
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&[Action::Read, Action::List]).unwrap();
        assert_eq!(json, r#"["read","list"]"#);
    }
}
