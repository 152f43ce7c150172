//! The fixed participant roster.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CallError;

/// One of the call slots known at startup. Nothing outside this set can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player1,
    Player2,
    Player3,
    Player4,
    Player5,
    Player6,
    Host,
}

impl Role {
    /// The whole roster, in declaration order.
    pub const ALL: [Role; 7] = [
        Role::Player1,
        Role::Player2,
        Role::Player3,
        Role::Player4,
        Role::Player5,
        Role::Player6,
        Role::Host,
    ];

    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Player1 => "player1",
            Role::Player2 => "player2",
            Role::Player3 => "player3",
            Role::Player4 => "player4",
            Role::Player5 => "player5",
            Role::Player6 => "player6",
            Role::Host => "host",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| CallError::InvalidRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_roster_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn rejects_names_outside_roster() {
        for name in ["player0", "player7", "Host", "PLAYER1", "", " host"] {
            let err = name.parse::<Role>().unwrap_err();
            assert_eq!(err, CallError::InvalidRole(name.to_string()));
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Role::Player4).unwrap();
        assert_eq!(json, "\"player4\"");
        let role: Role = serde_json::from_str("\"host\"").unwrap();
        assert_eq!(role, Role::Host);
    }

    #[test]
    fn display_matches_wire_name() {
        for role in Role::ALL {
            assert_eq!(role.to_string(), role.as_str());
        }
    }
}
