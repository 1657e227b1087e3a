//! Role domain model.
//!
//! Roles form a fixed total order used for coarse, route-level gating:
//! `solicitante < tecnico < supervisor < administrador`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ManutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Solicitante,
    Tecnico,
    Supervisor,
    Administrador,
}

impl Role {
    /// Every defined role, lowest rank first.
    pub const ALL: [Role; 4] = [
        Role::Solicitante,
        Role::Tecnico,
        Role::Supervisor,
        Role::Administrador,
    ];

    /// Position of the role in the hierarchy (1 = lowest).
    pub fn rank(self) -> u8 {
        match self {
            Role::Solicitante => 1,
            Role::Tecnico => 2,
            Role::Supervisor => 3,
            Role::Administrador => 4,
        }
    }

    /// Whether a holder of `self` meets a floor of `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Solicitante => "solicitante",
            Role::Tecnico => "tecnico",
            Role::Supervisor => "supervisor",
            Role::Administrador => "administrador",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ManutError;

    /// Parses an exact role identifier. Anything else is an
    /// [`ManutError::UnknownRole`]; there is no fallback rank.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solicitante" => Ok(Role::Solicitante),
            "tecnico" => Ok(Role::Tecnico),
            "supervisor" => Ok(Role::Supervisor),
            "administrador" => Ok(Role::Administrador),
            other => Err(ManutError::UnknownRole {
                role: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_strictly_increasing() {
        let ranks: Vec<u8> = Role::ALL.iter().map(|r| r.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn satisfies_matches_rank_comparison() {
        for a in Role::ALL {
            for b in Role::ALL {
                assert_eq!(a.satisfies(b), a.rank() >= b.rank(), "{a} vs {b}");
            }
            assert!(a.satisfies(a));
        }
    }

    #[test]
    fn parse_round_trips_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn parse_rejects_unknown_and_case_variants() {
        for bad in ["", "admin", "Administrador", "gerente", " tecnico"] {
            let err = bad.parse::<Role>().unwrap_err();
            assert!(
                matches!(err, ManutError::UnknownRole { ref role } if role == bad),
                "unexpected error for {bad:?}: {err:?}"
            );
        }
    }

    #[test]
    fn serde_uses_lowercase_identifiers() {
        let json = serde_json::to_string(&Role::Supervisor).unwrap();
        assert_eq!(json, "\"supervisor\"");
        let parsed: Role = serde_json::from_str("\"tecnico\"").unwrap();
        assert_eq!(parsed, Role::Tecnico);
    }
}
