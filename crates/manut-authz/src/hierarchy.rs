//! Role hierarchy over raw role identifiers.
//!
//! The typed [`Role`] carries the ordering; these functions accept the
//! identifiers as they arrive from identity claims and route-level
//! configuration, and reject anything outside the four defined roles
//! instead of ranking it at zero.

use manut_core::error::ManutResult;
use manut_core::models::role::Role;

/// Rank of a role identifier (1 = `solicitante` .. 4 = `administrador`).
pub fn rank(role: &str) -> ManutResult<u8> {
    Ok(role.parse::<Role>()?.rank())
}

/// `rank(user_role) >= rank(required_role)`.
pub fn satisfies(user_role: &str, required_role: &str) -> ManutResult<bool> {
    let user_role: Role = user_role.parse()?;
    let required_role: Role = required_role.parse()?;
    Ok(user_role.satisfies(required_role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use manut_core::error::ManutError;

    const ROLES: [&str; 4] = ["solicitante", "tecnico", "supervisor", "administrador"];

    #[test]
    fn ranks_follow_declaration_order() {
        for (i, role) in ROLES.iter().enumerate() {
            assert_eq!(rank(role).unwrap() as usize, i + 1);
        }
    }

    #[test]
    fn satisfies_is_rank_comparison() {
        for a in ROLES {
            for b in ROLES {
                assert_eq!(
                    satisfies(a, b).unwrap(),
                    rank(a).unwrap() >= rank(b).unwrap(),
                    "{a} vs {b}"
                );
            }
            assert!(satisfies(a, a).unwrap());
        }
    }

    #[test]
    fn unknown_roles_are_errors_on_either_side() {
        assert!(matches!(
            rank("superuser"),
            Err(ManutError::UnknownRole { .. })
        ));
        assert!(matches!(
            satisfies("superuser", "solicitante"),
            Err(ManutError::UnknownRole { .. })
        ));
        assert!(matches!(
            satisfies("administrador", ""),
            Err(ManutError::UnknownRole { .. })
        ));
    }
}
