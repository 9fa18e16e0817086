//! Staff identity and role capabilities.
//!
//! The authentication provider supplies `{name, role}` for the current user; everything the core
//! needs to know about that user is captured by [`Actor`]. Roles form a closed set, and every
//! role-dependent decision goes through a capability method on [`Role`] instead of comparing
//! role strings at call sites.

use crate::error::{ClinicError, ClinicResult};
use crate::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Professional role of a staff member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Secretary,
    Nurse,
    Doctor,
    Admin,
}

impl Role {
    /// Nurses are bound by another nurse's claim on a patient; other roles are not.
    pub fn is_bound_by_claims(self) -> bool {
        matches!(self, Role::Nurse)
    }

    /// Only nurses record a `takenCareBy` claim when taking charge of a patient.
    pub fn can_claim(self) -> bool {
        matches!(self, Role::Nurse)
    }

    /// Roles allowed to release a claim held by somebody else.
    pub fn can_override_claim(self) -> bool {
        matches!(self, Role::Doctor | Role::Admin)
    }

    fn as_str(self) -> &'static str {
        match self {
            Role::Secretary => "secretary",
            Role::Nurse => "nurse",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secretary" | "secretaire" => Ok(Role::Secretary),
            "nurse" | "infirmier" | "infirmiere" => Ok(Role::Nurse),
            "doctor" | "medecin" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(ClinicError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

/// A staff member acting on the store, or recorded as the owner of a patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: NonEmptyText,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl AsRef<str>, role: Role) -> ClinicResult<Self> {
        Ok(Self {
            name: NonEmptyText::field("actor name", name)?,
            role,
        })
    }

    /// Parses the `{name, role}` pair handed over by the authentication provider.
    pub fn from_parts(name: &str, role: &str) -> ClinicResult<Self> {
        Self::new(name, role.parse()?)
    }

    /// Staff members are matched by name; the provider guarantees names are unique.
    pub fn is_same_person(&self, other: &Actor) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roles_case_insensitively() {
        assert_eq!("Nurse".parse::<Role>().expect("role"), Role::Nurse);
        assert_eq!(" DOCTOR ".parse::<Role>().expect("role"), Role::Doctor);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn only_nurses_are_bound_by_claims() {
        assert!(Role::Nurse.is_bound_by_claims());
        assert!(!Role::Doctor.is_bound_by_claims());
        assert!(!Role::Secretary.is_bound_by_claims());
        assert!(!Role::Admin.is_bound_by_claims());
    }

    #[test]
    fn actor_requires_a_name() {
        let err = Actor::from_parts("  ", "nurse").expect_err("blank name");
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }
}
