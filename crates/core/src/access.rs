//! Ownership-based access policy.
//!
//! Per (patient, nurse) pair there are two states: *unclaimed* and *claimed by N*. While a
//! patient is claimed by nurse N, only N and non-nurse roles may change the record. A blocked
//! attempt is an ordinary decision returned to the caller, not an error.
//!
//! Everything here is a pure read over current data.

use crate::actor::Actor;
use crate::patient::Patient;

/// Outcome of evaluating the policy for one actor against one patient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied { claimant: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    /// Human-readable reason; empty when allowed.
    pub fn explanation(&self) -> String {
        match self {
            AccessDecision::Allowed => String::new(),
            AccessDecision::Denied { claimant } => {
                format!("Ce patient est déjà pris en charge par {claimant}")
            }
        }
    }
}

/// Evaluates the ownership rule.
pub fn decide(patient: &Patient, actor: &Actor) -> AccessDecision {
    if !actor.role.is_bound_by_claims() {
        return AccessDecision::Allowed;
    }
    match &patient.taken_care_by {
        Some(owner) if !owner.is_same_person(actor) => AccessDecision::Denied {
            claimant: owner.name.to_string(),
        },
        _ => AccessDecision::Allowed,
    }
}

pub fn can_modify(patient: &Patient, actor: &Actor) -> bool {
    decide(patient, actor).is_allowed()
}

pub fn explain(patient: &Patient, actor: &Actor) -> String {
    decide(patient, actor).explanation()
}

/// Whether `actor` may clear the current claim on `patient`.
pub fn can_release(patient: &Patient, actor: &Actor) -> bool {
    match &patient.taken_care_by {
        None => true,
        Some(owner) => owner.is_same_person(actor) || actor.role.can_override_claim(),
    }
}

/// Reason `actor` may not release the claim on `patient`; empty when release is allowed.
pub fn explain_release(patient: &Patient, actor: &Actor) -> String {
    match &patient.taken_care_by {
        Some(owner) if !can_release(patient, actor) => {
            format!("Seul {} ou un médecin/admin peut libérer ce patient", owner.name)
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::patient::{Gender, PatientStatus, ServiceType};
    use crate::uuid::PatientId;
    use crate::NonEmptyText;
    use chrono::{NaiveDate, Utc};

    fn patient_claimed_by(owner: Option<Actor>) -> Patient {
        Patient {
            id: PatientId::new(),
            name: NonEmptyText::new("Jean Dupont").unwrap(),
            first_name: NonEmptyText::new("Jean").unwrap(),
            last_name: NonEmptyText::new("Dupont").unwrap(),
            birth_date: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            gender: Gender::Male,
            company: Some("Acme".into()),
            service: ServiceType::MedicalVisit,
            status: PatientStatus::InProgress,
            registered_at: Utc::now(),
            registration_seq: 0,
            taken_care_by: owner,
            pending_lab_exams: vec![],
            completed_lab_exams: vec![],
            service_history: vec![],
            modification_history: vec![],
            service_data: vec![],
        }
    }

    fn nurse(name: &str) -> Actor {
        Actor::new(name, Role::Nurse).unwrap()
    }

    #[test]
    fn other_nurse_is_denied_once_claimed() {
        let patient = patient_claimed_by(Some(nurse("A")));

        assert!(!can_modify(&patient, &nurse("B")));
        assert_eq!(
            explain(&patient, &nurse("B")),
            "Ce patient est déjà pris en charge par A"
        );
    }

    #[test]
    fn claimant_keeps_access() {
        let patient = patient_claimed_by(Some(nurse("A")));

        assert!(can_modify(&patient, &nurse("A")));
        assert_eq!(explain(&patient, &nurse("A")), "");
    }

    #[test]
    fn non_nurse_roles_bypass_claims() {
        let patient = patient_claimed_by(Some(nurse("A")));
        for role in [Role::Doctor, Role::Secretary, Role::Admin] {
            let actor = Actor::new("Someone", role).unwrap();
            assert!(can_modify(&patient, &actor));
            assert!(explain(&patient, &actor).is_empty());
        }
    }

    #[test]
    fn unclaimed_patient_is_open_to_every_nurse() {
        let patient = patient_claimed_by(None);
        assert!(can_modify(&patient, &nurse("B")));
    }

    #[test]
    fn release_requires_claimant_or_override() {
        let patient = patient_claimed_by(Some(nurse("A")));

        assert!(can_release(&patient, &nurse("A")));
        assert!(!can_release(&patient, &nurse("B")));
        assert!(!can_release(&patient, &Actor::new("Desk", Role::Secretary).unwrap()));
        assert!(can_release(&patient, &Actor::new("Dr House", Role::Doctor).unwrap()));
    }

    #[test]
    fn release_denial_names_the_claimant() {
        let patient = patient_claimed_by(Some(nurse("A")));
        let desk = Actor::new("Desk", Role::Secretary).unwrap();

        assert_eq!(
            explain_release(&patient, &desk),
            "Seul A ou un médecin/admin peut libérer ce patient"
        );
        assert!(explain_release(&patient, &nurse("A")).is_empty());
        assert!(explain_release(&patient_claimed_by(None), &desk).is_empty());
    }
}
