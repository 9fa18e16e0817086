//! Patient record and its workflow sub-records.
//!
//! Field names serialise in camelCase, and the service/status enums keep the short codes the
//! clinic staff use day to day (`VM`, `Cons`, `Ug`; `En attente`, `En cours`, `Terminé`), so a
//! stored patient file reads the same way the front desk talks.

use crate::actor::Actor;
use crate::uuid::{ExamId, PatientId};
use crate::NonEmptyText;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ClinicError;

/// Category of care a patient is queued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    /// Medical visit (`VM`).
    #[serde(rename = "VM")]
    MedicalVisit,
    /// Consultation (`Cons`).
    #[serde(rename = "Cons")]
    Consultation,
    /// Emergency (`Ug`).
    #[serde(rename = "Ug")]
    Emergency,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [
        ServiceType::MedicalVisit,
        ServiceType::Consultation,
        ServiceType::Emergency,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ServiceType::MedicalVisit => "VM",
            ServiceType::Consultation => "Cons",
            ServiceType::Emergency => "Ug",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ServiceType {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "VM" | "vm" => Ok(ServiceType::MedicalVisit),
            "Cons" | "cons" => Ok(ServiceType::Consultation),
            "Ug" | "ug" => Ok(ServiceType::Emergency),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown service '{other}' (expected VM, Cons or Ug)"
            ))),
        }
    }
}

/// Workflow state of a patient within the current service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientStatus {
    #[serde(rename = "En attente")]
    Waiting,
    #[serde(rename = "En cours")]
    InProgress,
    #[serde(rename = "Terminé")]
    Done,
}

impl PatientStatus {
    pub const ALL: [PatientStatus; 3] = [
        PatientStatus::Waiting,
        PatientStatus::InProgress,
        PatientStatus::Done,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PatientStatus::Waiting => "En attente",
            PatientStatus::InProgress => "En cours",
            PatientStatus::Done => "Terminé",
        }
    }

    /// Forward-only transitions. Going back to waiting happens by adding a new service.
    pub fn can_transition_to(self, next: PatientStatus) -> bool {
        use PatientStatus::*;
        matches!(
            (self, next),
            (Waiting, InProgress) | (Waiting, Done) | (InProgress, Done)
        )
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PatientStatus {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en attente" | "waiting" => Ok(PatientStatus::Waiting),
            "en cours" | "in-progress" | "in_progress" => Ok(PatientStatus::InProgress),
            "terminé" | "termine" | "done" => Ok(PatientStatus::Done),
            other => Err(ClinicError::InvalidInput(format!("unknown status '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        })
    }
}

impl FromStr for Gender {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "homme" => Ok(Gender::Male),
            "female" | "f" | "femme" => Ok(Gender::Female),
            "other" | "autre" => Ok(Gender::Other),
            other => Err(ClinicError::InvalidInput(format!("unknown gender '{other}'"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Pending,
    Completed,
}

/// A diagnostic test request attached to a patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LabExam {
    pub id: ExamId,
    #[serde(rename = "type")]
    pub exam_type: NonEmptyText,
    pub status: ExamStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<NonEmptyText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
}

/// One entry of the append-only service audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceRecord {
    pub service_type: ServiceType,
    pub date: DateTime<Utc>,
}

/// Demographic fields that can be edited after registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatientField {
    Name,
    FirstName,
    LastName,
    BirthDate,
    Gender,
    Company,
}

impl fmt::Display for PatientField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatientField::Name => "name",
            PatientField::FirstName => "firstName",
            PatientField::LastName => "lastName",
            PatientField::BirthDate => "birthDate",
            PatientField::Gender => "gender",
            PatientField::Company => "company",
        })
    }
}

/// One entry of the append-only edit audit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModificationRecord {
    pub field: PatientField,
    pub old_value: String,
    pub new_value: String,
    pub modified_by: NonEmptyText,
    pub timestamp: DateTime<Utc>,
}

/// Typed data captured while a patient goes through a service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServiceData {
    VitalSigns {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blood_pressure: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        heart_rate: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight_kg: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height_cm: Option<f32>,
    },
    WorkstationExposure {
        workstation: NonEmptyText,
        #[serde(default)]
        exposures: Vec<String>,
        #[serde(default)]
        protective_equipment: Vec<String>,
    },
    FamilyMember {
        relationship: NonEmptyText,
        employee_name: NonEmptyText,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        medical_notes: Option<String>,
    },
}

/// A patient registered at the clinic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Patient {
    pub id: PatientId,
    pub name: NonEmptyText,
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub service: ServiceType,
    pub status: PatientStatus,
    pub registered_at: DateTime<Utc>,
    /// Registration order within the store; breaks ties between equal `registered_at`.
    #[serde(default)]
    pub registration_seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_care_by: Option<Actor>,
    #[serde(default)]
    pub pending_lab_exams: Vec<LabExam>,
    #[serde(default)]
    pub completed_lab_exams: Vec<LabExam>,
    #[serde(default)]
    pub service_history: Vec<ServiceRecord>,
    #[serde(default)]
    pub modification_history: Vec<ModificationRecord>,
    #[serde(default)]
    pub service_data: Vec<ServiceData>,
}

impl Patient {
    pub fn is_waiting(&self) -> bool {
        self.status == PatientStatus::Waiting
    }

    pub fn is_emergency(&self) -> bool {
        self.service == ServiceType::Emergency
    }

    /// Calendar day (UTC) the patient was registered, used for archival grouping.
    pub fn registration_day(&self) -> NaiveDate {
        self.registered_at.date_naive()
    }

    /// Current value of an editable field, rendered for the audit log.
    pub fn field_value(&self, field: PatientField) -> String {
        match field {
            PatientField::Name => self.name.to_string(),
            PatientField::FirstName => self.first_name.to_string(),
            PatientField::LastName => self.last_name.to_string(),
            PatientField::BirthDate => self.birth_date.to_string(),
            PatientField::Gender => self.gender.to_string(),
            PatientField::Company => self.company.clone().unwrap_or_default(),
        }
    }
}

/// Registration form submitted by the front desk.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    /// Display name; derived from first and last name when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub company: Option<String>,
    pub service: ServiceType,
}

/// Demographic edits; `None` leaves a field as it is.
///
/// For `company`, `Some("")` clears the value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub company: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_codes_parse_and_display() {
        for service in ServiceType::ALL {
            let parsed: ServiceType = service.code().parse().expect("known code");
            assert_eq!(parsed, service);
        }
        assert!("XRay".parse::<ServiceType>().is_err());
    }

    #[test]
    fn status_transitions_only_move_forward() {
        use PatientStatus::*;
        assert!(Waiting.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Done));
        assert!(Waiting.can_transition_to(Done));
        assert!(!Done.can_transition_to(Waiting));
        assert!(!InProgress.can_transition_to(Waiting));
        assert!(!Done.can_transition_to(Done));
    }

    #[test]
    fn service_data_is_tagged_by_kind() {
        let data = ServiceData::WorkstationExposure {
            workstation: NonEmptyText::new("Welding bay").expect("text"),
            exposures: vec!["fumes".into()],
            protective_equipment: vec![],
        };
        let yaml = serde_yaml::to_string(&data).expect("serialise");
        assert!(yaml.contains("kind: workstationExposure"));
        assert!(yaml.contains("protectiveEquipment"));
    }
}
