//! Request and response bodies for the REST API.
//!
//! These are the JSON shapes exposed over HTTP and documented in the OpenAPI schema. They are
//! kept flat and string-typed; conversion to core types happens in the handlers.

use clinic_core::{queue, Patient};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRes {
    pub id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub gender: String,
    pub company: Option<String>,
    pub service: String,
    pub status: String,
    pub registered_at: String,
    pub taken_care_by: Option<String>,
    pub pending_lab_exams: usize,
    pub completed_lab_exams: usize,
}

impl From<&Patient> for PatientRes {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.to_string(),
            first_name: p.first_name.to_string(),
            last_name: p.last_name.to_string(),
            birth_date: p.birth_date.to_string(),
            gender: p.gender.to_string(),
            company: p.company.clone(),
            service: p.service.to_string(),
            status: p.status.to_string(),
            registered_at: p.registered_at.to_rfc3339(),
            taken_care_by: p.taken_care_by.as_ref().map(|a| a.name.to_string()),
            pending_lab_exams: p.pending_lab_exams.len(),
            completed_lab_exams: p.completed_lab_exams.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryRes {
    pub position: usize,
    pub wait_minutes: u64,
    pub patient: PatientRes,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueueRes {
    pub entries: Vec<QueueEntryRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsRes {
    pub medical_visit: usize,
    pub consultation: usize,
    pub emergency: usize,
    pub waiting: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatsRes {
    pub fn new(services: queue::ServiceStats, statuses: queue::StatusStats) -> Self {
        Self {
            medical_visit: services.medical_visit,
            consultation: services.consultation,
            emergency: services.emergency,
            waiting: statuses.waiting,
            in_progress: statuses.in_progress,
            done: statuses.done,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPatientReq {
    pub name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// ISO 8601 date (YYYY-MM-DD).
    pub birth_date: String,
    pub gender: String,
    pub company: Option<String>,
    /// `VM`, `Cons` or `Ug`.
    pub service: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientReq {
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddServiceReq {
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetStatusReq {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestExamReq {
    pub exam_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestExamRes {
    pub exam_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CompleteExamReq {
    pub results: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CareRes {
    pub outcome: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessRes {
    pub can_modify: bool,
    pub explanation: String,
}
