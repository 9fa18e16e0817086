//! # Clinic Core
//!
//! Core business logic for the clinic queue:
//! - [`store::PatientStore`]: owned registry of the session's patients and every mutation on them
//! - [`queue`]: pure derived views (waiting list, per-service stats, wait time)
//! - [`access`]: the nurse-ownership policy deciding who may change a patient
//! - [`repository`]: the load/save collaborator, with a sharded YAML file implementation
//!
//! **No API concerns**: HTTP servers and command line parsing belong in `api-rest` and `cli`.

pub mod access;
pub mod actor;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod patient;
pub mod queue;
pub mod repository;
pub mod store;
mod text;
mod uuid;

pub use access::{can_modify, explain, explain_release, AccessDecision};
pub use actor::{Actor, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use constants::{DEFAULT_CLINIC_NAME, DEFAULT_PATIENT_DATA_DIR};
pub use error::{ClinicError, ClinicResult};
pub use patient::{
    ExamStatus, Gender, LabExam, ModificationRecord, NewPatient, Patient, PatientChanges,
    PatientField, PatientStatus, ServiceData, ServiceRecord, ServiceType,
};
pub use repository::{FileRepository, PatientFile, PatientRepository};
pub use store::{CareOutcome, PatientStore};
pub use text::NonEmptyText;
pub use self::uuid::{ExamId, PatientId, RecordId};
