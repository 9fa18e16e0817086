//! Error taxonomy for the clinic core.
//!
//! A nurse blocked by another nurse's claim is not an error. That outcome is reported through
//! [`crate::access`] and [`crate::store::CareOutcome`].

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("patient not found: {0}")]
    NotFound(String),
    #[error("lab exam {exam_id} not pending for patient {patient_id}")]
    ExamNotFound {
        patient_id: String,
        exam_id: String,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to create patient directory: {0}")]
    PatientDirCreation(std::io::Error),
    #[error("failed to write patient file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read patient file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("translation error: {0}")]
    Translation(String),
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
