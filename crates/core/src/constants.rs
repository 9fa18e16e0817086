//! Constants used throughout the clinic core crate.
//!
//! Path and filename constants live here so storage layout stays consistent across the
//! repository, the CLI and the REST server.

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "clinic_data";

/// Default clinic name used when none is configured.
pub const DEFAULT_CLINIC_NAME: &str = "clinic.dev";

/// Directory name for patient records storage.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Filename for patient YAML files.
pub const PATIENT_YAML_FILENAME: &str = "patient.yaml";

/// Resource type written at the top of every patient file.
pub const PATIENT_RESOURCE_TYPE: &str = "ClinicPatient";
