//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_CLINIC_NAME, DEFAULT_PATIENT_DATA_DIR, PATIENTS_DIR_NAME};
use crate::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    clinic_name: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(patient_data_dir: PathBuf, clinic_name: String) -> ClinicResult<Self> {
        if clinic_name.trim().is_empty() {
            return Err(ClinicError::InvalidInput(
                "clinic_name cannot be empty".into(),
            ));
        }

        Ok(Self {
            patient_data_dir,
            clinic_name: clinic_name.trim().to_string(),
        })
    }

    /// Build a configuration from optional raw values (typically environment variables),
    /// falling back to the defaults for anything missing or blank.
    pub fn from_values(
        patient_data_dir: Option<String>,
        clinic_name: Option<String>,
    ) -> ClinicResult<Self> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let dir = non_blank(patient_data_dir).unwrap_or_else(|| DEFAULT_PATIENT_DATA_DIR.into());
        let name = non_blank(clinic_name).unwrap_or_else(|| DEFAULT_CLINIC_NAME.into());
        Self::new(PathBuf::from(dir), name)
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.patient_data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn clinic_name(&self) -> &str {
        &self.clinic_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_clinic_name() {
        let err = CoreConfig::new(PathBuf::from("data"), "   ".into())
            .expect_err("blank name should fail");
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn from_values_falls_back_to_defaults() {
        let cfg = CoreConfig::from_values(None, Some(" ".into())).expect("defaults are valid");
        assert_eq!(cfg.patient_data_dir(), Path::new(DEFAULT_PATIENT_DATA_DIR));
        assert_eq!(cfg.clinic_name(), DEFAULT_CLINIC_NAME);
        assert_eq!(
            cfg.patients_dir(),
            Path::new(DEFAULT_PATIENT_DATA_DIR).join(PATIENTS_DIR_NAME)
        );
    }
}
