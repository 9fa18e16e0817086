//! Persistence collaborator.
//!
//! The store itself holds no durable state. A [`PatientRepository`] loads the day's patients
//! and saves individual records after they change; the core treats it as opaque.
//!
//! ## Storage Layout
//!
//! [`FileRepository`] keeps one YAML file per patient in a sharded structure:
//!
//! ```text
//! patients/
//!   <s1>/
//!     <s2>/
//!       <id>/
//!         patient.yaml
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the patient id.

use crate::config::CoreConfig;
use crate::constants::{PATIENT_RESOURCE_TYPE, PATIENT_YAML_FILENAME};
use crate::error::{ClinicError, ClinicResult};
use crate::patient::Patient;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load/save interface the store consumes.
pub trait PatientRepository: Send + Sync {
    /// Every stored patient, oldest registration first.
    fn load_patients(&self) -> ClinicResult<Vec<Patient>>;

    fn save_patient(&self, patient: &Patient) -> ClinicResult<()>;
}

/// On-disk wrapper around a patient record.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct PatientFileWire {
    #[serde(rename = "resourceType")]
    resource_type: String,
    patient: Patient,
}

/// Patient file parse/render operations.
pub struct PatientFile;

impl PatientFile {
    pub const NAME: &'static str = PATIENT_YAML_FILENAME;

    /// Parse a patient file from YAML text.
    ///
    /// Schema mismatches report the path of the failing field (e.g. `patient.status`).
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::Translation`] if the YAML does not match the schema and
    /// [`ClinicError::InvalidInput`] if `resourceType` is wrong.
    pub fn parse(yaml_text: &str) -> ClinicResult<Patient> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, PatientFileWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(ClinicError::Translation(format!(
                    "patient schema mismatch at {path}: {source}"
                )));
            }
        };

        if wire.resource_type != PATIENT_RESOURCE_TYPE {
            return Err(ClinicError::InvalidInput(format!(
                "expected resourceType '{PATIENT_RESOURCE_TYPE}', got '{}'",
                wire.resource_type
            )));
        }

        Ok(wire.patient)
    }

    pub fn render(patient: &Patient) -> ClinicResult<String> {
        let wire = PatientFileWire {
            resource_type: PATIENT_RESOURCE_TYPE.to_string(),
            patient: patient.clone(),
        };
        serde_yaml::to_string(&wire).map_err(ClinicError::YamlSerialization)
    }
}

/// Sharded YAML files under the configured patient data directory.
#[derive(Clone, Debug)]
pub struct FileRepository {
    cfg: Arc<CoreConfig>,
}

impl FileRepository {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    fn patient_path(&self, patient: &Patient) -> PathBuf {
        patient
            .id
            .sharded_dir(&self.cfg.patients_dir())
            .join(PatientFile::NAME)
    }

    fn read_patient(path: &Path) -> ClinicResult<Patient> {
        let contents = fs::read_to_string(path).map_err(ClinicError::FileRead)?;
        PatientFile::parse(&contents)
    }
}

impl PatientRepository for FileRepository {
    fn load_patients(&self) -> ClinicResult<Vec<Patient>> {
        let patients_dir = self.cfg.patients_dir();
        let mut patients = Vec::new();

        let s1_iter = match fs::read_dir(&patients_dir) {
            Ok(it) => it,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(patients),
            Err(e) => return Err(ClinicError::FileRead(e)),
        };

        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }
            let Ok(s2_iter) = fs::read_dir(&s1_path) else {
                continue;
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }
                let Ok(id_iter) = fs::read_dir(&s2_path) else {
                    continue;
                };

                for id_ent in id_iter.flatten() {
                    let patient_path = id_ent.path().join(PatientFile::NAME);
                    if !patient_path.is_file() {
                        continue;
                    }

                    match Self::read_patient(&patient_path) {
                        Ok(patient) => patients.push(patient),
                        Err(e) => {
                            tracing::warn!(
                                "failed to load {}: {}",
                                patient_path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        patients.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.registration_seq.cmp(&b.registration_seq))
                .then_with(|| a.id.cmp(&b.id))
        });
        tracing::debug!(count = patients.len(), "loaded patients");
        Ok(patients)
    }

    fn save_patient(&self, patient: &Patient) -> ClinicResult<()> {
        let path = self.patient_path(patient);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(ClinicError::PatientDirCreation)?;
        }

        let yaml = PatientFile::render(patient)?;
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(ClinicError::FileWrite)?;
        fs::rename(&tmp, &path).map_err(ClinicError::FileWrite)?;

        tracing::debug!(patient_id = %patient.id, "saved patient");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{Gender, PatientStatus, ServiceRecord, ServiceType};
    use crate::uuid::PatientId;
    use crate::NonEmptyText;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn test_cfg(dir: &Path) -> Arc<CoreConfig> {
        Arc::new(CoreConfig::new(dir.to_path_buf(), "clinic.test".into()).unwrap())
    }

    fn sample(last_name: &str, minutes: i64) -> Patient {
        let registered_at = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
            + Duration::minutes(minutes);
        Patient {
            id: PatientId::new(),
            name: NonEmptyText::new(format!("Anne {last_name}")).unwrap(),
            first_name: NonEmptyText::new("Anne").unwrap(),
            last_name: NonEmptyText::new(last_name).unwrap(),
            birth_date: NaiveDate::from_ymd_opt(1990, 6, 1).unwrap(),
            gender: Gender::Female,
            company: None,
            service: ServiceType::Consultation,
            status: PatientStatus::Waiting,
            registered_at,
            registration_seq: 0,
            taken_care_by: None,
            pending_lab_exams: vec![],
            completed_lab_exams: vec![],
            service_history: vec![ServiceRecord {
                service_type: ServiceType::Consultation,
                date: registered_at,
            }],
            modification_history: vec![],
            service_data: vec![],
        }
    }

    #[test]
    fn saved_patients_load_back_in_registration_order() {
        let tmp = TempDir::new().expect("tempdir");
        let repo = FileRepository::new(test_cfg(tmp.path()));

        let later = sample("Later", 10);
        let earlier = sample("Earlier", 0);
        repo.save_patient(&later).expect("save later");
        repo.save_patient(&earlier).expect("save earlier");

        let loaded = repo.load_patients().expect("load");
        assert_eq!(loaded, vec![earlier, later]);
    }

    #[test]
    fn simultaneous_registrations_reload_in_registration_order() {
        let tmp = TempDir::new().expect("tempdir");
        let repo = FileRepository::new(test_cfg(tmp.path()));

        let mut pair = [sample("One", 0), sample("Two", 0)];
        pair.sort_by(|a, b| b.id.cmp(&a.id));
        pair[0].registration_seq = 1;
        pair[1].registration_seq = 2;
        for patient in pair.iter().rev() {
            repo.save_patient(patient).expect("save");
        }

        let loaded = repo.load_patients().expect("load");
        assert_eq!(loaded, pair.to_vec());
    }

    #[test]
    fn missing_data_dir_loads_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let repo = FileRepository::new(test_cfg(&tmp.path().join("absent")));
        assert!(repo.load_patients().expect("load").is_empty());
    }

    #[test]
    fn corrupt_files_are_skipped() {
        let tmp = TempDir::new().expect("tempdir");
        let cfg = test_cfg(tmp.path());
        let repo = FileRepository::new(cfg.clone());
        let good = sample("Good", 0);
        repo.save_patient(&good).expect("save");

        let bad_dir = PatientId::new().sharded_dir(&cfg.patients_dir());
        fs::create_dir_all(&bad_dir).unwrap();
        fs::write(bad_dir.join(PatientFile::NAME), "resourceType: ClinicPatient\n").unwrap();

        let loaded = repo.load_patients().expect("load");
        assert_eq!(loaded, vec![good]);
    }

    #[test]
    fn parse_reports_failing_field_path() {
        let yaml = PatientFile::render(&sample("Path", 0))
            .unwrap()
            .replace("status: En attente", "status: Unknown");

        let err = PatientFile::parse(&yaml).expect_err("bad status");
        match err {
            ClinicError::Translation(msg) => assert!(msg.contains("patient.status"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_wrong_resource_type() {
        let yaml = PatientFile::render(&sample("Type", 0))
            .unwrap()
            .replace("resourceType: ClinicPatient", "resourceType: Invoice");

        let err = PatientFile::parse(&yaml).expect_err("wrong type");
        assert!(matches!(err, ClinicError::InvalidInput(msg) if msg.contains("Invoice")));
    }
}
