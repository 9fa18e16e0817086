//! Patient store: the single owner of a session's patient records.
//!
//! A [`PatientStore`] is an ordinary value. Callers create one per operational day or session
//! and pass it where it is needed; nothing about it is global.
//!
//! Every mutating operation validates its input completely before touching the record, so a
//! rejected call leaves the store exactly as it was and no reader can observe a half-applied
//! change.

use crate::access::{self, AccessDecision};
use crate::actor::Actor;
use crate::clock::{Clock, SystemClock};
use crate::error::{ClinicError, ClinicResult};
use crate::patient::{
    ExamStatus, LabExam, ModificationRecord, NewPatient, Patient, PatientChanges, PatientField,
    PatientStatus, ServiceData, ServiceRecord, ServiceType,
};
use crate::repository::PatientRepository;
use crate::uuid::{ExamId, PatientId};
use crate::NonEmptyText;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a care-taking request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CareOutcome {
    /// The nurse now holds the claim.
    Claimed,
    /// The nurse already held the claim; nothing changed.
    AlreadyOwned,
    /// A non-nurse role took charge; the patient is in progress but unclaimed.
    Started,
    /// The claim was cleared.
    Released,
    /// Blocked by another nurse's claim.
    Denied { explanation: String },
}

impl CareOutcome {
    pub fn is_denied(&self) -> bool {
        matches!(self, CareOutcome::Denied { .. })
    }
}

pub struct PatientStore {
    patients: Vec<Patient>,
    index: HashMap<PatientId, usize>,
    next_seq: u64,
    clock: Arc<dyn Clock>,
}

impl Default for PatientStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientStore")
            .field("patients", &self.patients.len())
            .finish()
    }
}

impl PatientStore {
    /// An empty store on wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            patients: Vec::new(),
            index: HashMap::new(),
            next_seq: 1,
            clock,
        }
    }

    /// Seeds the store from already-loaded records, keeping their order.
    ///
    /// A record whose id was already seen is skipped with a warning.
    pub fn from_patients(patients: Vec<Patient>, clock: Arc<dyn Clock>) -> Self {
        let mut store = Self::with_clock(clock);
        for patient in patients {
            if store.index.contains_key(&patient.id) {
                tracing::warn!(patient_id = %patient.id, "duplicate patient record skipped");
                continue;
            }
            store.insert(patient);
        }
        store
    }

    /// Loads every patient from `repository`.
    pub fn load(repository: &dyn PatientRepository, clock: Arc<dyn Clock>) -> ClinicResult<Self> {
        let patients = repository.load_patients()?;
        Ok(Self::from_patients(patients, clock))
    }

    /// Writes one patient back through `repository`.
    pub fn save(&self, id: &PatientId, repository: &dyn PatientRepository) -> ClinicResult<()> {
        repository.save_patient(self.get(id)?)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Snapshot of every patient in insertion order.
    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn get(&self, id: &PatientId) -> ClinicResult<&Patient> {
        self.index
            .get(id)
            .map(|&i| &self.patients[i])
            .ok_or_else(|| ClinicError::NotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &PatientId) -> ClinicResult<&mut Patient> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.patients[i]),
            None => Err(ClinicError::NotFound(id.to_string())),
        }
    }

    fn insert(&mut self, patient: Patient) -> &Patient {
        let position = self.patients.len();
        self.next_seq = self.next_seq.max(patient.registration_seq + 1);
        self.index.insert(patient.id, position);
        self.patients.push(patient);
        &self.patients[position]
    }

    /// Puts back a previously taken copy of a record, undoing any change made since.
    ///
    /// A record that is no longer present is inserted again.
    pub fn restore(&mut self, snapshot: Patient) {
        match self.index.get(&snapshot.id) {
            Some(&i) => self.patients[i] = snapshot,
            None => {
                self.insert(snapshot);
            }
        }
    }

    /// Drops a record entirely, e.g. a registration whose save failed.
    pub fn discard(&mut self, id: &PatientId) -> Option<Patient> {
        let position = self.index.remove(id)?;
        let removed = self.patients.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Registers a new patient, queued as waiting for `data.service`.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::InvalidInput`] if a required demographic field is blank or the
    /// birth date lies in the future.
    pub fn register_patient(&mut self, data: NewPatient) -> ClinicResult<&Patient> {
        let now = self.now();
        let first_name = NonEmptyText::field("firstName", &data.first_name)?;
        let last_name = NonEmptyText::field("lastName", &data.last_name)?;
        let name = match data.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => NonEmptyText::new(name)?,
            _ => derived_name(&first_name, &last_name)?,
        };
        check_birth_date(data.birth_date, now)?;

        let patient = Patient {
            id: PatientId::new(),
            name,
            first_name,
            last_name,
            birth_date: data.birth_date,
            gender: data.gender,
            company: normalise_company(data.company),
            service: data.service,
            status: PatientStatus::Waiting,
            registered_at: now,
            registration_seq: self.next_seq,
            taken_care_by: None,
            pending_lab_exams: Vec::new(),
            completed_lab_exams: Vec::new(),
            service_history: vec![ServiceRecord {
                service_type: data.service,
                date: now,
            }],
            modification_history: Vec::new(),
            service_data: Vec::new(),
        };

        tracing::info!(patient_id = %patient.id, service = %patient.service, "patient registered");
        Ok(self.insert(patient))
    }

    /// Queues an existing patient for another service.
    ///
    /// The patient returns to waiting and the service is appended to its history. Any claim
    /// already held on the patient is kept.
    pub fn add_service_to_existing_patient(
        &mut self,
        id: &PatientId,
        service: ServiceType,
    ) -> ClinicResult<&Patient> {
        let now = self.now();
        let patient = self.get_mut(id)?;
        // History never predates registration, even if the clock stepped back.
        let date = now.max(patient.registered_at);

        patient.service = service;
        patient.status = PatientStatus::Waiting;
        patient.service_history.push(ServiceRecord {
            service_type: service,
            date,
        });

        tracing::debug!(patient_id = %id, service = %service, "service added");
        Ok(&*patient)
    }

    /// Applies demographic edits, recording one audit entry per field that actually changes.
    ///
    /// Ownership is not checked here; callers consult [`crate::access`] first.
    pub fn update_patient(
        &mut self,
        id: &PatientId,
        changes: PatientChanges,
        actor: &Actor,
    ) -> ClinicResult<&Patient> {
        let now = self.now();
        let current = self.get(id)?;

        let first_name = match changes.first_name {
            Some(v) => NonEmptyText::field("firstName", v)?,
            None => current.first_name.clone(),
        };
        let last_name = match changes.last_name {
            Some(v) => NonEmptyText::field("lastName", v)?,
            None => current.last_name.clone(),
        };
        let name = match changes.name {
            Some(v) => NonEmptyText::field("name", v)?,
            None => {
                // A display name that was derived follows renames; a custom one stays.
                let was_derived =
                    derived_name(&current.first_name, &current.last_name)? == current.name;
                if was_derived {
                    derived_name(&first_name, &last_name)?
                } else {
                    current.name.clone()
                }
            }
        };
        let birth_date = changes.birth_date.unwrap_or(current.birth_date);
        check_birth_date(birth_date, now)?;
        let gender = changes.gender.unwrap_or(current.gender);
        let company = match changes.company {
            Some(v) => normalise_company(Some(v)),
            None => current.company.clone(),
        };

        let mut updated = current.clone();
        updated.name = name;
        updated.first_name = first_name;
        updated.last_name = last_name;
        updated.birth_date = birth_date;
        updated.gender = gender;
        updated.company = company;

        let fields = [
            PatientField::Name,
            PatientField::FirstName,
            PatientField::LastName,
            PatientField::BirthDate,
            PatientField::Gender,
            PatientField::Company,
        ];
        for field in fields {
            let old_value = current.field_value(field);
            let new_value = updated.field_value(field);
            if old_value != new_value {
                updated.modification_history.push(ModificationRecord {
                    field,
                    old_value,
                    new_value,
                    modified_by: actor.name.clone(),
                    timestamp: now,
                });
            }
        }

        let recorded = updated.modification_history.len() - current.modification_history.len();
        tracing::debug!(patient_id = %id, actor = %actor.name, recorded, "patient updated");

        let patient = self.get_mut(id)?;
        *patient = updated;
        Ok(&*patient)
    }

    /// Takes charge of a patient.
    ///
    /// A nurse claims an unclaimed patient; another nurse's claim yields
    /// [`CareOutcome::Denied`]. Other roles move the patient to in progress without claiming.
    pub fn take_care(&mut self, id: &PatientId, actor: &Actor) -> ClinicResult<CareOutcome> {
        let patient = self.get_mut(id)?;

        if let AccessDecision::Denied { .. } = access::decide(patient, actor) {
            let explanation = access::explain(patient, actor);
            tracing::info!(patient_id = %id, actor = %actor.name, "care claim denied");
            return Ok(CareOutcome::Denied { explanation });
        }

        if patient.status == PatientStatus::Waiting {
            patient.status = PatientStatus::InProgress;
        }

        if !actor.role.can_claim() {
            return Ok(CareOutcome::Started);
        }
        if patient.taken_care_by.is_some() {
            return Ok(CareOutcome::AlreadyOwned);
        }

        patient.taken_care_by = Some(actor.clone());
        tracing::info!(patient_id = %id, nurse = %actor.name, "patient claimed");
        Ok(CareOutcome::Claimed)
    }

    /// Clears the claim on a patient. Only the claimant or an overriding role may do so.
    pub fn release_care(&mut self, id: &PatientId, actor: &Actor) -> ClinicResult<CareOutcome> {
        let patient = self.get_mut(id)?;

        if !access::can_release(patient, actor) {
            tracing::info!(patient_id = %id, actor = %actor.name, "claim release denied");
            return Ok(CareOutcome::Denied {
                explanation: access::explain_release(patient, actor),
            });
        }

        if let Some(previous) = patient.taken_care_by.take() {
            tracing::info!(
                patient_id = %id,
                released_from = %previous.name,
                actor = %actor.name,
                "claim released"
            );
        }
        Ok(CareOutcome::Released)
    }

    /// Moves a patient forward through its workflow.
    pub fn set_status(&mut self, id: &PatientId, status: PatientStatus) -> ClinicResult<&Patient> {
        let patient = self.get_mut(id)?;

        if !patient.status.can_transition_to(status) {
            return Err(ClinicError::InvalidInput(format!(
                "cannot move patient from '{}' to '{}'",
                patient.status, status
            )));
        }

        patient.status = status;
        tracing::debug!(patient_id = %id, status = %status, "status changed");
        Ok(&*patient)
    }

    /// Requests a lab exam; it starts out pending.
    pub fn request_lab_exam(&mut self, id: &PatientId, exam_type: &str) -> ClinicResult<ExamId> {
        let now = self.now();
        let exam_type = NonEmptyText::field("exam type", exam_type)?;
        let patient = self.get_mut(id)?;

        let exam = LabExam {
            id: ExamId::new(),
            exam_type,
            status: ExamStatus::Pending,
            requested_at: now,
            completed_at: None,
            completed_by: None,
            results: None,
        };
        let exam_id = exam.id;
        patient.pending_lab_exams.push(exam);

        tracing::debug!(patient_id = %id, exam_id = %exam_id, "lab exam requested");
        Ok(exam_id)
    }

    /// Moves one pending exam to the completed list.
    ///
    /// # Errors
    ///
    /// [`ClinicError::ExamNotFound`] when `exam_id` is not pending for this patient, which
    /// includes exams that were already completed.
    pub fn complete_lab_exam(
        &mut self,
        id: &PatientId,
        exam_id: &ExamId,
        actor: &Actor,
        results: Option<String>,
    ) -> ClinicResult<&LabExam> {
        let now = self.now();
        let patient = self.get_mut(id)?;

        let position = patient
            .pending_lab_exams
            .iter()
            .position(|exam| exam.id == *exam_id)
            .ok_or_else(|| ClinicError::ExamNotFound {
                patient_id: id.to_string(),
                exam_id: exam_id.to_string(),
            })?;

        let mut exam = patient.pending_lab_exams.remove(position);
        exam.status = ExamStatus::Completed;
        exam.completed_at = Some(now);
        exam.completed_by = Some(actor.name.clone());
        exam.results = results.filter(|r| !r.trim().is_empty());
        patient.completed_lab_exams.push(exam);

        tracing::debug!(patient_id = %id, exam_id = %exam_id, "lab exam completed");
        let last = patient.completed_lab_exams.len() - 1;
        Ok(&patient.completed_lab_exams[last])
    }

    /// Attaches service data captured during a visit.
    pub fn record_service_data(
        &mut self,
        id: &PatientId,
        data: ServiceData,
    ) -> ClinicResult<&Patient> {
        if let ServiceData::VitalSigns {
            blood_pressure: None,
            heart_rate: None,
            temperature: None,
            weight_kg: None,
            height_cm: None,
        } = &data
        {
            return Err(ClinicError::InvalidInput(
                "vital signs must contain at least one measurement".into(),
            ));
        }

        let patient = self.get_mut(id)?;
        patient.service_data.push(data);
        Ok(&*patient)
    }
}

fn derived_name(first_name: &NonEmptyText, last_name: &NonEmptyText) -> ClinicResult<NonEmptyText> {
    NonEmptyText::new(format!("{first_name} {last_name}"))
}

fn check_birth_date(birth_date: NaiveDate, now: DateTime<Utc>) -> ClinicResult<()> {
    if birth_date > now.date_naive() {
        return Err(ClinicError::InvalidInput(format!(
            "birthDate {birth_date} is in the future"
        )));
    }
    Ok(())
}

fn normalise_company(company: Option<String>) -> Option<String> {
    company
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::clock::ManualClock;
    use crate::patient::Gender;
    use crate::queue;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn store_at(start: DateTime<Utc>) -> (PatientStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        (PatientStore::with_clock(clock.clone()), clock)
    }

    fn new_patient(last_name: &str, service: ServiceType) -> NewPatient {
        NewPatient {
            name: None,
            first_name: "Marie".into(),
            last_name: last_name.into(),
            birth_date: NaiveDate::from_ymd_opt(1985, 4, 12).unwrap(),
            gender: Gender::Female,
            company: Some("Acme".into()),
            service,
        }
    }

    fn nurse(name: &str) -> Actor {
        Actor::new(name, Role::Nurse).unwrap()
    }

    #[test]
    fn register_assigns_id_timestamp_and_history() {
        let (mut store, _clock) = store_at(t0());

        let patient = store
            .register_patient(new_patient("Curie", ServiceType::MedicalVisit))
            .expect("register");

        assert_eq!(patient.name.as_str(), "Marie Curie");
        assert_eq!(patient.status, PatientStatus::Waiting);
        assert_eq!(patient.registered_at, t0());
        assert_eq!(
            patient.service_history,
            vec![ServiceRecord {
                service_type: ServiceType::MedicalVisit,
                date: t0()
            }]
        );
    }

    #[test]
    fn register_rejects_missing_names_and_future_birth_dates() {
        let (mut store, _clock) = store_at(t0());

        let mut blank = new_patient("  ", ServiceType::Consultation);
        let err = store.register_patient(blank.clone()).expect_err("blank last name");
        assert!(matches!(err, ClinicError::InvalidInput(msg) if msg.contains("lastName")));

        blank.last_name = "Valid".into();
        blank.birth_date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(store.register_patient(blank).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn emergency_registered_later_is_served_first() {
        let (mut store, clock) = store_at(t0() - Duration::minutes(5));
        store
            .register_patient(new_patient("Early", ServiceType::Consultation))
            .unwrap();
        clock.set(t0());
        store
            .register_patient(new_patient("Urgent", ServiceType::Emergency))
            .unwrap();

        let list = queue::waiting_list(store.patients());
        assert_eq!(list[0].last_name.as_str(), "Urgent");
        assert_eq!(list[1].last_name.as_str(), "Early");
    }

    #[test]
    fn add_service_requeues_and_appends_history() {
        let (mut store, clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Pasteur", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        store.set_status(&id, PatientStatus::Done).unwrap();

        clock.advance(Duration::minutes(40));
        let patient = store
            .add_service_to_existing_patient(&id, ServiceType::Consultation)
            .expect("add service");

        assert_eq!(patient.service, ServiceType::Consultation);
        assert_eq!(patient.status, PatientStatus::Waiting);
        assert_eq!(patient.service_history.len(), 2);
        assert_eq!(patient.service_history[1].date, t0() + Duration::minutes(40));
        assert!(patient
            .service_history
            .iter()
            .all(|entry| entry.date >= patient.registered_at));
    }

    #[test]
    fn add_service_to_unknown_patient_is_not_found() {
        let (mut store, _clock) = store_at(t0());
        let err = store
            .add_service_to_existing_patient(&PatientId::new(), ServiceType::Emergency)
            .expect_err("unknown id");
        assert!(matches!(err, ClinicError::NotFound(_)));
    }

    #[test]
    fn company_edit_is_audited_once() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Lovelace", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        let secretary = Actor::new("Desk", Role::Secretary).unwrap();

        let changes = PatientChanges {
            company: Some("Globex".into()),
            gender: Some(Gender::Female),
            ..Default::default()
        };
        let patient = store.update_patient(&id, changes, &secretary).expect("update");

        assert_eq!(patient.company.as_deref(), Some("Globex"));
        assert_eq!(patient.modification_history.len(), 1);
        let entry = &patient.modification_history[0];
        assert_eq!(entry.field, PatientField::Company);
        assert_eq!(entry.old_value, "Acme");
        assert_eq!(entry.new_value, "Globex");
        assert_eq!(entry.modified_by.as_str(), "Desk");
        assert_eq!(entry.timestamp, t0());
    }

    #[test]
    fn renaming_follows_derived_display_name() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Germain", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        let doctor = Actor::new("Dr Roux", Role::Doctor).unwrap();

        let changes = PatientChanges {
            last_name: Some("Noether".into()),
            ..Default::default()
        };
        let patient = store.update_patient(&id, changes, &doctor).unwrap();

        assert_eq!(patient.name.as_str(), "Marie Noether");
        let fields: Vec<_> = patient.modification_history.iter().map(|m| m.field).collect();
        assert_eq!(fields, vec![PatientField::Name, PatientField::LastName]);
    }

    #[test]
    fn rejected_update_leaves_record_untouched() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Bohr", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        let before = store.get(&id).unwrap().clone();

        let changes = PatientChanges {
            company: Some("Initech".into()),
            first_name: Some("   ".into()),
            ..Default::default()
        };
        let err = store
            .update_patient(&id, changes, &nurse("A"))
            .expect_err("blank first name");

        assert!(matches!(err, ClinicError::InvalidInput(_)));
        assert_eq!(store.get(&id).unwrap(), &before);
    }

    #[test]
    fn nurse_claim_blocks_other_nurses() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Fleming", ServiceType::Emergency))
            .unwrap()
            .id;

        assert_eq!(store.take_care(&id, &nurse("A")).unwrap(), CareOutcome::Claimed);
        assert_eq!(store.get(&id).unwrap().status, PatientStatus::InProgress);
        assert_eq!(
            store.take_care(&id, &nurse("A")).unwrap(),
            CareOutcome::AlreadyOwned
        );

        let outcome = store.take_care(&id, &nurse("B")).unwrap();
        assert!(outcome.is_denied());
        assert_eq!(
            store.get(&id).unwrap().taken_care_by.as_ref().unwrap().name.as_str(),
            "A"
        );
    }

    #[test]
    fn doctor_starts_care_without_claiming() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Harvey", ServiceType::Consultation))
            .unwrap()
            .id;

        let doctor = Actor::new("Dr Roux", Role::Doctor).unwrap();
        assert_eq!(store.take_care(&id, &doctor).unwrap(), CareOutcome::Started);
        let patient = store.get(&id).unwrap();
        assert_eq!(patient.status, PatientStatus::InProgress);
        assert!(patient.taken_care_by.is_none());
    }

    #[test]
    fn only_claimant_or_override_releases() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Snow", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        store.take_care(&id, &nurse("A")).unwrap();

        assert!(store.release_care(&id, &nurse("B")).unwrap().is_denied());
        let admin = Actor::new("Chief", Role::Admin).unwrap();
        assert_eq!(store.release_care(&id, &admin).unwrap(), CareOutcome::Released);
        assert!(store.get(&id).unwrap().taken_care_by.is_none());
        assert_eq!(store.take_care(&id, &nurse("B")).unwrap(), CareOutcome::Claimed);
    }

    #[test]
    fn release_denial_explains_who_may_release() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Nightingale", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        store.take_care(&id, &nurse("A")).unwrap();

        let desk = Actor::new("Desk", Role::Secretary).unwrap();
        match store.release_care(&id, &desk).unwrap() {
            CareOutcome::Denied { explanation } => assert_eq!(
                explanation,
                "Seul A ou un médecin/admin peut libérer ce patient"
            ),
            other => panic!("expected denial, got {other:?}"),
        }
        assert!(store.get(&id).unwrap().taken_care_by.is_some());
    }

    #[test]
    fn service_history_never_predates_registration() {
        let (mut store, clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Skew", ServiceType::MedicalVisit))
            .unwrap()
            .id;

        clock.set(t0() - Duration::minutes(3));
        let patient = store
            .add_service_to_existing_patient(&id, ServiceType::Emergency)
            .unwrap();

        assert_eq!(patient.service_history[1].date, t0());
        assert!(patient
            .service_history
            .iter()
            .all(|entry| entry.date >= patient.registered_at));
    }

    #[test]
    fn restore_and_discard_undo_changes() {
        let (mut store, _clock) = store_at(t0());
        let first = store
            .register_patient(new_patient("First", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        let second = store
            .register_patient(new_patient("Second", ServiceType::Consultation))
            .unwrap()
            .id;

        let before = store.get(&first).unwrap().clone();
        store.set_status(&first, PatientStatus::Done).unwrap();
        store.restore(before.clone());
        assert_eq!(store.get(&first).unwrap(), &before);

        let removed = store.discard(&first).expect("present");
        assert_eq!(removed.id, first);
        assert_eq!(store.len(), 1);
        assert!(matches!(store.get(&first), Err(ClinicError::NotFound(_))));
        assert_eq!(store.get(&second).unwrap().last_name.as_str(), "Second");
        assert!(store.discard(&first).is_none());
    }

    #[test]
    fn backwards_status_change_is_rejected() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Koch", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        store.set_status(&id, PatientStatus::InProgress).unwrap();
        store.set_status(&id, PatientStatus::Done).unwrap();

        let err = store
            .set_status(&id, PatientStatus::InProgress)
            .expect_err("backwards");
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn completing_one_of_two_exams_moves_it_once() {
        let (mut store, clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Lister", ServiceType::MedicalVisit))
            .unwrap()
            .id;
        let blood = store.request_lab_exam(&id, "NFS").unwrap();
        let urine = store.request_lab_exam(&id, "ECBU").unwrap();

        clock.advance(Duration::minutes(30));
        let lab = nurse("Lab");
        let exam = store
            .complete_lab_exam(&id, &blood, &lab, Some("normal".into()))
            .expect("complete");
        assert_eq!(exam.status, ExamStatus::Completed);
        assert_eq!(exam.completed_at, Some(t0() + Duration::minutes(30)));

        let patient = store.get(&id).unwrap();
        assert_eq!(patient.pending_lab_exams.len(), 1);
        assert_eq!(patient.completed_lab_exams.len(), 1);
        assert_eq!(patient.pending_lab_exams[0].id, urine);
        assert!(patient.pending_lab_exams.iter().all(|e| e.id != blood));

        let err = store
            .complete_lab_exam(&id, &blood, &lab, None)
            .expect_err("already completed");
        assert!(matches!(err, ClinicError::ExamNotFound { .. }));
    }

    #[test]
    fn empty_vital_signs_are_rejected() {
        let (mut store, _clock) = store_at(t0());
        let id = store
            .register_patient(new_patient("Osler", ServiceType::MedicalVisit))
            .unwrap()
            .id;

        let empty = ServiceData::VitalSigns {
            blood_pressure: None,
            heart_rate: None,
            temperature: None,
            weight_kg: None,
            height_cm: None,
        };
        assert!(store.record_service_data(&id, empty).is_err());

        let vitals = ServiceData::VitalSigns {
            blood_pressure: Some("12/8".into()),
            heart_rate: Some(72),
            temperature: None,
            weight_kg: None,
            height_cm: None,
        };
        let patient = store.record_service_data(&id, vitals).unwrap();
        assert_eq!(patient.service_data.len(), 1);
    }

    #[test]
    fn registration_sequence_continues_after_seeding() {
        let (mut source, _clock) = store_at(t0());
        for name in ["Alpha", "Beta"] {
            source
                .register_patient(new_patient(name, ServiceType::Consultation))
                .unwrap();
        }
        let seqs: Vec<_> = source.patients().iter().map(|p| p.registration_seq).collect();
        assert_eq!(seqs, vec![1, 2]);

        let mut reloaded = PatientStore::from_patients(
            source.patients().to_vec(),
            Arc::new(ManualClock::new(t0())),
        );
        let next = reloaded
            .register_patient(new_patient("Gamma", ServiceType::Consultation))
            .unwrap();
        assert_eq!(next.registration_seq, 3);
    }

    #[test]
    fn duplicate_ids_are_skipped_when_seeding() {
        let (mut source, _clock) = store_at(t0());
        source
            .register_patient(new_patient("Once", ServiceType::MedicalVisit))
            .unwrap();
        let patient = source.patients()[0].clone();

        let store = PatientStore::from_patients(
            vec![patient.clone(), patient],
            Arc::new(ManualClock::new(t0())),
        );
        assert_eq!(store.len(), 1);
    }
}
