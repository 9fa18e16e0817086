//! Derived queue views.
//!
//! All functions take a snapshot slice and never mutate it. Ordering relies on a stable sort so
//! patients with identical keys keep their insertion order.

use crate::patient::{Patient, PatientStatus, ServiceType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Reverse;

/// Waiting patients, emergencies first, then by ascending registration time.
pub fn waiting_list(patients: &[Patient]) -> Vec<&Patient> {
    let mut waiting: Vec<&Patient> = patients.iter().filter(|p| p.is_waiting()).collect();
    waiting.sort_by_key(|p| (Reverse(p.is_emergency()), p.registered_at));
    waiting
}

/// The waiting list restricted to one service.
pub fn service_queue(patients: &[Patient], service: ServiceType) -> Vec<&Patient> {
    waiting_list(patients)
        .into_iter()
        .filter(|p| p.service == service)
        .collect()
}

/// Whole minutes since registration; zero when `now` is earlier than `registered_at`.
pub fn wait_time(patient: &Patient, now: DateTime<Utc>) -> u64 {
    let minutes = (now - patient.registered_at).num_minutes();
    u64::try_from(minutes).unwrap_or(0)
}

/// Number of patients per service category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub medical_visit: usize,
    pub consultation: usize,
    pub emergency: usize,
}

impl ServiceStats {
    pub fn get(&self, service: ServiceType) -> usize {
        match service {
            ServiceType::MedicalVisit => self.medical_visit,
            ServiceType::Consultation => self.consultation,
            ServiceType::Emergency => self.emergency,
        }
    }

    pub fn total(&self) -> usize {
        self.medical_visit + self.consultation + self.emergency
    }
}

pub fn service_stats(patients: &[Patient]) -> ServiceStats {
    patients.iter().fold(ServiceStats::default(), |mut stats, p| {
        match p.service {
            ServiceType::MedicalVisit => stats.medical_visit += 1,
            ServiceType::Consultation => stats.consultation += 1,
            ServiceType::Emergency => stats.emergency += 1,
        }
        stats
    })
}

/// Number of patients per workflow status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusStats {
    pub waiting: usize,
    pub in_progress: usize,
    pub done: usize,
}

pub fn status_stats(patients: &[Patient]) -> StatusStats {
    patients.iter().fold(StatusStats::default(), |mut stats, p| {
        match p.status {
            PatientStatus::Waiting => stats.waiting += 1,
            PatientStatus::InProgress => stats.in_progress += 1,
            PatientStatus::Done => stats.done += 1,
        }
        stats
    })
}

/// Archive view: patients registered on `day` (UTC), in insertion order.
pub fn patients_registered_on(patients: &[Patient], day: NaiveDate) -> Vec<&Patient> {
    patients
        .iter()
        .filter(|p| p.registration_day() == day)
        .collect()
}

/// Case-insensitive substring match on display name, first/last name and company.
pub fn search_patients<'a>(patients: &'a [Patient], query: &str) -> Vec<&'a Patient> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return patients.iter().collect();
    }
    patients
        .iter()
        .filter(|p| {
            [
                p.name.as_str(),
                p.first_name.as_str(),
                p.last_name.as_str(),
                p.company.as_deref().unwrap_or(""),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::Gender;
    use crate::uuid::PatientId;
    use crate::NonEmptyText;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap()
    }

    fn patient(last_name: &str, service: ServiceType, registered_at: DateTime<Utc>) -> Patient {
        Patient {
            id: PatientId::new(),
            name: NonEmptyText::new(format!("Test {last_name}")).unwrap(),
            first_name: NonEmptyText::new("Test").unwrap(),
            last_name: NonEmptyText::new(last_name).unwrap(),
            birth_date: NaiveDate::from_ymd_opt(1975, 1, 1).unwrap(),
            gender: Gender::Female,
            company: Some("Acme".into()),
            service,
            status: PatientStatus::Waiting,
            registered_at,
            registration_seq: 0,
            taken_care_by: None,
            pending_lab_exams: vec![],
            completed_lab_exams: vec![],
            service_history: vec![],
            modification_history: vec![],
            service_data: vec![],
        }
    }

    fn names(list: &[&Patient]) -> Vec<String> {
        list.iter().map(|p| p.last_name.to_string()).collect()
    }

    #[test]
    fn emergency_precedes_earlier_consultation() {
        let patients = vec![
            patient("Urgent", ServiceType::Emergency, t0()),
            patient("Early", ServiceType::Consultation, t0() - Duration::minutes(5)),
        ];

        let list = waiting_list(&patients);
        assert_eq!(names(&list), vec!["Urgent", "Early"]);
    }

    #[test]
    fn groups_are_sorted_by_registration_and_stable_on_ties() {
        let patients = vec![
            patient("C", ServiceType::MedicalVisit, t0() + Duration::minutes(10)),
            patient("U2", ServiceType::Emergency, t0() + Duration::minutes(3)),
            patient("A", ServiceType::Consultation, t0()),
            patient("B", ServiceType::MedicalVisit, t0()),
            patient("U1", ServiceType::Emergency, t0() + Duration::minutes(1)),
        ];

        let list = waiting_list(&patients);
        assert_eq!(names(&list), vec!["U1", "U2", "A", "B", "C"]);

        let first_non_emergency = list.iter().position(|p| !p.is_emergency()).unwrap();
        assert!(list[first_non_emergency..].iter().all(|p| !p.is_emergency()));
        assert!(list
            .windows(2)
            .filter(|w| w[0].is_emergency() == w[1].is_emergency())
            .all(|w| w[0].registered_at <= w[1].registered_at));
    }

    #[test]
    fn waiting_list_excludes_other_statuses() {
        let mut busy = patient("Busy", ServiceType::Emergency, t0());
        busy.status = PatientStatus::InProgress;
        let mut done = patient("Done", ServiceType::MedicalVisit, t0());
        done.status = PatientStatus::Done;
        let patients = vec![busy, done, patient("Waiting", ServiceType::MedicalVisit, t0())];

        assert_eq!(names(&waiting_list(&patients)), vec!["Waiting"]);
    }

    #[test]
    fn service_queue_filters_one_service() {
        let patients = vec![
            patient("VM1", ServiceType::MedicalVisit, t0()),
            patient("Ug1", ServiceType::Emergency, t0()),
            patient("VM2", ServiceType::MedicalVisit, t0() + Duration::minutes(1)),
        ];

        let list = service_queue(&patients, ServiceType::MedicalVisit);
        assert_eq!(names(&list), vec!["VM1", "VM2"]);
    }

    #[test]
    fn wait_time_counts_whole_minutes_and_clamps_skew() {
        let p = patient("P", ServiceType::MedicalVisit, t0());

        assert_eq!(wait_time(&p, t0()), 0);
        assert_eq!(wait_time(&p, t0() + Duration::seconds(150)), 2);
        assert_eq!(wait_time(&p, t0() + Duration::hours(1)), 60);
        assert_eq!(wait_time(&p, t0() - Duration::minutes(7)), 0);
    }

    #[test]
    fn service_stats_defaults_to_zero_and_is_repeatable() {
        let patients = vec![
            patient("A", ServiceType::MedicalVisit, t0()),
            patient("B", ServiceType::MedicalVisit, t0()),
            patient("C", ServiceType::Emergency, t0()),
        ];

        let first = service_stats(&patients);
        assert_eq!(first, service_stats(&patients));
        assert_eq!(first.get(ServiceType::MedicalVisit), 2);
        assert_eq!(first.get(ServiceType::Consultation), 0);
        assert_eq!(first.get(ServiceType::Emergency), 1);
        assert_eq!(first.total(), 3);
        assert_eq!(service_stats(&[]), ServiceStats::default());
    }

    #[test]
    fn status_stats_counts_each_state() {
        let mut in_progress = patient("B", ServiceType::Consultation, t0());
        in_progress.status = PatientStatus::InProgress;
        let patients = vec![patient("A", ServiceType::MedicalVisit, t0()), in_progress];

        let stats = status_stats(&patients);
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.done, 0);
    }

    #[test]
    fn archive_groups_by_registration_day() {
        let patients = vec![
            patient("Today", ServiceType::MedicalVisit, t0()),
            patient("Yesterday", ServiceType::MedicalVisit, t0() - Duration::days(1)),
        ];

        let day = t0().date_naive();
        assert_eq!(names(&patients_registered_on(&patients, day)), vec!["Today"]);
    }

    #[test]
    fn search_matches_company_case_insensitively() {
        let mut globex = patient("Martin", ServiceType::MedicalVisit, t0());
        globex.company = Some("Globex".into());
        let patients = vec![patient("Durand", ServiceType::MedicalVisit, t0()), globex];

        assert_eq!(names(&search_patients(&patients, "GLOB")), vec!["Martin"]);
        assert_eq!(names(&search_patients(&patients, "durand")), vec!["Durand"]);
        assert_eq!(search_patients(&patients, "  ").len(), 2);
    }
}
