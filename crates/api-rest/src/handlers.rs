//! HTTP handlers.
//!
//! Handlers translate JSON into core calls and core results into status codes. Mutations on an
//! existing patient consult the ownership policy first and answer `403` with the policy's
//! explanation when a nurse is blocked by a colleague's claim.

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use clinic_core::{
    access, queue, Actor, CareOutcome, ClinicError, ExamId, Gender, NewPatient, Patient,
    PatientChanges, PatientId, PatientStatus, PatientStore, ServiceData, ServiceType,
};
use serde::Deserialize;
use utoipa::OpenApi;

use crate::dto::*;
use crate::{ApiDoc, AppState, CurrentActor};

pub(crate) type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Maps core errors onto HTTP status codes.
pub(crate) fn error_response(e: ClinicError) -> (StatusCode, String) {
    match &e {
        ClinicError::NotFound(_) | ClinicError::ExamNotFound { .. } => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        ClinicError::InvalidInput(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        _ => {
            tracing::error!("storage error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
        }
    }
}

fn parse_id(id: &str) -> ApiResult<PatientId> {
    PatientId::parse(id).map_err(error_response)
}

fn parse_date(field: &str, value: &str) -> ApiResult<NaiveDate> {
    value.parse::<NaiveDate>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid input: {field} must be YYYY-MM-DD"),
        )
    })
}

fn ensure_can_modify(store: &PatientStore, id: &PatientId, actor: &Actor) -> ApiResult<()> {
    let patient = store.get(id).map_err(error_response)?;
    let decision = access::decide(patient, actor);
    if decision.is_allowed() {
        Ok(())
    } else {
        tracing::info!(patient_id = %id, actor = %actor.name, "modification denied");
        Err((StatusCode::FORBIDDEN, decision.explanation()))
    }
}

/// Saves the record, undoing the in-memory change when the save fails.
///
/// `before` is the record as it was before the mutation; `None` means the record is new and is
/// dropped again.
fn persist(
    state: &AppState,
    store: &mut PatientStore,
    id: &PatientId,
    before: Option<Patient>,
) -> ApiResult<()> {
    let Err(e) = store.save(id, state.repository.as_ref()) else {
        return Ok(());
    };
    match before {
        Some(snapshot) => store.restore(snapshot),
        None => {
            store.discard(id);
        }
    }
    tracing::warn!(patient_id = %id, "change rolled back after failed save");
    Err(error_response(e))
}

fn snapshot(store: &PatientStore, id: &PatientId) -> ApiResult<Patient> {
    store.get(id).cloned().map_err(error_response)
}

fn care_response(outcome: CareOutcome) -> ApiResult<Json<CareRes>> {
    let outcome = match outcome {
        CareOutcome::Claimed => "claimed",
        CareOutcome::AlreadyOwned => "alreadyOwned",
        CareOutcome::Started => "started",
        CareOutcome::Released => "released",
        CareOutcome::Denied { explanation } => return Err((StatusCode::FORBIDDEN, explanation)),
    };
    Ok(Json(CareRes {
        outcome: outcome.into(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    q: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueueQuery {
    service: Option<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: format!("{} REST API is alive", state.clinic_name),
    })
}

#[utoipa::path(
    get,
    path = "/api-docs/openapi.json",
    responses(
        (status = 200, description = "OpenAPI document")
    )
)]
pub(crate) async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    get,
    path = "/patients",
    params(
        ("q" = Option<String>, Query, description = "Case-insensitive name or company filter"),
        ("date" = Option<String>, Query, description = "Only patients registered on this day (YYYY-MM-DD, UTC)")
    ),
    responses(
        (status = 200, description = "Patients in registration order", body = ListPatientsRes),
        (status = 400, description = "Malformed date")
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListPatientsRes>> {
    let day = query
        .date
        .as_deref()
        .map(|d| parse_date("date", d))
        .transpose()?;

    let store = state.store.read().await;
    let needle = query.q.as_deref().unwrap_or("");
    let patients = queue::search_patients(store.patients(), needle)
        .into_iter()
        .filter(|p| day.map_or(true, |day| p.registration_day() == day))
        .map(PatientRes::from)
        .collect();
    Ok(Json(ListPatientsRes { patients }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    responses(
        (status = 200, description = "Full patient record including history"),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<Patient>> {
    let id = parse_id(&id)?;
    let store = state.store.read().await;
    let patient = store.get(&id).map_err(error_response)?;
    Ok(Json(patient.clone()))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = RegisterPatientReq,
    responses(
        (status = 201, description = "Patient registered", body = PatientRes),
        (status = 400, description = "Missing or malformed demographics"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
pub(crate) async fn register_patient(
    State(state): State<AppState>,
    Json(req): Json<RegisterPatientReq>,
) -> ApiResult<(StatusCode, Json<PatientRes>)> {
    let data = NewPatient {
        name: req.name,
        first_name: req.first_name,
        last_name: req.last_name,
        birth_date: parse_date("birthDate", &req.birth_date)?,
        gender: req.gender.parse().map_err(error_response)?,
        company: req.company,
        service: req.service.parse().map_err(error_response)?,
    };

    let mut store = state.store.write().await;
    let id = store.register_patient(data).map_err(error_response)?.id;
    persist(&state, &mut store, &id, None)?;

    let patient = store.get(&id).map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(PatientRes::from(patient))))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    request_body = UpdatePatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientRes),
        (status = 400, description = "Invalid field value"),
        (status = 403, description = "Patient claimed by another nurse"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
pub(crate) async fn update_patient(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdatePatientReq>,
) -> ApiResult<Json<PatientRes>> {
    let id = parse_id(&id)?;
    let changes = PatientChanges {
        name: req.name,
        first_name: req.first_name,
        last_name: req.last_name,
        birth_date: req
            .birth_date
            .as_deref()
            .map(|d| parse_date("birthDate", d))
            .transpose()?,
        gender: req
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(error_response)?,
        company: req.company,
    };

    let mut store = state.store.write().await;
    ensure_can_modify(&store, &id, &actor)?;
    let before = snapshot(&store, &id)?;
    store
        .update_patient(&id, changes, &actor)
        .map_err(error_response)?;
    persist(&state, &mut store, &id, Some(before))?;

    let patient = store.get(&id).map_err(error_response)?;
    Ok(Json(PatientRes::from(patient)))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/services",
    request_body = AddServiceReq,
    responses(
        (status = 200, description = "Patient queued for the service", body = PatientRes),
        (status = 403, description = "Patient claimed by another nurse"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
pub(crate) async fn add_service(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<AddServiceReq>,
) -> ApiResult<Json<PatientRes>> {
    let id = parse_id(&id)?;
    let service: ServiceType = req.service.parse().map_err(error_response)?;

    let mut store = state.store.write().await;
    ensure_can_modify(&store, &id, &actor)?;
    let before = snapshot(&store, &id)?;
    store
        .add_service_to_existing_patient(&id, service)
        .map_err(error_response)?;
    persist(&state, &mut store, &id, Some(before))?;

    let patient = store.get(&id).map_err(error_response)?;
    Ok(Json(PatientRes::from(patient)))
}

#[utoipa::path(
    put,
    path = "/patients/{id}/status",
    request_body = SetStatusReq,
    responses(
        (status = 200, description = "Status changed", body = PatientRes),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Patient claimed by another nurse")
    )
)]
#[axum::debug_handler]
pub(crate) async fn set_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SetStatusReq>,
) -> ApiResult<Json<PatientRes>> {
    let id = parse_id(&id)?;
    let status: PatientStatus = req.status.parse().map_err(error_response)?;

    let mut store = state.store.write().await;
    ensure_can_modify(&store, &id, &actor)?;
    let before = snapshot(&store, &id)?;
    store.set_status(&id, status).map_err(error_response)?;
    persist(&state, &mut store, &id, Some(before))?;

    let patient = store.get(&id).map_err(error_response)?;
    Ok(Json(PatientRes::from(patient)))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/care",
    responses(
        (status = 200, description = "Care taken", body = CareRes),
        (status = 403, description = "Patient claimed by another nurse"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
pub(crate) async fn take_care(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<CareRes>> {
    let id = parse_id(&id)?;

    let mut store = state.store.write().await;
    let before = snapshot(&store, &id)?;
    let outcome = store.take_care(&id, &actor).map_err(error_response)?;
    if !outcome.is_denied() {
        persist(&state, &mut store, &id, Some(before))?;
    }
    care_response(outcome)
}

#[utoipa::path(
    delete,
    path = "/patients/{id}/care",
    responses(
        (status = 200, description = "Claim released", body = CareRes),
        (status = 403, description = "Only the claimant or a doctor/admin may release"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
pub(crate) async fn release_care(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<CareRes>> {
    let id = parse_id(&id)?;

    let mut store = state.store.write().await;
    let before = snapshot(&store, &id)?;
    let outcome = store.release_care(&id, &actor).map_err(error_response)?;
    if !outcome.is_denied() {
        persist(&state, &mut store, &id, Some(before))?;
    }
    care_response(outcome)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/access",
    responses(
        (status = 200, description = "Ownership decision for the current user", body = AccessRes),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
pub(crate) async fn check_access(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<AccessRes>> {
    let id = parse_id(&id)?;
    let store = state.store.read().await;
    let patient = store.get(&id).map_err(error_response)?;
    Ok(Json(AccessRes {
        can_modify: access::can_modify(patient, &actor),
        explanation: access::explain(patient, &actor),
    }))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/exams",
    request_body = RequestExamReq,
    responses(
        (status = 201, description = "Exam requested", body = RequestExamRes),
        (status = 403, description = "Patient claimed by another nurse"),
        (status = 404, description = "Patient not found")
    )
)]
#[axum::debug_handler]
pub(crate) async fn request_exam(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<RequestExamReq>,
) -> ApiResult<(StatusCode, Json<RequestExamRes>)> {
    let id = parse_id(&id)?;

    let mut store = state.store.write().await;
    ensure_can_modify(&store, &id, &actor)?;
    let before = snapshot(&store, &id)?;
    let exam_id = store
        .request_lab_exam(&id, &req.exam_type)
        .map_err(error_response)?;
    persist(&state, &mut store, &id, Some(before))?;

    Ok((
        StatusCode::CREATED,
        Json(RequestExamRes {
            exam_id: exam_id.to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/exams/{exam_id}/complete",
    request_body = CompleteExamReq,
    responses(
        (status = 200, description = "Exam completed", body = PatientRes),
        (status = 403, description = "Patient claimed by another nurse"),
        (status = 404, description = "Patient or pending exam not found")
    )
)]
#[axum::debug_handler]
pub(crate) async fn complete_exam(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath((id, exam_id)): AxumPath<(String, String)>,
    Json(req): Json<CompleteExamReq>,
) -> ApiResult<Json<PatientRes>> {
    let id = parse_id(&id)?;
    let exam_id = ExamId::parse(&exam_id).map_err(error_response)?;

    let mut store = state.store.write().await;
    ensure_can_modify(&store, &id, &actor)?;
    let before = snapshot(&store, &id)?;
    store
        .complete_lab_exam(&id, &exam_id, &actor, req.results)
        .map_err(error_response)?;
    persist(&state, &mut store, &id, Some(before))?;

    let patient = store.get(&id).map_err(error_response)?;
    Ok(Json(PatientRes::from(patient)))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/service-data",
    responses(
        (status = 200, description = "Service data recorded", body = PatientRes),
        (status = 400, description = "Empty or malformed service data"),
        (status = 403, description = "Patient claimed by another nurse")
    )
)]
#[axum::debug_handler]
pub(crate) async fn record_service_data(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    AxumPath(id): AxumPath<String>,
    Json(data): Json<ServiceData>,
) -> ApiResult<Json<PatientRes>> {
    let id = parse_id(&id)?;

    let mut store = state.store.write().await;
    ensure_can_modify(&store, &id, &actor)?;
    let before = snapshot(&store, &id)?;
    store
        .record_service_data(&id, data)
        .map_err(error_response)?;
    persist(&state, &mut store, &id, Some(before))?;

    let patient = store.get(&id).map_err(error_response)?;
    Ok(Json(PatientRes::from(patient)))
}

#[utoipa::path(
    get,
    path = "/queue",
    params(
        ("service" = Option<String>, Query, description = "Restrict to VM, Cons or Ug")
    ),
    responses(
        (status = 200, description = "Waiting list, emergencies first", body = QueueRes),
        (status = 400, description = "Unknown service")
    )
)]
#[axum::debug_handler]
pub(crate) async fn waiting_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<QueueRes>> {
    let service = query
        .service
        .as_deref()
        .map(str::parse::<ServiceType>)
        .transpose()
        .map_err(error_response)?;

    let store = state.store.read().await;
    let now = store.now();
    let waiting = match service {
        Some(service) => queue::service_queue(store.patients(), service),
        None => queue::waiting_list(store.patients()),
    };

    let entries = waiting
        .into_iter()
        .enumerate()
        .map(|(i, patient)| QueueEntryRes {
            position: i + 1,
            wait_minutes: queue::wait_time(patient, now),
            patient: PatientRes::from(patient),
        })
        .collect();
    Ok(Json(QueueRes { entries }))
}

#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Counts per service and per status", body = StatsRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn stats(State(state): State<AppState>) -> Json<StatsRes> {
    let store = state.store.read().await;
    let patients = store.patients();
    Json(StatsRes::new(
        queue::service_stats(patients),
        queue::status_stats(patients),
    ))
}
