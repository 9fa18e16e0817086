//! # API REST
//!
//! REST API over the clinic core.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation (served as JSON at `/api-docs/openapi.json`)
//! - REST-specific concerns (JSON bodies, CORS, reading the current user from headers)
//!
//! The store lives behind a single `RwLock`, so mutations apply in the order requests acquire
//! it. Every successful mutation is written through the configured repository before the
//! response is sent; if that write fails the change is undone in memory and the request fails.

#![warn(rust_2018_idioms)]

mod dto;
mod handlers;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    routing::{get, post, put},
    Router,
};
use clinic_core::{Actor, PatientRepository, PatientStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

pub use dto::*;

/// Header carrying the authenticated user's name.
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
/// Header carrying the authenticated user's role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<PatientStore>>,
    repository: Arc<dyn PatientRepository>,
    clinic_name: String,
}

impl AppState {
    pub fn new(
        store: PatientStore,
        repository: Arc<dyn PatientRepository>,
        clinic_name: impl Into<String>,
    ) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            repository,
            clinic_name: clinic_name.into(),
        }
    }
}

/// The user on whose behalf a request is made, as supplied by the authentication proxy.
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let (Some(name), Some(role)) = (header(ACTOR_NAME_HEADER), header(ACTOR_ROLE_HEADER))
        else {
            return Err((
                StatusCode::UNAUTHORIZED,
                format!("missing {ACTOR_NAME_HEADER} or {ACTOR_ROLE_HEADER} header"),
            ));
        };

        Actor::from_parts(name, role)
            .map(CurrentActor)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::openapi,
        handlers::list_patients,
        handlers::get_patient,
        handlers::register_patient,
        handlers::update_patient,
        handlers::add_service,
        handlers::set_status,
        handlers::take_care,
        handlers::release_care,
        handlers::check_access,
        handlers::request_exam,
        handlers::complete_exam,
        handlers::record_service_data,
        handlers::waiting_queue,
        handlers::stats,
    ),
    components(schemas(
        HealthRes,
        PatientRes,
        ListPatientsRes,
        QueueEntryRes,
        QueueRes,
        StatsRes,
        RegisterPatientReq,
        UpdatePatientReq,
        AddServiceReq,
        SetStatusReq,
        RequestExamReq,
        RequestExamRes,
        CompleteExamReq,
        CareRes,
        AccessRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api-docs/openapi.json", get(handlers::openapi))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::register_patient),
        )
        .route(
            "/patients/:id",
            get(handlers::get_patient).put(handlers::update_patient),
        )
        .route("/patients/:id/services", post(handlers::add_service))
        .route("/patients/:id/status", put(handlers::set_status))
        .route(
            "/patients/:id/care",
            post(handlers::take_care).delete(handlers::release_care),
        )
        .route("/patients/:id/access", get(handlers::check_access))
        .route("/patients/:id/exams", post(handlers::request_exam))
        .route(
            "/patients/:id/exams/:exam_id/complete",
            post(handlers::complete_exam),
        )
        .route(
            "/patients/:id/service-data",
            post(handlers::record_service_data),
        )
        .route("/queue", get(handlers::waiting_queue))
        .route("/stats", get(handlers::stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
