use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use clinic_core::{CoreConfig, FileRepository, PatientStore, SystemClock};

/// Main entry point for the clinic queue service
///
/// Loads the patient store from disk and serves the REST API until interrupted.
///
/// # Environment Variables
/// - `CLINIC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CLINIC_DATA_DIR`: Directory for patient data storage (default: "clinic_data")
/// - `CLINIC_NAME`: Clinic name reported by the health check (default: "clinic.dev")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_run=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("CLINIC_REST_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".into())
        .parse()?;

    let cfg = Arc::new(CoreConfig::from_values(
        std::env::var("CLINIC_DATA_DIR").ok(),
        std::env::var("CLINIC_NAME").ok(),
    )?);
    std::fs::create_dir_all(cfg.patients_dir())?;

    let repository = Arc::new(FileRepository::new(cfg.clone()));
    let store = PatientStore::load(repository.as_ref(), Arc::new(SystemClock))?;
    tracing::info!(
        "++ Loaded {} patients from {}",
        store.len(),
        cfg.patient_data_dir().display()
    );

    let app = api_rest::router(AppState::new(store, repository, cfg.clinic_name()));

    tracing::info!("++ Starting {} REST on {}", cfg.clinic_name(), rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
