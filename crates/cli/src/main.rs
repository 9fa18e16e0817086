use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clinic_core::{
    access, queue, Actor, CareOutcome, CoreConfig, ExamId, FileRepository, Gender, NewPatient,
    Patient, PatientChanges, PatientId, PatientStatus, PatientStore, Role, ServiceData,
    ServiceType, SystemClock,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic queue command line")]
struct Cli {
    /// Name of the staff member running the command
    #[arg(long, global = true, env = "CLINIC_ACTOR_NAME")]
    actor_name: Option<String>,
    /// Role of the staff member (secretary, nurse, doctor, admin)
    #[arg(long, global = true, env = "CLINIC_ACTOR_ROLE")]
    actor_role: Option<Role>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List patients, optionally filtered by name or company
    List {
        query: Option<String>,
    },
    /// Show one patient record in full
    Show {
        id: String,
    },
    /// Register a new patient
    Register {
        first_name: String,
        last_name: String,
        /// Date of birth (YYYY-MM-DD)
        birth_date: NaiveDate,
        /// male, female or other
        gender: Gender,
        /// VM, Cons or Ug
        service: ServiceType,
        #[arg(long)]
        company: Option<String>,
        /// Display name; derived from first and last name when absent
        #[arg(long)]
        name: Option<String>,
    },
    /// Queue an already registered patient for another service
    AddService {
        id: String,
        service: ServiceType,
    },
    /// Edit demographics
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        birth_date: Option<NaiveDate>,
        #[arg(long)]
        gender: Option<Gender>,
        /// Empty string clears the company
        #[arg(long)]
        company: Option<String>,
    },
    /// Take charge of a patient
    TakeCare {
        id: String,
    },
    /// Release a claim on a patient
    Release {
        id: String,
    },
    /// Move a patient to a later status
    Status {
        id: String,
        /// "En attente", "En cours" or "Terminé"
        status: PatientStatus,
    },
    /// Request a lab exam
    RequestExam {
        id: String,
        exam_type: String,
    },
    /// Complete a pending lab exam
    CompleteExam {
        id: String,
        exam_id: String,
        #[arg(long)]
        results: Option<String>,
    },
    /// Record service data given as JSON, e.g. '{"kind":"vitalSigns","heartRate":72}'
    RecordData {
        id: String,
        json: String,
    },
    /// Show the waiting list, emergencies first
    Queue {
        #[arg(long)]
        service: Option<ServiceType>,
    },
    /// Show counts per service and per status
    Stats,
    /// Check whether the current user may modify a patient
    CanModify {
        id: String,
    },
    /// List patients registered on a given day
    Day {
        /// YYYY-MM-DD
        date: NaiveDate,
    },
}

impl Cli {
    fn actor(&self) -> anyhow::Result<Actor> {
        let (Some(name), Some(role)) = (&self.actor_name, self.actor_role) else {
            bail!("this command needs --actor-name and --actor-role");
        };
        Ok(Actor::new(name, role)?)
    }
}

fn parse_id(id: &str) -> anyhow::Result<PatientId> {
    Ok(PatientId::parse(id)?)
}

fn ensure_can_modify(store: &PatientStore, id: &PatientId, actor: &Actor) -> anyhow::Result<()> {
    let decision = access::decide(store.get(id)?, actor);
    if !decision.is_allowed() {
        bail!(decision.explanation());
    }
    Ok(())
}

fn print_patient_line(patient: &Patient) {
    println!(
        "{}  {:<4} {:<10} {} ({}){}",
        patient.id,
        patient.service.code(),
        patient.status.label(),
        patient.name,
        patient.company.as_deref().unwrap_or("-"),
        patient
            .taken_care_by
            .as_ref()
            .map(|a| format!(" [{}]", a.name))
            .unwrap_or_default(),
    );
}

fn print_outcome(outcome: CareOutcome) -> anyhow::Result<()> {
    match outcome {
        CareOutcome::Claimed => println!("Patient claimed."),
        CareOutcome::AlreadyOwned => println!("You already have this patient."),
        CareOutcome::Started => println!("Patient in progress."),
        CareOutcome::Released => println!("Claim released."),
        CareOutcome::Denied { explanation } => bail!(explanation),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinic_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = Arc::new(CoreConfig::from_values(
        std::env::var("CLINIC_DATA_DIR").ok(),
        std::env::var("CLINIC_NAME").ok(),
    )?);
    let repository = FileRepository::new(cfg.clone());
    let mut store = PatientStore::load(&repository, Arc::new(SystemClock))
        .with_context(|| format!("loading patients from {}", cfg.patient_data_dir().display()))?;
    tracing::debug!(patients = store.len(), clinic = cfg.clinic_name(), "store loaded");

    let Some(command) = cli.command.as_ref() else {
        println!("Use 'clinic --help' for commands");
        return Ok(());
    };

    match command {
        Commands::List { query } => {
            let patients = queue::search_patients(store.patients(), query.as_deref().unwrap_or(""));
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                print_patient_line(patient);
            }
        }
        Commands::Show { id } => {
            let patient = store.get(&parse_id(id)?)?;
            println!("{}", serde_json::to_string_pretty(patient)?);
        }
        Commands::Register {
            first_name,
            last_name,
            birth_date,
            gender,
            service,
            company,
            name,
        } => {
            let id = store
                .register_patient(NewPatient {
                    name: name.clone(),
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    birth_date: *birth_date,
                    gender: *gender,
                    company: company.clone(),
                    service: *service,
                })?
                .id;
            store.save(&id, &repository)?;
            println!("Registered patient {id}");
        }
        Commands::AddService { id, service } => {
            let id = parse_id(id)?;
            ensure_can_modify(&store, &id, &cli.actor()?)?;
            store.add_service_to_existing_patient(&id, *service)?;
            store.save(&id, &repository)?;
            println!("Patient {id} queued for {service}");
        }
        Commands::Update {
            id,
            name,
            first_name,
            last_name,
            birth_date,
            gender,
            company,
        } => {
            let id = parse_id(id)?;
            let actor = cli.actor()?;
            ensure_can_modify(&store, &id, &actor)?;
            let changes = PatientChanges {
                name: name.clone(),
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                birth_date: *birth_date,
                gender: *gender,
                company: company.clone(),
            };
            let before = store.get(&id)?.modification_history.len();
            let after = store
                .update_patient(&id, changes, &actor)?
                .modification_history
                .len();
            store.save(&id, &repository)?;
            println!("Updated patient {id} ({} field(s) changed)", after - before);
        }
        Commands::TakeCare { id } => {
            let id = parse_id(id)?;
            let outcome = store.take_care(&id, &cli.actor()?)?;
            if !outcome.is_denied() {
                store.save(&id, &repository)?;
            }
            print_outcome(outcome)?;
        }
        Commands::Release { id } => {
            let id = parse_id(id)?;
            let outcome = store.release_care(&id, &cli.actor()?)?;
            if !outcome.is_denied() {
                store.save(&id, &repository)?;
            }
            print_outcome(outcome)?;
        }
        Commands::Status { id, status } => {
            let id = parse_id(id)?;
            ensure_can_modify(&store, &id, &cli.actor()?)?;
            store.set_status(&id, *status)?;
            store.save(&id, &repository)?;
            println!("Patient {id} is now {status}");
        }
        Commands::RequestExam { id, exam_type } => {
            let id = parse_id(id)?;
            ensure_can_modify(&store, &id, &cli.actor()?)?;
            let exam_id = store.request_lab_exam(&id, exam_type)?;
            store.save(&id, &repository)?;
            println!("Requested exam {exam_id}");
        }
        Commands::CompleteExam {
            id,
            exam_id,
            results,
        } => {
            let id = parse_id(id)?;
            let exam_id = ExamId::parse(exam_id)?;
            let actor = cli.actor()?;
            ensure_can_modify(&store, &id, &actor)?;
            store.complete_lab_exam(&id, &exam_id, &actor, results.clone())?;
            store.save(&id, &repository)?;
            println!("Completed exam {exam_id}");
        }
        Commands::RecordData { id, json } => {
            let id = parse_id(id)?;
            let data: ServiceData =
                serde_json::from_str(json).context("service data is not valid JSON")?;
            ensure_can_modify(&store, &id, &cli.actor()?)?;
            store.record_service_data(&id, data)?;
            store.save(&id, &repository)?;
            println!("Recorded service data for {id}");
        }
        Commands::Queue { service } => {
            let now = store.now();
            let waiting = match service {
                Some(service) => queue::service_queue(store.patients(), *service),
                None => queue::waiting_list(store.patients()),
            };
            if waiting.is_empty() {
                println!("Nobody is waiting.");
            }
            for (position, patient) in waiting.into_iter().enumerate() {
                print!("{:>3}. {:>4} min  ", position + 1, queue::wait_time(patient, now));
                print_patient_line(patient);
            }
        }
        Commands::Stats => {
            let services = queue::service_stats(store.patients());
            let statuses = queue::status_stats(store.patients());
            for service in ServiceType::ALL {
                println!("{:<5} {}", service.code(), services.get(service));
            }
            println!("total {}", services.total());
            println!(
                "En attente {}, En cours {}, Terminé {}",
                statuses.waiting, statuses.in_progress, statuses.done
            );
        }
        Commands::CanModify { id } => {
            let patient = store.get(&parse_id(id)?)?;
            let actor = cli.actor()?;
            println!(
                "{}: {}",
                access::can_modify(patient, &actor),
                access::explain(patient, &actor)
            );
        }
        Commands::Day { date } => {
            for patient in queue::patients_registered_on(store.patients(), *date) {
                print_patient_line(patient);
            }
        }
    }

    Ok(())
}
