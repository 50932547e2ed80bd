//! EHR access CLI: hydrates the permission store from a JSON seed file
//! and prints who can see whose records.
//!
//! Usage: `ehr-access <SEED> [--at <RFC3339>] [--expire]`

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::Parser;
use ehr_access_core::error::AccessError;
use ehr_access_core::models::actor::ActorId;
use ehr_access_core::models::permission::{EffectiveStatus, PermissionRecord};
use ehr_access_service::{AccessConfig, AccessPermissionStore, PermissionQuery, TracingSink};
use ehr_access_store::{InMemoryPermissionRepository, StoreError, load_seed_file};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("seed error: {0}")]
    Seed(#[from] StoreError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("output error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Print who can see whose records, as JSON.
#[derive(Debug, Parser)]
#[command(name = "ehr-access")]
#[command(about = "Hydrate an access permission store from a seed file and summarize it")]
struct Args {
    /// JSON seed file of permission records
    seed: PathBuf,

    /// Evaluate access at this RFC 3339 instant instead of now
    #[arg(long)]
    at: Option<DateTime<Utc>>,

    /// Revoke lapsed grants before summarizing
    #[arg(long)]
    expire: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PatientSummary {
    patient_id: ActorId,
    pending: Vec<PermissionRecord>,
    active: Vec<PermissionRecord>,
    expired: Vec<PermissionRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderSummary {
    provider_id: ActorId,
    patients_with_access: Vec<ActorId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    at: DateTime<Utc>,
    expired_this_run: usize,
    patients: Vec<PatientSummary>,
    providers: Vec<ProviderSummary>,
}

fn run(args: Args) -> Result<Summary, CliError> {
    let records = load_seed_file(&args.seed)?;
    let patients: BTreeSet<ActorId> = records.iter().map(|r| r.patient_id.clone()).collect();
    let providers: BTreeSet<ActorId> = records.iter().map(|r| r.provider_id.clone()).collect();

    let repo = InMemoryPermissionRepository::from_records(records)?;
    let store = AccessPermissionStore::new(repo, TracingSink, AccessConfig::default());
    let at = args.at.unwrap_or_else(|| store.now());

    let expired_this_run = if args.expire {
        store.expire_lapsed(at)?.len()
    } else {
        0
    };

    let mut patient_summaries = Vec::with_capacity(patients.len());
    for patient_id in patients {
        patient_summaries.push(PatientSummary {
            pending: store.pending_for_patient(&patient_id)?,
            active: store.active_for_patient(&patient_id, at)?,
            expired: store.query(
                &PermissionQuery::for_patient(patient_id.clone())
                    .with_status(EffectiveStatus::Expired)
                    .at(at),
            )?,
            patient_id,
        });
    }

    let mut provider_summaries = Vec::with_capacity(providers.len());
    for provider_id in providers {
        provider_summaries.push(ProviderSummary {
            patients_with_access: store.patients_with_access(&provider_id, at)?,
            provider_id,
        });
    }

    info!(
        seed = %args.seed.display(),
        patients = patient_summaries.len(),
        providers = provider_summaries.len(),
        expired_this_run,
        "Access summary built"
    );

    Ok(Summary {
        at,
        expired_this_run,
        patients: patient_summaries,
        providers: provider_summaries,
    })
}

fn main() -> ExitCode {
    let filter = match "ehr_access=info".parse::<Directive>() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = run(args).and_then(|summary| Ok(serde_json::to_string_pretty(&summary)?));

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "ehr-access failed");
            ExitCode::FAILURE
        }
    }
}
