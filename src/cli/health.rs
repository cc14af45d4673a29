//! `farmacohub health`: whether records can be read and plans written.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::error::FarmacoError;
use crate::sources::RecordStore;
use crate::sources::fixture::FixtureStore;
use crate::sources::supabase::SupabaseClient;

const MARKER_FILE: &str = ".farmacohub-health";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthRow {
    pub check: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl HealthRow {
    fn from_result(check: String, result: Result<String, FarmacoError>) -> Self {
        match result {
            Ok(detail) => Self {
                check,
                status: CheckStatus::Ok,
                detail,
            },
            Err(err) => {
                debug!(check = %check, error = %err, "health check failed");
                Self {
                    check,
                    status: CheckStatus::Error,
                    detail: err.to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    fn new(rows: Vec<HealthRow>) -> Self {
        Self {
            healthy: rows.iter().filter(|r| r.status == CheckStatus::Ok).count(),
            total: rows.len(),
            rows,
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }
}

/// Where records come from.
pub enum Backend<'a> {
    Hosted(&'a SupabaseClient),
    Fixtures(&'a Path),
}

fn millis(start: Instant) -> String {
    format!("{}ms", start.elapsed().as_millis())
}

async fn fixture_counts(path: &Path) -> Result<String, FarmacoError> {
    let store = FixtureStore::load(path).await?;
    let drugs = store.fetch_drugs().await?.len();
    let diseases = store.fetch_diseases().await?.len();
    Ok(format!("{drugs} drugs, {diseases} diseases"))
}

/// Stores and removes a marker file through the same atomic path as exports.
async fn export_writable(dir: &Path) -> Result<String, FarmacoError> {
    let start = Instant::now();
    let marker = crate::utils::download::save_atomic(dir, MARKER_FILE, b"ok").await?;
    tokio::fs::remove_file(&marker).await?;
    Ok(millis(start))
}

pub async fn check(backend: Backend<'_>, export_dir: &Path, apis_only: bool) -> HealthReport {
    let mut rows: Vec<HealthRow> = match backend {
        Backend::Hosted(client) => client
            .ping()
            .await
            .into_iter()
            .map(|(service, result)| {
                HealthRow::from_result(
                    format!("Supabase {service}"),
                    result.map(|rtt| format!("{}ms", rtt.as_millis())),
                )
            })
            .collect(),
        Backend::Fixtures(path) => vec![HealthRow::from_result(
            format!("Fixture catalog ({})", path.display()),
            fixture_counts(path).await,
        )],
    };
    if !apis_only {
        rows.push(HealthRow::from_result(
            format!("Export dir ({})", export_dir.display()),
            export_writable(export_dir).await,
        ));
    }
    HealthReport::new(rows)
}
