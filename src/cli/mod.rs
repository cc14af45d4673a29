//! Command-line surface: one subcommand per view, plus the interactive session.

pub mod health;
pub mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use time::Date;
use tracing::info;

use crate::access::{self, Route, View};
use crate::document::PlanDocument;
use crate::error::FarmacoError;
use crate::session::Session;
use crate::sources::fixture::FixtureStore;
use crate::sources::supabase::{SupabaseClient, SupabaseConfig};
use crate::sources::{IdentityProvider, RecordStore};
use crate::utils::date;

#[derive(Parser, Debug)]
#[command(
    name = "farmacohub",
    version,
    about = "Guided drug lookup: disease, active ingredient, pharmaceutical form, therapeutic plan PDF"
)]
pub struct Cli {
    /// Output JSON instead of markdown
    #[arg(long, global = true)]
    pub json: bool,

    /// Read records from a local JSON catalog instead of the hosted backend
    #[arg(long, global = true, value_name = "FILE")]
    pub fixtures: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Public entry view; signed-in users land on the disease list
    Welcome,
    /// List diseases with their exemption codes
    Diseases,
    /// Run the disease → ingredient → form search
    Search(WizardArgs),
    /// Write the therapeutic plan PDF for one or more drugs
    Export(ExportArgs),
    /// Write a single-drug prescription PDF
    Prescription(PrescriptionArgs),
    /// Interactive session with a working plan
    Session,
    /// Check backend connectivity and the export directory
    Health {
        /// Skip the export directory check
        #[arg(long)]
        apis_only: bool,
    },
    /// Show version
    Version,
}

#[derive(Args, Debug)]
pub struct WizardArgs {
    /// Disease id or name
    #[arg(long)]
    pub disease: String,
    /// Active ingredient (exact value)
    #[arg(long)]
    pub ingredient: Option<String>,
    /// Pharmaceutical form (exact value)
    #[arg(long)]
    pub form: Option<String>,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Directory for the PDF (default: $FARMACOHUB_EXPORT_DIR, then Downloads)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Issuance date (YYYY-MM-DD, default: today)
    #[arg(long, value_name = "DATE")]
    pub issued_on: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Disease id or name
    #[arg(long)]
    pub disease: String,
    /// Drug id to include, in plan order (repeatable)
    #[arg(long = "drug", value_name = "ID", required = true)]
    pub drugs: Vec<String>,
    /// Note for a drug as <id>=<text> (repeatable)
    #[arg(long = "note", value_name = "ID=TEXT", value_parser = parse_note)]
    pub notes: Vec<(String, String)>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct PrescriptionArgs {
    /// Disease id or name
    #[arg(long)]
    pub disease: String,
    /// Drug id
    #[arg(long)]
    pub drug: String,
    #[command(flatten)]
    pub output: OutputArgs,
}

fn parse_note(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((id, text)) if !id.trim().is_empty() => {
            Ok((id.trim().to_string(), text.to_string()))
        }
        _ => Err(format!("expected <drug-id>=<note>, got '{value}'")),
    }
}

/// Record store and identity check for one invocation.
pub struct Backend {
    pub store: Arc<dyn RecordStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Backend {
    pub async fn connect(fixtures: Option<&Path>) -> Result<Self, FarmacoError> {
        if let Some(path) = fixtures {
            let store = Arc::new(FixtureStore::load(&FixtureStore::resolve_path(path)).await?);
            return Ok(Self {
                store: store.clone(),
                identity: store,
            });
        }
        let client = Arc::new(SupabaseClient::new(SupabaseConfig::from_env()?)?);
        Ok(Self {
            store: client.clone(),
            identity: client,
        })
    }

    /// Loads a session, or fails when the user is not signed in.
    pub async fn protected_session(&self) -> Result<Session, FarmacoError> {
        access::require_protected(self.identity.is_authenticated().await)?;
        Ok(Session::load(self.store.clone()).await)
    }
}

#[derive(Serialize)]
struct ExportOutcome<'a> {
    path: String,
    file_name: &'a str,
    entries: usize,
}

#[derive(Serialize)]
struct WelcomeOutcome<'a> {
    route: Route,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diseases: Option<&'a [crate::entities::Disease]>,
}

pub(crate) fn issued_on(value: Option<&str>) -> Result<Date, FarmacoError> {
    match value {
        Some(v) => date::parse_iso_date(v),
        None => Ok(date::today()),
    }
}

/// Renders the PDF and stores it atomically in the export directory.
pub(crate) async fn write_document(
    document: &PlanDocument,
    output_dir: Option<&Path>,
) -> Result<PathBuf, FarmacoError> {
    let bytes = crate::render::pdf::render(document)?;
    let dir = crate::utils::download::export_dir(output_dir);
    let path = crate::utils::download::save_atomic(&dir, &document.file_name, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "therapeutic plan written");
    Ok(path)
}

pub(crate) fn export_message(
    document: &PlanDocument,
    path: &Path,
    entries: usize,
    json: bool,
) -> Result<String, FarmacoError> {
    if json {
        return crate::render::json::to_pretty(&ExportOutcome {
            path: path.display().to_string(),
            file_name: &document.file_name,
            entries,
        });
    }
    Ok(format!(
        "Wrote {} ({entries} {})",
        path.display(),
        if entries == 1 { "drug" } else { "drugs" }
    ))
}

const WELCOME: &str = "# FarmacoHub\n\nGuided drug lookup: choose a disease, an active ingredient and a pharmaceutical form, collect drugs into a therapeutic plan and export it as PDF.\n\n";

async fn welcome(backend: &Backend, json: bool) -> Result<String, FarmacoError> {
    let authenticated = backend.identity.is_authenticated().await;
    let route = access::route(View::Welcome, authenticated);
    match route {
        Route::Redirect(View::Protected) => {
            let session = Session::load(backend.store.clone()).await;
            if json {
                return crate::render::json::to_pretty(&WelcomeOutcome {
                    route,
                    login_hint: None,
                    diseases: Some(session.catalog().diseases.as_slice()),
                });
            }
            crate::render::markdown::diseases_markdown(&session.catalog().diseases)
        }
        _ => {
            if json {
                return crate::render::json::to_pretty(&WelcomeOutcome {
                    route,
                    login_hint: Some(access::login_hint()),
                    diseases: None,
                });
            }
            Ok(format!("{WELCOME}{}\n", access::login_hint()))
        }
    }
}

async fn diseases(backend: &Backend, json: bool) -> Result<String, FarmacoError> {
    let session = backend.protected_session().await?;
    let diseases = &session.catalog().diseases;
    if json {
        return crate::render::json::to_pretty(diseases);
    }
    crate::render::markdown::diseases_markdown(diseases)
}

async fn search(backend: &Backend, args: WizardArgs, json: bool) -> Result<String, FarmacoError> {
    let mut session = backend.protected_session().await?;
    session.select_disease(Some(&args.disease)).await?;
    session.select_ingredient(args.ingredient.as_deref())?;
    session.select_form(args.form.as_deref())?;
    let report = session.report();
    if json {
        return crate::render::json::to_pretty(&report);
    }
    crate::render::markdown::wizard_markdown(&report, session.plan())
}

async fn export(backend: &Backend, args: ExportArgs, json: bool) -> Result<String, FarmacoError> {
    let issued = issued_on(args.output.issued_on.as_deref())?;
    let mut session = backend.protected_session().await?;
    session.select_disease(Some(&args.disease)).await?;
    for drug_id in &args.drugs {
        let note = args
            .notes
            .iter()
            .rev()
            .find(|(id, _)| id == drug_id.trim())
            .map(|(_, text)| text.as_str());
        session.add_candidate(drug_id, note)?;
    }

    let Some(document) = session.document(issued) else {
        return Ok("The plan is empty; no document was written.".into());
    };
    let path = write_document(&document, args.output.output_dir.as_deref()).await?;
    export_message(&document, &path, session.plan().len(), json)
}

async fn prescription(
    backend: &Backend,
    args: PrescriptionArgs,
    json: bool,
) -> Result<String, FarmacoError> {
    let issued = issued_on(args.output.issued_on.as_deref())?;
    let mut session = backend.protected_session().await?;
    session.select_disease(Some(&args.disease)).await?;
    let drug = session
        .view()
        .candidates
        .iter()
        .find(|d| d.id == args.drug.trim())
        .map(|d| (*d).clone())
        .ok_or_else(|| FarmacoError::NotFound {
            entity: "drug".into(),
            id: args.drug.clone(),
            suggestion: format!("Try: farmacohub search --disease {:?}", args.disease),
        })?;
    let disease = session
        .selection()
        .disease()
        .and_then(|id| session.catalog().disease(id));
    let document = crate::document::build_single(
        &drug,
        disease.map(|d| d.name.as_str()).unwrap_or_default(),
        disease.and_then(|d| d.exemption()),
        issued,
    );
    let path = write_document(&document, args.output.output_dir.as_deref()).await?;
    export_message(&document, &path, 1, json)
}

async fn health(
    fixtures: Option<&Path>,
    apis_only: bool,
    json: bool,
) -> Result<String, FarmacoError> {
    let export_dir = crate::utils::download::export_dir(None);
    let report = match fixtures {
        Some(path) => {
            let path = FixtureStore::resolve_path(path);
            health::check(health::Backend::Fixtures(&path), &export_dir, apis_only).await
        }
        None => {
            let client = SupabaseClient::new(SupabaseConfig::from_env()?)?;
            health::check(health::Backend::Hosted(&client), &export_dir, apis_only).await
        }
    };
    if json {
        return crate::render::json::to_pretty(&report);
    }
    crate::render::markdown::health_markdown(&report)
}

/// Runs a non-interactive command and returns its rendered output.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let Cli {
        json,
        fixtures,
        command,
    } = cli;
    let command = command.unwrap_or(Commands::Welcome);

    let output = match command {
        Commands::Version => format!("farmacohub {}", env!("CARGO_PKG_VERSION")),
        Commands::Health { apis_only } => health(fixtures.as_deref(), apis_only, json).await?,
        Commands::Session => {
            anyhow::bail!("The interactive session reads from a terminal; run `farmacohub session`")
        }
        Commands::Welcome => {
            let backend = Backend::connect(fixtures.as_deref()).await?;
            welcome(&backend, json).await?
        }
        Commands::Diseases => {
            let backend = Backend::connect(fixtures.as_deref()).await?;
            diseases(&backend, json).await?
        }
        Commands::Search(args) => {
            let backend = Backend::connect(fixtures.as_deref()).await?;
            search(&backend, args, json).await?
        }
        Commands::Export(args) => {
            let backend = Backend::connect(fixtures.as_deref()).await?;
            export(&backend, args, json).await?
        }
        Commands::Prescription(args) => {
            let backend = Backend::connect(fixtures.as_deref()).await?;
            prescription(&backend, args, json).await?
        }
    };
    Ok(output)
}

/// Parses `args` (including the binary name) and runs the command.
pub async fn execute(args: Vec<String>) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(args)?;
    run(cli).await
}
