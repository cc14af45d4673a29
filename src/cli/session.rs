//! Line-oriented interactive session over one [`Session`].
//!
//! Each input line is split with shlex and parsed by clap. Choosing the
//! disease or ingredient that is already selected clears it.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::error::FarmacoError;
use crate::render::{json, markdown};
use crate::session::Session;

const PROMPT: &str = "farmacohub> ";

const HELP: &str = "\
Commands:
  diseases                  list diseases
  disease <id|name>         choose a disease (again to clear; empties the plan)
  ingredient <value>        choose an active ingredient (again to clear)
  form <value>              choose a pharmaceutical form (again to clear)
  status                    wizard progress and next choices
  results                   drugs matching the completed search
  add <drug-id> [note...]   add a result to the plan
  remove <drug-id>          remove a drug from the plan
  plan                      show the plan
  preview                   preview the plan document
  export [--output-dir DIR] [--issued-on YYYY-MM-DD]
                            write the plan PDF
  reset                     start over with an empty plan
  help                      this text
  quit                      leave the session
";

#[derive(Parser, Debug)]
#[command(
    name = "session",
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    Diseases,
    Disease {
        #[arg(num_args = 0.., trailing_var_arg = true)]
        query: Vec<String>,
    },
    Ingredient {
        #[arg(num_args = 0.., trailing_var_arg = true)]
        value: Vec<String>,
    },
    Form {
        #[arg(num_args = 0.., trailing_var_arg = true)]
        value: Vec<String>,
    },
    Status,
    Results,
    Add {
        drug_id: String,
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        note: Vec<String>,
    },
    Remove {
        drug_id: String,
    },
    Plan,
    Preview,
    Export {
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        #[arg(long, value_name = "DATE")]
        issued_on: Option<String>,
    },
    Reset,
    Help,
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Output(String),
    Quit,
}

fn joined(words: &[String]) -> Option<String> {
    let value = words.join(" ");
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn disease_name(session: &Session) -> Option<&str> {
    session
        .selection()
        .disease()
        .and_then(|id| session.catalog().disease(id))
        .map(|d| d.name.as_str())
}

fn status(session: &Session, json_output: bool) -> Result<String, FarmacoError> {
    let report = session.report();
    if json_output {
        return json::to_pretty(&report);
    }
    markdown::wizard_markdown(&report, session.plan())
}

/// Applies one input line to the session.
pub async fn dispatch(
    session: &mut Session,
    line: &str,
    json_output: bool,
    output_dir: Option<&Path>,
) -> Result<Step, FarmacoError> {
    let Some(words) = shlex::split(line) else {
        return Err(FarmacoError::InvalidArgument(format!(
            "Invalid command syntax: {line}"
        )));
    };
    if words.is_empty() {
        return Ok(Step::Output(String::new()));
    }
    let parsed = SessionLine::try_parse_from(&words)
        .map_err(|err| FarmacoError::InvalidArgument(err.render().to_string()))?;
    debug!(command = ?parsed.command, "session command");

    let output = match parsed.command {
        SessionCommand::Quit => return Ok(Step::Quit),
        SessionCommand::Help => HELP.to_string(),
        SessionCommand::Diseases => {
            let diseases = &session.catalog().diseases;
            if json_output {
                json::to_pretty(diseases)?
            } else {
                markdown::diseases_markdown(diseases)?
            }
        }
        SessionCommand::Disease { query } => {
            let query = joined(&query);
            let toggled_off = match (query.as_deref(), session.selection().disease()) {
                (Some(q), Some(current)) => {
                    crate::entities::disease::resolve(&session.catalog().diseases, q)
                        .map(|d| d.id == current)
                        .unwrap_or(false)
                }
                _ => false,
            };
            let target = if toggled_off { None } else { query.as_deref() };
            session.select_disease(target).await?;
            status(session, json_output)?
        }
        SessionCommand::Ingredient { value } => {
            let value = joined(&value);
            let target = match value.as_deref() {
                Some(v) if session.selection().ingredient() == Some(v) => None,
                other => other,
            };
            session.select_ingredient(target)?;
            status(session, json_output)?
        }
        SessionCommand::Form { value } => {
            let value = joined(&value);
            let target = match value.as_deref() {
                Some(v) if session.selection().form() == Some(v) => None,
                other => other,
            };
            session.select_form(target)?;
            status(session, json_output)?
        }
        SessionCommand::Status | SessionCommand::Results => status(session, json_output)?,
        SessionCommand::Add { drug_id, note } => {
            let note = joined(&note);
            let added = session.add_to_plan(&drug_id, note.as_deref())?;
            if added {
                format!("Added {drug_id} ({} in plan)", session.plan().len())
            } else {
                format!("{drug_id} is already in the plan")
            }
        }
        SessionCommand::Remove { drug_id } => {
            if session.remove_from_plan(&drug_id) {
                format!("Removed {drug_id} ({} in plan)", session.plan().len())
            } else {
                format!("{drug_id} is not in the plan")
            }
        }
        SessionCommand::Plan => {
            if json_output {
                json::to_pretty(session.plan())?
            } else {
                markdown::plan_markdown(session.plan(), disease_name(session))?
            }
        }
        SessionCommand::Preview => match session.document(crate::utils::date::today()) {
            Some(document) if json_output => json::to_pretty(&document)?,
            Some(document) => markdown::document_markdown(&document)?,
            None => "The plan is empty; add drugs before previewing.".to_string(),
        },
        SessionCommand::Export {
            output_dir: explicit_dir,
            issued_on,
        } => {
            let issued = super::issued_on(issued_on.as_deref())?;
            match session.document(issued) {
                Some(document) => {
                    let dir = explicit_dir.as_deref().or(output_dir);
                    let path = super::write_document(&document, dir).await?;
                    super::export_message(&document, &path, session.plan().len(), json_output)?
                }
                None => "The plan is empty; nothing to export.".to_string(),
            }
        }
        SessionCommand::Reset => {
            session.reset();
            status(session, json_output)?
        }
    };
    Ok(Step::Output(output))
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(cli: super::Cli) -> anyhow::Result<()> {
    let backend = super::Backend::connect(cli.fixtures.as_deref()).await?;
    let mut session = backend.protected_session().await?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let intro = format!("{}\n{HELP}\n", status(&session, cli.json)?);
    stdout.write_all(intro.as_bytes()).await?;

    loop {
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match dispatch(&mut session, &line, cli.json, None).await {
            Ok(Step::Quit) => break,
            Ok(Step::Output(text)) if text.is_empty() => {}
            Ok(Step::Output(text)) => {
                stdout.write_all(text.as_bytes()).await?;
                if !text.ends_with('\n') {
                    stdout.write_all(b"\n").await?;
                }
            }
            Err(err) => {
                stdout.write_all(format!("Error: {err}\n").as_bytes()).await?;
            }
        }
    }
    stdout.flush().await?;
    Ok(())
}
