use std::sync::OnceLock;

use minijinja::{Environment, ErrorKind, context};
use serde::Serialize;

use crate::cli::health::HealthReport;
use crate::document::{PlanDocument, combined_label};
use crate::entities::Disease;
use crate::error::FarmacoError;
use crate::plan::TherapeuticPlan;
use crate::wizard::WizardReport;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(Serialize)]
struct DiseaseRow<'a> {
    id: &'a str,
    name: &'a str,
    exemption: Option<&'a str>,
}

#[derive(Serialize)]
struct ResultRow<'a> {
    id: &'a str,
    name: Option<&'a str>,
    ingredient: Option<&'a str>,
    form: Option<&'a str>,
    posology: Option<&'a str>,
    category: Option<&'a str>,
    in_plan: bool,
}

#[derive(Serialize)]
struct PlanRow {
    id: String,
    label: String,
    form: String,
    posology: String,
}

fn env() -> Result<&'static Environment<'static>, FarmacoError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.add_filter("truncate", |s: String, max_bytes: usize| -> String {
        if s.len() <= max_bytes {
            return s;
        }
        if max_bytes == 0 {
            return "…".to_string();
        }
        let mut boundary = max_bytes;
        while boundary > 0 && !s.is_char_boundary(boundary) {
            boundary -= 1;
        }
        let mut out = s[..boundary].trim_end().to_string();
        out.push('…');
        out
    });
    // Table cells cannot contain raw pipes or newlines.
    env.add_filter("dash", |value: Option<String>| -> String {
        value
            .map(|v| v.replace('|', "/").replace(['\n', '\r'], " "))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "-".to_string())
    });
    env.add_template(
        "diseases.md.j2",
        include_str!("../../templates/diseases.md.j2"),
    )?;
    env.add_template("wizard.md.j2", include_str!("../../templates/wizard.md.j2"))?;
    env.add_template("plan.md.j2", include_str!("../../templates/plan.md.j2"))?;
    env.add_template(
        "document.md.j2",
        include_str!("../../templates/document.md.j2"),
    )?;

    env.add_template("health.md.j2", include_str!("../../templates/health.md.j2"))?;

    let _ = ENV.set(env);
    ENV.get().ok_or_else(|| {
        FarmacoError::Template(minijinja::Error::new(
            ErrorKind::InvalidOperation,
            "template environment failed to initialize",
        ))
    })
}

pub fn diseases_markdown(diseases: &[Disease]) -> Result<String, FarmacoError> {
    let tmpl = env()?.get_template("diseases.md.j2")?;
    let rows: Vec<DiseaseRow<'_>> = diseases
        .iter()
        .map(|d| DiseaseRow {
            id: &d.id,
            name: &d.name,
            exemption: d.exemption(),
        })
        .collect();
    Ok(tmpl.render(context! { diseases => rows })?)
}

pub fn wizard_markdown(
    report: &WizardReport,
    plan: &TherapeuticPlan,
) -> Result<String, FarmacoError> {
    let tmpl = env()?.get_template("wizard.md.j2")?;
    let results: Vec<ResultRow<'_>> = report
        .results
        .iter()
        .map(|d| ResultRow {
            id: &d.id,
            name: d.name(),
            ingredient: d.ingredient(),
            form: d.form(),
            posology: d.posology(),
            category: d.category(),
            in_plan: plan.contains_id(&d.id),
        })
        .collect();
    Ok(tmpl.render(context! {
        stage => report.stage,
        current_step => report.current_step,
        total_steps => report.total_steps,
        progress => report.progress,
        complete => report.complete,
        disease_name => &report.disease_name,
        exemption_code => &report.exemption_code,
        ingredient => &report.ingredient,
        form => &report.form,
        candidate_count => report.candidate_count,
        ingredients => &report.ingredients,
        forms => &report.forms,
        results => results,
    })?)
}

pub fn plan_markdown(
    plan: &TherapeuticPlan,
    disease_name: Option<&str>,
) -> Result<String, FarmacoError> {
    let tmpl = env()?.get_template("plan.md.j2")?;
    let entries: Vec<PlanRow> = plan
        .entries()
        .iter()
        .map(|e| PlanRow {
            id: e.id().to_string(),
            label: combined_label(e.drug.ingredient(), e.drug.name(), e.note.as_deref()),
            form: e.drug.form().unwrap_or("N/A").to_string(),
            posology: e.drug.posology().unwrap_or("N/A").to_string(),
        })
        .collect();
    Ok(tmpl.render(context! {
        disease_name => disease_name,
        entries => entries,
    })?)
}

pub fn document_markdown(document: &PlanDocument) -> Result<String, FarmacoError> {
    let tmpl = env()?.get_template("document.md.j2")?;
    Ok(tmpl.render(context! {
        blocks => &document.blocks,
        file_name => &document.file_name,
    })?)
}

pub fn health_markdown(report: &HealthReport) -> Result<String, FarmacoError> {
    let tmpl = env()?.get_template("health.md.j2")?;
    Ok(tmpl.render(context! {
        rows => &report.rows,
        healthy => report.healthy,
        total => report.total,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Catalog, DiseaseDrugLink, Drug};
    use crate::wizard::{WizardSelection, WizardView};
    use time::{Date, Month};

    fn drug(id: &str, name: &str, ingredient: &str, posology: Option<&str>) -> Drug {
        Drug {
            id: id.into(),
            name: name.into(),
            active_ingredient: Some(ingredient.into()),
            pharmaceutical_form: None,
            posology: posology.map(Into::into),
            category: Some("FANS".into()),
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            diseases: vec![Disease {
                id: "2".into(),
                name: "Emicrania".into(),
                exemption_code: Some("04".into()),
            }],
            drugs: vec![
                drug("10", "Brufen", "Ibuprofene", Some("400 mg | 2 volte")),
                drug("11", "Moment", "Ibuprofene", None),
            ],
            links: vec![
                DiseaseDrugLink {
                    disease_id: "2".into(),
                    drug_id: "10".into(),
                },
                DiseaseDrugLink {
                    disease_id: "2".into(),
                    drug_id: "11".into(),
                },
            ],
        }
    }

    #[test]
    fn diseases_markdown_lists_exemptions() {
        let catalog = catalog();
        let md = diseases_markdown(&catalog.diseases).unwrap();
        assert!(md.contains("| 2 | Emicrania | 04 |"));
        assert!(md.contains("Showing 1 diseases"));

        let empty = diseases_markdown(&[]).unwrap();
        assert!(empty.contains("No diseases available."));
    }

    #[test]
    fn wizard_markdown_shows_progress_and_ingredients() {
        let catalog = catalog();
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("2".into()));
        let view = WizardView::derive(&catalog, &selection);
        let report = WizardReport::new(&catalog, &selection, &view);
        let md = wizard_markdown(&report, &TherapeuticPlan::new()).unwrap();
        assert!(md.contains("Step 2 of 3 (33%)"));
        assert!(md.contains("- Malattia: Emicrania (esenzione 04)"));
        assert!(md.contains("- Ibuprofene"));
        assert!(!md.contains("## Risultati"));
    }

    #[test]
    fn wizard_markdown_marks_plan_members_and_missing_fields() {
        let catalog = catalog();
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("2".into()));
        selection.select_ingredient(Some("Ibuprofene".into()));
        let view = WizardView::derive(&catalog, &selection);
        let report = WizardReport::new(&catalog, &selection, &view);
        let mut plan = TherapeuticPlan::new();
        plan.add(&catalog.drugs[0], None);

        let md = wizard_markdown(&report, &plan).unwrap();
        assert!(md.contains("Step 2 of 2 (100%)"));
        assert!(md.contains("## Risultati (2)"));
        assert!(md.contains("| 10 | Brufen | Ibuprofene | - | 400 mg / 2 volte | FANS | ✓ |"));
        assert!(md.contains("| 11 | Moment | Ibuprofene | - | - | FANS |  |"));
    }

    #[test]
    fn plan_markdown_uses_combined_labels() {
        let catalog = catalog();
        let mut plan = TherapeuticPlan::new();
        plan.add(&catalog.drugs[0], Some("dopo i pasti"));
        let md = plan_markdown(&plan, Some("Emicrania")).unwrap();
        assert!(md.contains("# Piano terapeutico: Emicrania"));
        assert!(md.contains("Ibuprofene - dopo i pasti (tipo Brufen)"));
        assert!(md.contains("1 drugs in plan."));

        let empty = plan_markdown(&TherapeuticPlan::new(), None).unwrap();
        assert!(empty.contains("The plan is empty"));
    }

    #[test]
    fn document_markdown_previews_layout() {
        let catalog = catalog();
        let mut plan = TherapeuticPlan::new();
        plan.add(&catalog.drugs[1], None);
        let date = Date::from_calendar_date(2024, Month::January, 9).unwrap();
        let doc = crate::document::build(plan.entries(), "Emicrania", Some("04"), date);
        let md = document_markdown(&doc).unwrap();
        assert!(md.starts_with("# PIANO TERAPEUTICO"));
        assert!(md.contains("**Patologia:** Emicrania"));
        assert!(md.contains("| FARMACO | Forma farmaceutica | Posologia |"));
        assert!(md.contains("| Ibuprofene (tipo Moment) | N/A | N/A |"));
        assert!(md.contains("Data di Emissione: 09/01/2024"));
        assert!(md.contains("Piano_Terapeutico_Mario_Rossi_2024-01-09.pdf"));
    }

    #[tokio::test]
    async fn health_markdown_lists_checks_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let report = crate::cli::health::check(
            crate::cli::health::Backend::Fixtures(&missing),
            dir.path(),
            false,
        )
        .await;
        let md = health_markdown(&report).unwrap();
        assert!(md.starts_with("# FarmacoHub Health Check"));
        assert!(md.contains("| Fixture catalog ("));
        assert!(md.contains("| error |"));
        assert!(md.contains("| ok |"));
        assert!(md.contains("Status: 1/2 checks healthy"));
    }
}
