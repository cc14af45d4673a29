//! One interactive lookup episode: the raw catalog, the wizard picks and the
//! plan, kept as canonical state. Derived sets are recomputed from it on
//! every read.

use std::sync::Arc;

use time::Date;
use tracing::{debug, warn};

use crate::document::{self, PlanDocument};
use crate::entities::{Catalog, Drug};
use crate::error::FarmacoError;
use crate::plan::TherapeuticPlan;
use crate::sources::RecordStore;
use crate::wizard::{WizardReport, WizardSelection, WizardView};

pub struct Session {
    store: Arc<dyn RecordStore>,
    catalog: Catalog,
    selection: WizardSelection,
    plan: TherapeuticPlan,
}

fn or_empty<T>(what: &str, result: Result<Vec<T>, FarmacoError>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(err) => {
            warn!(collection = what, error = %err, "fetch failed; continuing with no rows");
            Vec::new()
        }
    }
}

fn invalid_choice(kind: &str, value: &str, valid: &[String]) -> FarmacoError {
    let options = if valid.is_empty() {
        "none available".to_string()
    } else {
        valid.join(", ")
    };
    FarmacoError::InvalidArgument(format!(
        "Unknown {kind} '{value}'. Valid values: {options}"
    ))
}

/// The offered option a typed value refers to: an exact match, else the
/// single option equal to it once both are trimmed.
fn offered<'a>(value: &str, options: &'a [String]) -> Option<&'a String> {
    if let Some(exact) = options.iter().find(|o| o.as_str() == value) {
        return Some(exact);
    }
    let wanted = value.trim();
    let mut loose = options.iter().filter(|o| o.trim() == wanted);
    match (loose.next(), loose.next()) {
        (Some(option), None) => Some(option),
        _ => None,
    }
}

fn blank_as_none(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl Session {
    /// Fetches drugs and diseases concurrently. A failed fetch leaves its
    /// collection empty.
    pub async fn load(store: Arc<dyn RecordStore>) -> Self {
        let (drugs, diseases) = tokio::join!(store.fetch_drugs(), store.fetch_diseases());
        let catalog = Catalog {
            drugs: or_empty("drugs", drugs),
            diseases: or_empty("diseases", diseases),
            links: Vec::new(),
        };
        debug!(
            drugs = catalog.drugs.len(),
            diseases = catalog.diseases.len(),
            "session loaded"
        );
        Self {
            store,
            catalog,
            selection: WizardSelection::default(),
            plan: TherapeuticPlan::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &WizardSelection {
        &self.selection
    }

    pub fn plan(&self) -> &TherapeuticPlan {
        &self.plan
    }

    pub fn view(&self) -> WizardView<'_> {
        WizardView::derive(&self.catalog, &self.selection)
    }

    pub fn report(&self) -> WizardReport {
        WizardReport::new(&self.catalog, &self.selection, &self.view())
    }

    /// Chooses (or clears, with `None`) the disease by id or name. Always
    /// empties ingredient, form and plan, then reloads the link rows.
    pub async fn select_disease(&mut self, query: Option<&str>) -> Result<(), FarmacoError> {
        let disease_id = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => Some(
                crate::entities::disease::resolve(&self.catalog.diseases, q)?
                    .id
                    .clone(),
            ),
            None => None,
        };

        self.selection.select_disease(disease_id.clone());
        self.plan.clear();
        self.catalog.links = match disease_id.as_deref() {
            Some(id) => or_empty("links", self.store.fetch_links(id).await),
            None => Vec::new(),
        };
        debug!(
            disease = disease_id.as_deref().unwrap_or("-"),
            links = self.catalog.links.len(),
            "disease selected"
        );
        Ok(())
    }

    pub fn select_ingredient(&mut self, ingredient: Option<&str>) -> Result<(), FarmacoError> {
        let ingredient = match blank_as_none(ingredient) {
            None => None,
            Some(value) => {
                if self.selection.disease().is_none() {
                    return Err(FarmacoError::InvalidArgument(
                        "Choose a disease before the active ingredient".into(),
                    ));
                }
                let view = self.view();
                match offered(value, &view.ingredients) {
                    Some(option) => Some(option.clone()),
                    None => {
                        return Err(invalid_choice("active ingredient", value, &view.ingredients))
                    }
                }
            }
        };
        debug!(ingredient = ingredient.as_deref().unwrap_or("-"), "ingredient selected");
        self.selection.select_ingredient(ingredient);
        Ok(())
    }

    pub fn select_form(&mut self, form: Option<&str>) -> Result<(), FarmacoError> {
        let form = match blank_as_none(form) {
            None => None,
            Some(value) => {
                if self.selection.ingredient().is_none() {
                    return Err(FarmacoError::InvalidArgument(
                        "Choose an active ingredient before the pharmaceutical form".into(),
                    ));
                }
                let view = self.view();
                match offered(value, &view.forms) {
                    Some(option) => Some(option.clone()),
                    None => return Err(invalid_choice("pharmaceutical form", value, &view.forms)),
                }
            }
        };
        debug!(form = form.as_deref().unwrap_or("-"), "form selected");
        self.selection.select_form(form);
        Ok(())
    }

    /// Adds one of the visible results. Returns `false` when the drug is
    /// already in the plan.
    pub fn add_to_plan(&mut self, drug_id: &str, note: Option<&str>) -> Result<bool, FarmacoError> {
        let drug_id = drug_id.trim();
        let drug: Drug = {
            let view = self.view();
            if !view.is_complete() {
                return Err(FarmacoError::InvalidArgument(
                    "Complete the search before adding drugs to the plan".into(),
                ));
            }
            match view.visible_results().iter().find(|d| d.id == drug_id) {
                Some(drug) => (*drug).clone(),
                None => {
                    return Err(FarmacoError::NotFound {
                        entity: "drug".into(),
                        id: drug_id.to_string(),
                        suggestion: "Only drugs listed in the current results can be added."
                            .into(),
                    });
                }
            }
        };
        let added = self.plan.add(&drug, note);
        debug!(drug = drug_id, added, size = self.plan.len(), "plan add");
        Ok(added)
    }

    /// Walks the wizard to a drug linked to the chosen disease (its ingredient,
    /// then its form when a form step is needed) and adds it to the plan.
    pub fn add_candidate(&mut self, drug_id: &str, note: Option<&str>) -> Result<bool, FarmacoError> {
        let drug_id = drug_id.trim();
        let (ingredient, form) = {
            let view = self.view();
            let Some(drug) = view.candidates.iter().find(|d| d.id == drug_id) else {
                return Err(FarmacoError::NotFound {
                    entity: "drug".into(),
                    id: drug_id.to_string(),
                    suggestion: "The drug is not linked to the selected disease. Try: farmacohub search --disease <id>"
                        .into(),
                });
            };
            (
                drug.ingredient().map(str::to_string),
                drug.form().map(str::to_string),
            )
        };
        let Some(ingredient) = ingredient else {
            return Err(FarmacoError::InvalidArgument(format!(
                "Drug {drug_id} has no active ingredient and cannot be reached through the search"
            )));
        };

        self.select_ingredient(Some(&ingredient))?;
        if self.view().needs_form_step() {
            self.select_form(form.as_deref())?;
        }
        self.add_to_plan(drug_id, note)
    }

    pub fn remove_from_plan(&mut self, drug_id: &str) -> bool {
        let removed = self.plan.remove(drug_id.trim());
        debug!(drug = drug_id, removed, size = self.plan.len(), "plan remove");
        removed
    }

    /// Back to step one with an empty plan; the fetched drugs and diseases stay.
    pub fn reset(&mut self) {
        self.selection.clear();
        self.plan.clear();
        self.catalog.links.clear();
    }

    /// Layout of the current plan, or `None` when the plan is empty.
    pub fn document(&self, issued_on: Date) -> Option<PlanDocument> {
        if self.plan.is_empty() {
            return None;
        }
        let disease = self
            .selection
            .disease()
            .and_then(|id| self.catalog.disease(id));
        Some(document::build(
            self.plan.entries(),
            disease.map(|d| d.name.as_str()).unwrap_or_default(),
            disease.and_then(|d| d.exemption()),
            issued_on,
        ))
    }
}
