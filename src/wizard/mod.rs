//! Cascading filter engine: disease → active ingredient → [pharmaceutical form].
//!
//! `WizardSelection` is the only mutable state; everything else is derived
//! from it and the raw catalog by [`WizardView::derive`].

pub mod filter;
pub mod stage;

use serde::Serialize;

use crate::entities::{Catalog, Drug};

pub use filter::{
    available_forms, available_ingredients, candidates_for_disease, candidates_for_ingredient,
    final_candidates, needs_form_step,
};
pub use stage::WizardStage;

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The three optional picks. Choosing a disease clears ingredient and form;
/// choosing an ingredient clears form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WizardSelection {
    disease: Option<String>,
    ingredient: Option<String>,
    form: Option<String>,
}

impl WizardSelection {
    pub fn disease(&self) -> Option<&str> {
        self.disease.as_deref()
    }

    pub fn ingredient(&self) -> Option<&str> {
        self.ingredient.as_deref()
    }

    pub fn form(&self) -> Option<&str> {
        self.form.as_deref()
    }

    pub fn select_disease(&mut self, disease_id: Option<String>) {
        self.disease = normalize(disease_id);
        self.ingredient = None;
        self.form = None;
    }

    pub fn select_ingredient(&mut self, ingredient: Option<String>) {
        self.ingredient = normalize(ingredient);
        self.form = None;
    }

    pub fn select_form(&mut self, form: Option<String>) {
        self.form = normalize(form);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Every derived set for one selection state, recomputed from scratch.
#[derive(Debug, Clone)]
pub struct WizardView<'a> {
    pub candidates: Vec<&'a Drug>,
    pub ingredients: Vec<String>,
    pub ingredient_filtered: Vec<&'a Drug>,
    pub forms: Vec<String>,
    pub final_candidates: Vec<&'a Drug>,
    pub stage: WizardStage,
}

impl<'a> WizardView<'a> {
    pub fn derive(catalog: &'a Catalog, selection: &WizardSelection) -> Self {
        let candidates =
            candidates_for_disease(&catalog.drugs, &catalog.links, selection.disease());
        let ingredients = available_ingredients(&candidates);
        let ingredient_filtered = candidates_for_ingredient(&candidates, selection.ingredient());
        let forms = available_forms(&ingredient_filtered);
        let final_candidates = final_candidates(&ingredient_filtered, selection.form());

        let disease_selected = selection.disease().is_some();
        let ingredient_selected = selection.ingredient().is_some();
        let form_step_needed = needs_form_step(disease_selected, ingredient_selected, &forms);
        let stage = WizardStage::resolve(
            disease_selected,
            ingredient_selected,
            selection.form().is_some(),
            form_step_needed,
        );

        Self {
            candidates,
            ingredients,
            ingredient_filtered,
            forms,
            final_candidates,
            stage,
        }
    }

    pub fn current_step(&self) -> u8 {
        self.stage.current_step()
    }

    pub fn total_steps(&self) -> u8 {
        self.stage.total_steps()
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_complete()
    }

    pub fn needs_form_step(&self) -> bool {
        self.stage.needs_form_step()
    }

    pub fn progress_percent(&self) -> f64 {
        self.stage.progress_percent()
    }

    /// Results shown to the user: nothing until the wizard is complete.
    pub fn visible_results(&self) -> &[&'a Drug] {
        match self.stage {
            WizardStage::CompleteWithoutForm => &self.ingredient_filtered,
            WizardStage::CompleteWithForm => &self.final_candidates,
            _ => &[],
        }
    }
}

/// Owned, serializable snapshot of the wizard for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct WizardReport {
    pub stage: WizardStage,
    pub current_step: u8,
    pub total_steps: u8,
    pub complete: bool,
    pub progress: u8,
    pub needs_form_step: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disease_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disease_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exemption_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    pub candidate_count: usize,
    pub ingredients: Vec<String>,
    pub forms: Vec<String>,
    pub results: Vec<Drug>,
}

impl WizardReport {
    pub fn new(catalog: &Catalog, selection: &WizardSelection, view: &WizardView<'_>) -> Self {
        let disease = selection.disease().and_then(|id| catalog.disease(id));
        Self {
            stage: view.stage,
            current_step: view.current_step(),
            total_steps: view.total_steps(),
            complete: view.is_complete(),
            progress: view.stage.progress_display(),
            needs_form_step: view.needs_form_step(),
            disease_id: selection.disease().map(str::to_string),
            disease_name: disease.map(|d| d.name.clone()),
            exemption_code: disease.and_then(|d| d.exemption()).map(str::to_string),
            ingredient: selection.ingredient().map(str::to_string),
            form: selection.form().map(str::to_string),
            candidate_count: view.candidates.len(),
            ingredients: view.ingredients.clone(),
            forms: view.forms.clone(),
            results: view.visible_results().iter().map(|d| (*d).clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Disease, DiseaseDrugLink};

    fn drug(id: &str, name: &str, ingredient: Option<&str>, form: Option<&str>) -> Drug {
        Drug {
            id: id.into(),
            name: name.into(),
            active_ingredient: ingredient.map(Into::into),
            pharmaceutical_form: form.map(Into::into),
            posology: Some("1 cp al bisogno".into()),
            category: None,
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            diseases: vec![
                Disease {
                    id: "emi".into(),
                    name: "Emicrania".into(),
                    exemption_code: Some("04".into()),
                },
                Disease {
                    id: "asma".into(),
                    name: "Asma".into(),
                    exemption_code: None,
                },
                Disease {
                    id: "orfana".into(),
                    name: "Orfana".into(),
                    exemption_code: None,
                },
            ],
            drugs: vec![
                drug("1", "Tachipirina", Some("Paracetamolo"), Some("Compresse")),
                drug("2", "Efferalgan", Some("Paracetamolo"), Some("Supposte")),
                drug("3", "Brufen", Some("Ibuprofene"), None),
                drug("4", "Ventolin", Some("Salbutamolo"), Some("Spray")),
            ],
            links: vec![
                link("emi", "1"),
                link("emi", "2"),
                link("emi", "3"),
                link("asma", "4"),
            ],
        }
    }

    fn link(disease: &str, drug: &str) -> DiseaseDrugLink {
        DiseaseDrugLink {
            disease_id: disease.into(),
            drug_id: drug.into(),
        }
    }

    fn result_ids(view: &WizardView<'_>) -> Vec<String> {
        view.visible_results().iter().map(|d| d.id.clone()).collect()
    }

    #[test]
    fn fresh_wizard_is_step_one_of_three() {
        let catalog = catalog();
        let view = WizardView::derive(&catalog, &WizardSelection::default());
        assert_eq!(view.current_step(), 1);
        assert_eq!(view.total_steps(), 3);
        assert!(view.needs_form_step());
        assert!(view.visible_results().is_empty());
        assert_eq!(view.progress_percent(), 0.0);
    }

    #[test]
    fn selecting_disease_offers_ingredients() {
        let catalog = catalog();
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("emi".into()));
        let view = WizardView::derive(&catalog, &selection);
        assert_eq!(view.current_step(), 2);
        assert_eq!(view.ingredients, vec!["Ibuprofene", "Paracetamolo"]);
        assert_eq!(view.stage.progress_display(), 33);
        assert!(view.visible_results().is_empty());
    }

    #[test]
    fn ingredient_with_forms_requires_third_step() {
        let catalog = catalog();
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("emi".into()));
        selection.select_ingredient(Some("Paracetamolo".into()));
        let view = WizardView::derive(&catalog, &selection);
        assert_eq!(view.forms, vec!["Compresse", "Supposte"]);
        assert_eq!(view.current_step(), 3);
        assert!(!view.is_complete());
        assert!(view.visible_results().is_empty());

        selection.select_form(Some("Supposte".into()));
        let view = WizardView::derive(&catalog, &selection);
        assert!(view.is_complete());
        assert_eq!(view.current_step(), 3);
        assert_eq!(view.progress_percent(), 100.0);
        assert_eq!(result_ids(&view), vec!["2"]);
    }

    #[test]
    fn ingredient_without_forms_completes_at_step_two() {
        let catalog = catalog();
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("emi".into()));
        selection.select_ingredient(Some("Ibuprofene".into()));
        let view = WizardView::derive(&catalog, &selection);
        assert!(!view.needs_form_step());
        assert_eq!(view.total_steps(), 2);
        assert_eq!(view.current_step(), 2);
        assert!(view.is_complete());
        assert_eq!(view.progress_percent(), 100.0);
        assert_eq!(result_ids(&view), vec!["3"]);
    }

    #[test]
    fn disease_without_links_cannot_progress() {
        let catalog = catalog();
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("orfana".into()));
        let view = WizardView::derive(&catalog, &selection);
        assert!(view.candidates.is_empty());
        assert!(view.ingredients.is_empty());
        assert_eq!(view.current_step(), 2);
        assert!(!view.is_complete());
        assert!(view.visible_results().is_empty());
    }

    #[test]
    fn selecting_disease_clears_downstream_picks() {
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("emi".into()));
        selection.select_ingredient(Some("Paracetamolo".into()));
        selection.select_form(Some("Compresse".into()));

        selection.select_disease(Some("emi".into()));
        assert_eq!(selection.disease(), Some("emi"));
        assert!(selection.ingredient().is_none());
        assert!(selection.form().is_none());

        selection.select_ingredient(Some("Paracetamolo".into()));
        selection.select_form(Some("Compresse".into()));
        selection.select_ingredient(Some("Ibuprofene".into()));
        assert!(selection.form().is_none());
    }

    #[test]
    fn blank_picks_are_unset() {
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("  ".into()));
        assert!(selection.disease().is_none());
    }

    #[test]
    fn empty_catalog_yields_no_candidates() {
        let catalog = Catalog::default();
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("emi".into()));
        selection.select_ingredient(Some("Paracetamolo".into()));
        let view = WizardView::derive(&catalog, &selection);
        assert!(view.candidates.is_empty());
        // No forms can exist, so the wizard counts as done with nothing to show.
        assert!(view.is_complete());
        assert!(view.visible_results().is_empty());
    }

    #[test]
    fn report_carries_disease_metadata() {
        let catalog = catalog();
        let mut selection = WizardSelection::default();
        selection.select_disease(Some("emi".into()));
        selection.select_ingredient(Some("Ibuprofene".into()));
        let view = WizardView::derive(&catalog, &selection);
        let report = WizardReport::new(&catalog, &selection, &view);
        assert_eq!(report.disease_name.as_deref(), Some("Emicrania"));
        assert_eq!(report.exemption_code.as_deref(), Some("04"));
        assert_eq!(report.progress, 100);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.candidate_count, 3);
    }
}
