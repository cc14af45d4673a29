//! Candidate derivations for each wizard step.
//!
//! Every function is a pure recomputation over the raw collections; none of
//! them fail, and an empty or not-yet-loaded input yields an empty output.
//! Ingredient and form matching is case-sensitive and exact.

use std::collections::{BTreeSet, HashSet};

use crate::entities::{DiseaseDrugLink, Drug};

/// Drugs linked to `disease_id`, in drug-collection order.
pub fn candidates_for_disease<'a>(
    drugs: &'a [Drug],
    links: &[DiseaseDrugLink],
    disease_id: Option<&str>,
) -> Vec<&'a Drug> {
    let Some(disease_id) = disease_id.filter(|id| !id.is_empty()) else {
        return Vec::new();
    };
    let linked: HashSet<&str> = links
        .iter()
        .filter(|link| link.disease_id == disease_id)
        .map(|link| link.drug_id.as_str())
        .collect();
    if linked.is_empty() {
        return Vec::new();
    }
    drugs
        .iter()
        .filter(|drug| linked.contains(drug.id.as_str()))
        .collect()
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct non-empty active ingredients, ascending.
pub fn available_ingredients(candidates: &[&Drug]) -> Vec<String> {
    distinct_sorted(candidates.iter().filter_map(|d| d.ingredient()))
}

pub fn candidates_for_ingredient<'a>(
    candidates: &[&'a Drug],
    ingredient: Option<&str>,
) -> Vec<&'a Drug> {
    match ingredient {
        None => candidates.to_vec(),
        Some(ingredient) => candidates
            .iter()
            .copied()
            .filter(|d| d.active_ingredient.as_deref() == Some(ingredient))
            .collect(),
    }
}

/// Distinct non-empty pharmaceutical forms, ascending.
pub fn available_forms(ingredient_filtered: &[&Drug]) -> Vec<String> {
    distinct_sorted(ingredient_filtered.iter().filter_map(|d| d.form()))
}

/// The form step is assumed until both a disease and an ingredient are
/// chosen; after that it is needed only when some form is available.
pub fn needs_form_step(
    disease_selected: bool,
    ingredient_selected: bool,
    available_forms: &[String],
) -> bool {
    if !disease_selected || !ingredient_selected {
        return true;
    }
    !available_forms.is_empty()
}

pub fn final_candidates<'a>(ingredient_filtered: &[&'a Drug], form: Option<&str>) -> Vec<&'a Drug> {
    match form {
        None => ingredient_filtered.to_vec(),
        Some(form) => ingredient_filtered
            .iter()
            .copied()
            .filter(|d| d.pharmaceutical_form.as_deref() == Some(form))
            .collect(),
    }
}
