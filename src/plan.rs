//! The therapeutic plan: an insertion-ordered set of drugs, unique by id,
//! each with an optional free-text note.

use serde::{Deserialize, Serialize};

use crate::entities::Drug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    #[serde(flatten)]
    pub drug: Drug,
    #[serde(rename = "commenti", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PlanEntry {
    /// Copies the drug and attaches the note; blank notes become `None`.
    pub fn new(drug: &Drug, note: Option<&str>) -> Self {
        let note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Self {
            drug: drug.clone(),
            note,
        }
    }

    pub fn id(&self) -> &str {
        &self.drug.id
    }
}

impl From<&Drug> for PlanEntry {
    fn from(drug: &Drug) -> Self {
        Self::new(drug, None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TherapeuticPlan {
    entries: Vec<PlanEntry>,
}

impl TherapeuticPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the drug unless its id is already present. Returns whether the
    /// plan changed.
    pub fn add(&mut self, drug: &Drug, note: Option<&str>) -> bool {
        if self.contains_id(&drug.id) {
            return false;
        }
        self.entries.push(PlanEntry::new(drug, note));
        true
    }

    /// Removes the entry with this id. Returns whether the plan changed.
    pub fn remove(&mut self, drug_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id() != drug_id);
        self.entries.len() != before
    }

    pub fn contains_id(&self, drug_id: &str) -> bool {
        self.entries.iter().any(|e| e.id() == drug_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
