//! Record shapes fetched from the store and the session-scoped raw catalog.

pub mod disease;
pub mod drug;

use serde::{Deserialize, Serialize};

pub use disease::Disease;
pub use drug::Drug;

/// One row of the `malattia_farmaco` join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseDrugLink {
    #[serde(
        rename = "malattia_id",
        deserialize_with = "crate::utils::serde::deserialize_id"
    )]
    pub disease_id: String,
    #[serde(
        rename = "farmaco_id",
        deserialize_with = "crate::utils::serde::deserialize_id"
    )]
    pub drug_id: String,
}

/// Raw collections as fetched. Each collection is written once per fetch and
/// only read afterwards; an empty collection means "not loaded" or "failed"
/// and is treated as "no candidates".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub diseases: Vec<Disease>,
    #[serde(default)]
    pub drugs: Vec<Drug>,
    #[serde(default)]
    pub links: Vec<DiseaseDrugLink>,
}

impl Catalog {
    pub fn disease(&self, id: &str) -> Option<&Disease> {
        self.diseases.iter().find(|d| d.id == id)
    }

    pub fn drug(&self, id: &str) -> Option<&Drug> {
        self.drugs.iter().find(|d| d.id == id)
    }
}
