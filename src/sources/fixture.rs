//! Offline record store backed by a local JSON file shaped like
//! `{"diseases": [...], "drugs": [...], "links": [...]}` with store column names.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::entities::{Catalog, Disease, DiseaseDrugLink, Drug};
use crate::error::FarmacoError;
use crate::sources::{IdentityProvider, RecordStore};

#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    catalog: Catalog,
}

impl FixtureStore {
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub async fn load(path: &Path) -> Result<Self, FarmacoError> {
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            FarmacoError::InvalidArgument(format!(
                "Cannot read fixture file {}: {err}",
                path.display()
            ))
        })?;
        let catalog: Catalog = serde_json::from_slice(&bytes)?;
        debug!(
            path = %path.display(),
            diseases = catalog.diseases.len(),
            drugs = catalog.drugs.len(),
            links = catalog.links.len(),
            "loaded fixture catalog"
        );
        Ok(Self { catalog })
    }

    pub fn resolve_path(path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[async_trait]
impl RecordStore for FixtureStore {
    async fn fetch_drugs(&self) -> Result<Vec<Drug>, FarmacoError> {
        Ok(self.catalog.drugs.clone())
    }

    async fn fetch_diseases(&self) -> Result<Vec<Disease>, FarmacoError> {
        let mut diseases = self.catalog.diseases.clone();
        crate::entities::disease::sort_by_name(&mut diseases);
        Ok(diseases)
    }

    async fn fetch_links(&self, disease_id: &str) -> Result<Vec<DiseaseDrugLink>, FarmacoError> {
        Ok(self
            .catalog
            .links
            .iter()
            .filter(|link| link.disease_id == disease_id && !link.drug_id.trim().is_empty())
            .cloned()
            .collect())
    }
}

/// Local fixtures carry no identity; they stand for an already signed-in session.
#[async_trait]
impl IdentityProvider for FixtureStore {
    async fn is_authenticated(&self) -> bool {
        true
    }
}
