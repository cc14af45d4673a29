use serde::{Deserialize, Serialize};

use crate::error::FarmacoError;

/// A medical condition (`malattia`) with its optional insurance exemption code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disease {
    #[serde(deserialize_with = "crate::utils::serde::deserialize_id")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(
        rename = "codice_esenzione",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exemption_code: Option<String>,
}

impl Disease {
    /// Exemption code with blank values treated as absent.
    pub fn exemption(&self) -> Option<&str> {
        self.exemption_code
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

pub(crate) fn sort_by_name(diseases: &mut [Disease]) {
    diseases.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Resolves user input to a disease: exact identifier first, then a
/// case-insensitive name match.
pub fn resolve<'a>(diseases: &'a [Disease], query: &str) -> Result<&'a Disease, FarmacoError> {
    let q = query.trim();
    if q.is_empty() {
        return Err(FarmacoError::InvalidArgument(
            "Disease id or name is required".into(),
        ));
    }
    diseases
        .iter()
        .find(|d| d.id == q)
        .or_else(|| {
            let needle = q.to_lowercase();
            diseases
                .iter()
                .find(|d| d.name.trim().to_lowercase() == needle)
        })
        .ok_or_else(|| FarmacoError::NotFound {
            entity: "disease".into(),
            id: q.to_string(),
            suggestion: "Try listing: farmacohub diseases".into(),
        })
}
