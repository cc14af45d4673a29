use serde::{Deserialize, Serialize};

/// A medication record (`farmaco`) as fetched from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drug {
    #[serde(deserialize_with = "crate::utils::serde::deserialize_id")]
    pub id: String,
    #[serde(
        rename = "nome",
        default,
        deserialize_with = "crate::utils::serde::deserialize_nullable_string"
    )]
    pub name: String,
    #[serde(
        rename = "principio_attivo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub active_ingredient: Option<String>,
    #[serde(
        rename = "forma_farmaceutica",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pharmaceutical_form: Option<String>,
    #[serde(rename = "posologia", default, skip_serializing_if = "Option::is_none")]
    pub posology: Option<String>,
    #[serde(rename = "tipologia", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

impl Drug {
    pub fn name(&self) -> Option<&str> {
        Some(self.name.as_str()).filter(|v| !v.is_empty())
    }

    pub fn ingredient(&self) -> Option<&str> {
        non_empty(self.active_ingredient.as_ref())
    }

    pub fn form(&self) -> Option<&str> {
        non_empty(self.pharmaceutical_form.as_ref())
    }

    pub fn posology(&self) -> Option<&str> {
        non_empty(self.posology.as_ref())
    }

    pub fn category(&self) -> Option<&str> {
        non_empty(self.category.as_ref())
    }
}
