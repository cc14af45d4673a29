use serde::Serialize;

use crate::error::FarmacoError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, FarmacoError> {
    Ok(serde_json::to_string_pretty(value)?)
}
