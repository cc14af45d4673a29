//! Internal utility helpers for dates, export file writing, and serde helpers.

pub(crate) mod date;
pub(crate) mod download;
pub(crate) mod serde;
