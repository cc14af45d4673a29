//! Therapeutic-plan document layout.
//!
//! [`build`] turns plan entries into an ordered list of blocks; renderers
//! (`render::pdf`, `render::markdown`) decide positions and pagination.

pub mod placeholders;

use serde::Serialize;
use time::Date;

use crate::entities::Drug;
use crate::plan::PlanEntry;
use crate::utils::date::{italian_date, iso_date};

use placeholders::{DISCLAIMER, FACILITY, PATIENT, PRESCRIBER};

pub const TITLE: &str = "PIANO TERAPEUTICO";
pub const TABLE_HEADERS: [&str; 3] = ["FARMACO", "Forma farmaceutica", "Posologia"];
const MISSING: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanTable {
    pub headers: [String; 3],
    pub rows: Vec<[String; 3]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Title { text: String },
    Separator,
    Section { heading: String, lines: Vec<String> },
    Field { label: String, value: String },
    Table(PlanTable),
    Signature { label: String },
    Line { text: String },
    Footer { lines: Vec<String> },
    Disclaimer { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDocument {
    pub title: String,
    pub file_name: String,
    pub issued_on: String,
    pub blocks: Vec<Block>,
}

impl PlanDocument {
    pub fn table(&self) -> Option<&PlanTable> {
        self.blocks.iter().find_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Every printed text line in reading order; table cells are skipped.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Title { text } | Block::Line { text } | Block::Disclaimer { text } => {
                    out.push(text.clone())
                }
                Block::Section { heading, lines } => {
                    out.push(heading.clone());
                    out.extend(lines.iter().cloned());
                }
                Block::Field { label, value } => out.push(format!("{label} {value}")),
                Block::Signature { label } => out.push(label.clone()),
                Block::Footer { lines } => out.extend(lines.iter().cloned()),
                Block::Separator | Block::Table(_) => {}
            }
        }
        out
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// FARMACO cell text: the active ingredient, the note after ` - `, and
/// `(tipo <name>)` unless the name repeats the ingredient.
pub fn combined_label(ingredient: Option<&str>, name: Option<&str>, note: Option<&str>) -> String {
    let ingredient = ingredient.filter(|v| !v.is_empty()).unwrap_or(MISSING);
    let name = name.filter(|v| !v.is_empty()).unwrap_or(MISSING);
    let note = note.unwrap_or_default();

    let same = ingredient != MISSING
        && name != MISSING
        && ingredient.trim().to_lowercase() == name.trim().to_lowercase();

    match (same, note.is_empty()) {
        (true, true) => ingredient.to_string(),
        (true, false) => format!("{ingredient} - {note}"),
        (false, true) => format!("{ingredient} (tipo {name})"),
        (false, false) => format!("{ingredient} - {note} (tipo {name})"),
    }
}

fn row(entry: &PlanEntry) -> [String; 3] {
    let drug = &entry.drug;
    [
        combined_label(drug.ingredient(), drug.name(), entry.note.as_deref()),
        drug.form().unwrap_or(MISSING).to_string(),
        drug.posology().unwrap_or(MISSING).to_string(),
    ]
}

/// `Piano_Terapeutico_<patient>_<YYYY-MM-DD>.pdf`
pub fn file_name(date: Date) -> String {
    format!(
        "Piano_Terapeutico_{}_{}.pdf",
        PATIENT.file_stem(),
        iso_date(date)
    )
}

pub fn build(
    entries: &[PlanEntry],
    disease_name: &str,
    exemption_code: Option<&str>,
    issued_on: Date,
) -> PlanDocument {
    let issued = italian_date(issued_on);
    let mut blocks = vec![
        Block::Title {
            text: TITLE.to_string(),
        },
        Block::Separator,
        Block::Section {
            heading: "DATI DEL PAZIENTE".into(),
            lines: PATIENT.lines(),
        },
        Block::Separator,
        Block::Section {
            heading: "DATI DEL MEDICO".into(),
            lines: PRESCRIBER.lines(),
        },
        Block::Separator,
    ];

    if let Some(name) = present(Some(disease_name)) {
        blocks.push(Block::Field {
            label: "Patologia:".into(),
            value: name.to_string(),
        });
    }
    if let Some(code) = present(exemption_code) {
        blocks.push(Block::Field {
            label: "Codice Esenzione:".into(),
            value: code.to_string(),
        });
    }

    blocks.push(Block::Table(PlanTable {
        headers: TABLE_HEADERS.map(str::to_string),
        rows: entries.iter().map(row).collect(),
    }));
    blocks.push(Block::Signature {
        label: "Firma del Medico:".into(),
    });
    blocks.push(Block::Line {
        text: format!("Data di Emissione: {issued}"),
    });
    blocks.push(Block::Footer {
        lines: FACILITY.lines(),
    });
    blocks.push(Block::Disclaimer {
        text: DISCLAIMER.to_string(),
    });

    PlanDocument {
        title: TITLE.to_string(),
        file_name: file_name(issued_on),
        issued_on: issued,
        blocks,
    }
}

/// Single-drug prescription: a one-entry plan without a note.
pub fn build_single(
    drug: &Drug,
    disease_name: &str,
    exemption_code: Option<&str>,
    issued_on: Date,
) -> PlanDocument {
    build(
        &[PlanEntry::from(drug)],
        disease_name,
        exemption_code,
        issued_on,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn date() -> Date {
        Date::from_calendar_date(2024, Month::March, 5).unwrap()
    }

    fn entry(id: &str, name: &str, ingredient: Option<&str>, note: Option<&str>) -> PlanEntry {
        PlanEntry::new(
            &Drug {
                id: id.into(),
                name: name.into(),
                active_ingredient: ingredient.map(Into::into),
                pharmaceutical_form: Some("Compresse".into()),
                posology: None,
                category: None,
            },
            note,
        )
    }

    #[test]
    fn label_with_matching_name_shows_ingredient_only() {
        assert_eq!(
            combined_label(Some("Paracetamolo"), Some("Paracetamolo"), Some("")),
            "Paracetamolo"
        );
        assert_eq!(
            combined_label(Some(" paracetamolo"), Some("PARACETAMOLO "), Some("sera")),
            " paracetamolo - sera"
        );
    }

    #[test]
    fn label_with_different_name_appends_type() {
        assert_eq!(
            combined_label(Some("Paracetamolo"), Some("Tachipirina"), Some("dopo i pasti")),
            "Paracetamolo - dopo i pasti (tipo Tachipirina)"
        );
        assert_eq!(
            combined_label(Some("Paracetamolo"), Some("Tachipirina"), None),
            "Paracetamolo (tipo Tachipirina)"
        );
    }

    #[test]
    fn label_defaults_missing_values() {
        assert_eq!(combined_label(None, None, None), "N/A (tipo N/A)");
        assert_eq!(
            combined_label(None, Some("Brufen"), Some("al bisogno")),
            "N/A - al bisogno (tipo Brufen)"
        );
        assert_eq!(combined_label(Some("N/A"), Some("N/A"), None), "N/A (tipo N/A)");
    }

    #[test]
    fn header_fields_and_rows_follow_plan_order() {
        let entries = vec![
            entry("2", "Tachipirina", Some("Paracetamolo"), Some("dopo i pasti")),
            entry("1", "Ibuprofene", Some("Ibuprofene"), None),
        ];
        let doc = build(&entries, "Emicrania", Some("04"), date());
        let lines = doc.lines();
        assert!(lines.contains(&"Patologia: Emicrania".to_string()));
        assert!(lines.contains(&"Codice Esenzione: 04".to_string()));

        let table = doc.table().unwrap();
        assert_eq!(table.headers[0], "FARMACO");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0],
            [
                "Paracetamolo - dopo i pasti (tipo Tachipirina)".to_string(),
                "Compresse".to_string(),
                "N/A".to_string()
            ]
        );
        assert_eq!(table.rows[1][0], "Ibuprofene");
    }

    #[test]
    fn empty_disease_and_code_lines_are_omitted() {
        let doc = build(&[entry("1", "A", Some("B"), None)], "", None, date());
        assert!(
            !doc.blocks
                .iter()
                .any(|b| matches!(b, Block::Field { .. }))
        );

        let doc = build(&[entry("1", "A", Some("B"), None)], "Asma", Some(""), date());
        let lines = doc.lines();
        assert!(lines.contains(&"Patologia: Asma".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Codice Esenzione")));
    }

    #[test]
    fn disease_name_is_printed_as_stored() {
        let doc = build(&[entry("1", "A", Some("B"), None)], " Asma bronchiale ", None, date());
        assert!(doc.blocks.contains(&Block::Field {
            label: "Patologia:".into(),
            value: " Asma bronchiale ".into(),
        }));
    }

    #[test]
    fn dates_and_file_name() {
        let doc = build(&[entry("1", "A", Some("B"), None)], "Asma", None, date());
        assert_eq!(doc.issued_on, "05/03/2024");
        assert!(doc.lines().contains(&"Data di Emissione: 05/03/2024".to_string()));
        assert_eq!(doc.file_name, "Piano_Terapeutico_Mario_Rossi_2024-03-05.pdf");
    }

    #[test]
    fn fixed_blocks_frame_the_document() {
        let doc = build(&[entry("1", "A", Some("B"), None)], "Asma", None, date());
        assert_eq!(
            doc.blocks.first(),
            Some(&Block::Title {
                text: "PIANO TERAPEUTICO".into()
            })
        );
        assert!(matches!(doc.blocks.last(), Some(Block::Disclaimer { .. })));
        let lines = doc.lines();
        assert!(lines.contains(&"Medico Curante: Dott. Luigi Bianchi".to_string()));
        assert!(lines.contains(&"Codice Fiscale: RSSMRA80C15H501Z".to_string()));
    }

    #[test]
    fn single_drug_document_has_one_row() {
        let drug = entry("9", "Brufen", Some("Ibuprofene"), None).drug;
        let doc = build_single(&drug, "Emicrania", Some("04"), date());
        assert_eq!(doc.table().unwrap().rows.len(), 1);
        assert_eq!(doc.table().unwrap().rows[0][0], "Ibuprofene (tipo Brufen)");
    }
}
