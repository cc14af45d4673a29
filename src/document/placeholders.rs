//! Fixed demo identity printed on every plan. None of it comes from user input.

pub struct Patient {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub birth_date: &'static str,
    pub age: &'static str,
    pub sex: &'static str,
    pub fiscal_code: &'static str,
    pub street: &'static str,
    pub postal_code: &'static str,
    pub city: &'static str,
    pub health_authority: &'static str,
    pub region: &'static str,
}

pub struct Prescriber {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub qualification: &'static str,
    pub specialty: &'static str,
    pub registration_number: &'static str,
    pub street: &'static str,
    pub postal_code: &'static str,
    pub city: &'static str,
    pub phone: &'static str,
    pub email: &'static str,
}

pub struct Facility {
    pub name: &'static str,
    pub address: &'static str,
    pub phone: &'static str,
    pub emergency_phone: &'static str,
    pub email: &'static str,
}

pub const PATIENT: Patient = Patient {
    first_name: "Mario",
    last_name: "Rossi",
    birth_date: "15/03/1980",
    age: "44",
    sex: "M",
    fiscal_code: "RSSMRA80C15H501Z",
    street: "Via Roma, 10",
    postal_code: "00100",
    city: "Roma",
    health_authority: "ASL Roma 1",
    region: "Lazio",
};

pub const PRESCRIBER: Prescriber = Prescriber {
    first_name: "Luigi",
    last_name: "Bianchi",
    qualification: "Medico Chirurgo",
    specialty: "Medicina Generale",
    registration_number: "12345",
    street: "Via Verdi, 20",
    postal_code: "00100",
    city: "Roma",
    phone: "06 1234567",
    email: "luigi.bianchi@aslroma1.it",
};

pub const FACILITY: Facility = Facility {
    name: "ASL Roma 1 - Presidio Ospedaliero",
    address: "Via di San Gallicano, 10, 00153 Roma",
    phone: "06 58541",
    emergency_phone: "118",
    email: "info@aslroma1.it",
};

pub const DISCLAIMER: &str =
    "Piano terapeutico generato automaticamente. Per uso informativo e non commerciale.";

impl Patient {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Nome: {} {}", self.first_name, self.last_name),
            format!(
                "Data di Nascita: {} (Età: {} anni)",
                self.birth_date, self.age
            ),
            format!("Sesso: {}", self.sex),
            format!("Codice Fiscale: {}", self.fiscal_code),
            format!(
                "Indirizzo: {}, {} {}",
                self.street, self.postal_code, self.city
            ),
            format!("ASL di Appartenenza: {}", self.health_authority),
            format!("Regione: {}", self.region),
        ]
    }

    /// Name fragment used in export file names; whitespace runs become `_`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.first_name, self.last_name)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl Prescriber {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Medico Curante: Dott. {} {}", self.first_name, self.last_name),
            format!("Qualifica: {} - {}", self.qualification, self.specialty),
            format!("N. Iscrizione Ordine: {}", self.registration_number),
            format!(
                "Indirizzo Professionale: {}, {} {}",
                self.street, self.postal_code, self.city
            ),
            format!("Telefono: {}", self.phone),
            format!("Email: {}", self.email),
        ]
    }
}

impl Facility {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("{} | {}", self.name, self.address),
            format!(
                "Tel: {} | Emergenze: {} | Email: {}",
                self.phone, self.emergency_phone, self.email
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_lines_match_printed_layout() {
        let patient = PATIENT.lines();
        assert_eq!(patient.len(), 7);
        assert_eq!(patient[1], "Data di Nascita: 15/03/1980 (Età: 44 anni)");
        assert_eq!(patient[4], "Indirizzo: Via Roma, 10, 00100 Roma");

        let prescriber = PRESCRIBER.lines();
        assert_eq!(prescriber[0], "Medico Curante: Dott. Luigi Bianchi");
        assert_eq!(
            prescriber[1],
            "Qualifica: Medico Chirurgo - Medicina Generale"
        );

        assert_eq!(
            FACILITY.lines()[1],
            "Tel: 06 58541 | Emergenze: 118 | Email: info@aslroma1.it"
        );
    }

    #[test]
    fn file_stem_collapses_whitespace() {
        assert_eq!(PATIENT.file_stem(), "Mario_Rossi");
        let spaced = Patient {
            first_name: "Maria  Grazia",
            last_name: "De Luca",
            ..PATIENT
        };
        assert_eq!(spaced.file_stem(), "Maria_Grazia_De_Luca");
    }
}
