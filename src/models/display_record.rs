use super::Record;

pub const NO_NAME: &str = "SIN NOMBRE";
pub const NO_EMAIL: &str = "sin email";

const NAME_KEYS: &[&str] = &["nombre", "name"];
const SURNAME_KEYS: &[&str] = &["apellidos", "surname"];
const EMAIL_KEYS: &[&str] = &["email"];
const PHONE_KEYS: &[&str] = &["telefono", "phone"];
const GOAL_KEYS: &[&str] = &["objetivoNutricional"];
const WEIGHT_KEYS: &[&str] = &["pesoActual"];

/// Display fields derived from one record, with every fallback already applied
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRecord {
    pub display_name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    pub goal: Option<String>,
    pub weight: Option<String>,
    pub id: String,
}

impl From<&Record> for DisplayRecord {
    fn from(record: &Record) -> Self {
        Self {
            display_name: record
                .first_non_empty(NAME_KEYS)
                .unwrap_or_else(|| NO_NAME.to_owned()),
            surname: record.first_non_empty(SURNAME_KEYS).unwrap_or_default(),
            email: record
                .first_non_empty(EMAIL_KEYS)
                .unwrap_or_else(|| NO_EMAIL.to_owned()),
            phone: record.first_non_empty(PHONE_KEYS),
            goal: record.first_non_empty(GOAL_KEYS),
            weight: record.first_non_empty(WEIGHT_KEYS),
            id: record.id.clone(),
        }
    }
}
