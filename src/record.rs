// Typed business records

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name reserved for the record identifier column
pub const ID_FIELD: &str = "id";

const MAX_ID_LEN: usize = 256;
const MAX_FIELD_NAME_LEN: usize = 64;

/// The kinds of business record the store keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Quote,
    InventoryItem,
    Job,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Quote, RecordKind::InventoryItem, RecordKind::Job];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Quote => "quote",
            RecordKind::InventoryItem => "inventory_item",
            RecordKind::Job => "job",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quote" | "quotes" => Ok(RecordKind::Quote),
            "inventory_item" | "inventory" | "item" | "items" => Ok(RecordKind::InventoryItem),
            "job" | "jobs" => Ok(RecordKind::Job),
            other => Err(Error::InvalidRecord(format!("unknown record kind: {}", other))),
        }
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Parse a value the way a cell of unknown type would be read
    ///
    /// Dates win over numbers, numbers over text.
    pub fn infer(raw: &str) -> FieldValue {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return FieldValue::Date(date);
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

/// Current local calendar date, used for record stamps
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// One business entity: a kind, an immutable identifier, and named fields
///
/// Imported cells whose text differs from the typed value's display (`12.50`,
/// `040`, `2025-3-1`) keep their original text so export writes it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: RecordKind,
    id: String,
    fields: BTreeMap<String, FieldValue>,
    raw: BTreeMap<String, String>,
    created: Option<NaiveDate>,
    updated: Option<NaiveDate>,
}

impl Record {
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self {
            kind,
            id,
            fields: BTreeMap::new(),
            raw: BTreeMap::new(),
            created: None,
            updated: None,
        })
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Field value as text, with `id` resolving to the identifier
    pub fn text(&self, field: &str) -> Option<String> {
        if field == ID_FIELD {
            return Some(self.id.clone());
        }
        self.fields.get(field).map(|v| v.to_string())
    }

    /// Field value as it appears in a CSV cell: original text if kept, else the display form
    pub fn cell(&self, field: &str) -> Option<String> {
        match self.raw.get(field) {
            Some(raw) => Some(raw.clone()),
            None => self.text(field),
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Original cell text for fields whose display form differs from it
    pub fn raw_cells(&self) -> &BTreeMap<String, String> {
        &self.raw
    }

    /// Date the record was first stored
    pub fn created(&self) -> Option<NaiveDate> {
        self.created
    }

    /// Date the record was last changed in the store
    pub fn updated(&self) -> Option<NaiveDate> {
        self.updated
    }

    pub(crate) fn set_stamps(&mut self, created: Option<NaiveDate>, updated: Option<NaiveDate>) {
        self.created = created;
        self.updated = updated;
    }

    /// Set a field, returning the previous value
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<Option<FieldValue>> {
        validate_field_name(field)?;
        let value = value.into();
        if matches!(value, FieldValue::Number(n) if !n.is_finite()) {
            return Err(Error::InvalidRecord(format!("field {} must be a finite number", field)));
        }
        self.raw.remove(field);
        Ok(self.fields.insert(field.to_string(), value))
    }

    /// Set a field parsed from `raw`, keeping `raw` when it renders differently
    pub fn set_cell(&mut self, field: &str, value: FieldValue, raw: &str) -> Result<Option<FieldValue>> {
        let keep = value.to_string() != raw;
        let previous = self.set(field, value)?;
        if keep {
            self.raw.insert(field.to_string(), raw.to_string());
        }
        Ok(previous)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.raw.remove(field);
        self.fields.remove(field)
    }
}

/// Validate a record identifier
pub(crate) fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidRecord(
            "record ID cannot be empty or whitespace-only".to_string(),
        ));
    }
    if id.len() > MAX_ID_LEN {
        return Err(Error::InvalidRecord(format!(
            "record ID too long: {} chars (max {})",
            id.len(),
            MAX_ID_LEN
        )));
    }
    Ok(())
}

pub(crate) fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidRecord("field name cannot be empty".to_string()));
    }
    if name.len() > MAX_FIELD_NAME_LEN {
        return Err(Error::InvalidRecord(format!(
            "field name too long: {} (max {} chars)",
            name, MAX_FIELD_NAME_LEN
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::InvalidRecord(format!("invalid field name: {:?}", name)));
    }
    if name == ID_FIELD {
        return Err(Error::InvalidRecord("the id field cannot be reassigned".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_new_and_fields() {
        let record = Record::new(RecordKind::InventoryItem, "I-1")
            .unwrap()
            .with("name", "Ledger 2.4m")
            .unwrap()
            .with("qty", 40.0)
            .unwrap();

        assert_eq!(record.kind(), RecordKind::InventoryItem);
        assert_eq!(record.id(), "I-1");
        assert_eq!(record.get("qty"), Some(&FieldValue::Number(40.0)));
        assert_eq!(record.text("name").as_deref(), Some("Ledger 2.4m"));
        assert_eq!(record.text("id").as_deref(), Some("I-1"));
    }

    #[test]
    fn test_id_cannot_be_set_as_field() {
        let mut record = Record::new(RecordKind::Quote, "Q-1").unwrap();
        assert!(record.set("id", "Q-2").is_err());
        assert_eq!(record.id(), "Q-1");
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("Q-1").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("   ").is_err());
        assert!(validate_id(&"a".repeat(257)).is_err());
    }

    #[test]
    fn test_validate_field_name() {
        assert!(validate_field_name("reorder_point").is_ok());
        assert!(validate_field_name("Item Name").is_ok());
        assert!(validate_field_name("").is_err());
        assert!(validate_field_name("bad\nname").is_err());
        assert!(validate_field_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_non_finite_number_rejected() {
        let mut record = Record::new(RecordKind::Job, "J-1").unwrap();
        assert!(record.set("value", f64::NAN).is_err());
        assert!(record.get("value").is_none());
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("Quote".parse::<RecordKind>().unwrap(), RecordKind::Quote);
        assert_eq!("inventory".parse::<RecordKind>().unwrap(), RecordKind::InventoryItem);
        assert_eq!("jobs".parse::<RecordKind>().unwrap(), RecordKind::Job);
        assert!("invoice".parse::<RecordKind>().is_err());
        assert_eq!(RecordKind::InventoryItem.to_string(), "inventory_item");
    }

    #[test]
    fn test_field_value_infer_and_display() {
        assert_eq!(FieldValue::infer("12.5"), FieldValue::Number(12.5));
        assert_eq!(
            FieldValue::infer("2025-03-01"),
            FieldValue::Date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
        );
        assert_eq!(FieldValue::infer("inf"), FieldValue::Text("inf".to_string()));
        assert_eq!(FieldValue::Number(10.0).to_string(), "10");
        assert_eq!(FieldValue::Number(12.5).to_string(), "12.5");
    }

    #[test]
    fn test_set_cell_keeps_original_text() {
        let mut record = Record::new(RecordKind::InventoryItem, "I-1").unwrap();
        record.set_cell("daily_rate", FieldValue::Number(12.5), "12.50").unwrap();
        record.set_cell("qty", FieldValue::Number(40.0), "40").unwrap();

        assert_eq!(record.get("daily_rate"), Some(&FieldValue::Number(12.5)));
        assert_eq!(record.cell("daily_rate").as_deref(), Some("12.50"));
        assert_eq!(record.text("daily_rate").as_deref(), Some("12.5"));
        // Text that already matches the display form is not duplicated
        assert!(!record.raw_cells().contains_key("qty"));

        record.set("daily_rate", 15.0).unwrap();
        assert_eq!(record.cell("daily_rate").as_deref(), Some("15"));
        assert!(record.raw_cells().is_empty());
    }
}
