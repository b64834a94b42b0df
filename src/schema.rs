// Fixed column schema per record kind

use crate::error::{Error, Result};
use crate::record::{FieldValue, ID_FIELD, RecordKind};
use chrono::NaiveDate;

/// How a column's cells are typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Number,
    Date,
}

/// A column in a kind's tabular schema
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub required: bool,
}

const fn col(name: &'static str, ty: ColumnType, required: bool) -> Column {
    Column { name, ty, required }
}

use ColumnType::{Date, Number, Text};

const QUOTE: &[Column] = &[
    col(ID_FIELD, Text, true),
    col("customer", Text, true),
    col("status", Text, false),
    col("issued", Date, false),
    col("valid_until", Date, false),
    col("total", Number, false),
];

const INVENTORY_ITEM: &[Column] = &[
    col(ID_FIELD, Text, true),
    col("name", Text, true),
    col("category", Text, false),
    col("location", Text, false),
    col("qty", Number, false),
    col("reorder_point", Number, false),
    col("daily_rate", Number, false),
];

const JOB: &[Column] = &[
    col(ID_FIELD, Text, true),
    col("site", Text, true),
    col("customer", Text, false),
    col("status", Text, false),
    col("start", Date, false),
    col("end", Date, false),
    col("quote_id", Text, false),
    col("value", Number, false),
];

/// Columns for a kind, in export order
pub fn columns(kind: RecordKind) -> &'static [Column] {
    match kind {
        RecordKind::Quote => QUOTE,
        RecordKind::InventoryItem => INVENTORY_ITEM,
        RecordKind::Job => JOB,
    }
}

pub fn column(kind: RecordKind, name: &str) -> Option<&'static Column> {
    columns(kind).iter().find(|c| c.name == name)
}

/// Required columns absent from `headers`, in schema order
pub fn missing_required(kind: RecordKind, headers: &[String]) -> Vec<String> {
    columns(kind)
        .iter()
        .filter(|c| c.required && !headers.iter().any(|h| h == c.name))
        .map(|c| c.name.to_string())
        .collect()
}

/// Convert a raw cell into a typed value for the named column
///
/// Columns outside the schema are kept as text.
pub fn parse_cell(kind: RecordKind, name: &str, raw: &str) -> std::result::Result<FieldValue, String> {
    let ty = column(kind, name).map(|c| c.ty).unwrap_or(ColumnType::Text);
    match ty {
        ColumnType::Text => Ok(FieldValue::Text(raw.to_string())),
        ColumnType::Number => match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(FieldValue::Number(n)),
            _ => Err("expected a number".to_string()),
        },
        ColumnType::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|_| "expected a date (YYYY-MM-DD)".to_string()),
    }
}

/// Typed value for manual entry: schema columns are parsed strictly, others inferred
pub fn parse_input(kind: RecordKind, name: &str, raw: &str) -> Result<FieldValue> {
    match column(kind, name) {
        Some(_) => parse_cell(kind, name, raw).map_err(|reason| Error::InvalidValue {
            row: 0,
            column: name.to_string(),
            value: raw.to_string(),
            reason,
        }),
        None => Ok(FieldValue::infer(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_requires_id() {
        for kind in RecordKind::ALL {
            let first = columns(kind)[0];
            assert_eq!(first.name, ID_FIELD);
            assert!(first.required);
        }
    }

    #[test]
    fn test_missing_required() {
        let headers = vec!["name".to_string(), "qty".to_string()];
        assert_eq!(missing_required(RecordKind::InventoryItem, &headers), vec!["id"]);

        let headers = vec!["total".to_string()];
        assert_eq!(missing_required(RecordKind::Quote, &headers), vec!["id", "customer"]);
    }

    #[test]
    fn test_parse_cell_typed_columns() {
        assert_eq!(
            parse_cell(RecordKind::InventoryItem, "qty", "12").unwrap(),
            FieldValue::Number(12.0)
        );
        assert!(parse_cell(RecordKind::InventoryItem, "qty", "lots").is_err());
        assert!(parse_cell(RecordKind::Job, "start", "03/01/2025").is_err());
        assert_eq!(
            parse_cell(RecordKind::Job, "start", "2025-03-01").unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_unknown_columns_stay_text() {
        assert_eq!(
            parse_cell(RecordKind::Quote, "notes", "42").unwrap(),
            FieldValue::Text("42".to_string())
        );
    }

    #[test]
    fn test_parse_input_infers_unknown_columns() {
        assert_eq!(
            parse_input(RecordKind::Quote, "discount", "5").unwrap(),
            FieldValue::Number(5.0)
        );
        assert!(parse_input(RecordKind::Quote, "total", "abc").is_err());
    }
}
