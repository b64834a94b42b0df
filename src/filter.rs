// Query filtering for records

use crate::error::{Error, Result};
use crate::record::{FieldValue, ID_FIELD, Record};
use std::cmp::Ordering;
use std::str::FromStr;

/// Filter for querying records
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Value to compare against
    pub value: FieldValue,
}

/// Comparison operators for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,       // =
    Ne,       // !=
    Gt,       // >
    Lt,       // <
    Gte,      // >=
    Lte,      // <=
    Contains, // ~
}

impl FilterOp {
    // At the same position the longer token wins, so ">=" is not read as ">"
    const TOKENS: [(&'static str, FilterOp); 7] = [
        ("!=", FilterOp::Ne),
        (">=", FilterOp::Gte),
        ("<=", FilterOp::Lte),
        ("=", FilterOp::Eq),
        (">", FilterOp::Gt),
        ("<", FilterOp::Lt),
        ("~", FilterOp::Contains),
    ];

    fn accepts(self, ord: Ordering) -> bool {
        match self {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Ne => ord != Ordering::Equal,
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Lt => ord == Ordering::Less,
            FilterOp::Gte => ord != Ordering::Less,
            FilterOp::Lte => ord != Ordering::Greater,
            FilterOp::Contains => false,
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterOp::Eq => write!(f, "="),
            FilterOp::Ne => write!(f, "!="),
            FilterOp::Gt => write!(f, ">"),
            FilterOp::Lt => write!(f, "<"),
            FilterOp::Gte => write!(f, ">="),
            FilterOp::Lte => write!(f, "<="),
            FilterOp::Contains => write!(f, "~"),
        }
    }
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Whether a record satisfies this filter
    ///
    /// A record without the field never matches, not even for `!=`.
    pub fn matches(&self, record: &Record) -> bool {
        let id_value;
        let actual = if self.field == ID_FIELD {
            id_value = FieldValue::Text(record.id().to_string());
            &id_value
        } else {
            match record.get(&self.field) {
                Some(v) => v,
                None => return false,
            }
        };

        if self.op == FilterOp::Contains {
            return actual
                .to_string()
                .to_lowercase()
                .contains(&self.value.to_string().to_lowercase());
        }

        match compare(actual, &self.value) {
            Some(ord) => self.op.accepts(ord),
            None => false,
        }
    }
}

/// Compare values of the same type; mixed types compare by text for equality only
fn compare(actual: &FieldValue, expected: &FieldValue) -> Option<Ordering> {
    match (actual, expected) {
        (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
        (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
        (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
        (a, b) => {
            if a.to_string() == b.to_string() {
                Some(Ordering::Equal)
            } else {
                None
            }
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    /// Parse `field<op>value`, e.g. `status=open` or `qty<10`
    fn from_str(s: &str) -> Result<Self> {
        let (pos, token, op) = FilterOp::TOKENS
            .iter()
            .filter_map(|(token, op)| s.find(token).map(|pos| (pos, *token, *op)))
            .min_by_key(|(pos, token, _)| (*pos, std::cmp::Reverse(token.len())))
            .ok_or_else(|| Error::InvalidRecord(format!("filter has no operator: {}", s)))?;

        let field = s[..pos].trim();
        if field.is_empty() {
            return Err(Error::InvalidRecord(format!("filter has no field name: {}", s)));
        }
        let raw = s[pos + token.len()..].trim();
        let value = if op == FilterOp::Contains {
            FieldValue::Text(raw.to_string())
        } else {
            FieldValue::infer(raw)
        };

        Ok(Filter::new(field, op, value))
    }
}
