// Derived reports over a record store

use crate::record::{FieldValue, Record, RecordKind};
use crate::store::RecordStore;
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Label shown for records lacking the grouping field
pub const MISSING_LABEL: &str = "(missing)";

/// Numeric aggregate for one field within a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    /// Records in the group that carry the field
    pub count: usize,
    pub sum: f64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Grouping value; `None` for records without the field
    pub key: Option<String>,
    pub count: usize,
    pub aggregates: BTreeMap<String, Aggregate>,
}

impl Group {
    pub fn label(&self) -> &str {
        self.key.as_deref().unwrap_or(MISSING_LABEL)
    }
}

/// Grouped counts and numeric aggregates over a store snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub group_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecordKind>,
    pub total: usize,
    /// Ordered by key, missing group first
    pub groups: Vec<Group>,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    sums: BTreeMap<String, (usize, f64)>,
}

/// Group records by the textual value of `group_by`
///
/// With `kind` set only records of that kind are considered. Numeric fields
/// are summed and averaged per group over the records that carry them.
pub fn summarize(store: &RecordStore, group_by: &str, kind: Option<RecordKind>) -> Report {
    let mut groups: BTreeMap<Option<String>, Accumulator> = BTreeMap::new();
    let mut total = 0;

    for record in store.records().filter(|r| kind.is_none_or(|k| r.kind() == k)) {
        total += 1;
        let acc = groups.entry(record.text(group_by)).or_default();
        acc.count += 1;
        for (field, value) in record.fields() {
            if let Some(n) = value.as_number() {
                let entry = acc.sums.entry(field.clone()).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += n;
            }
        }
    }

    let groups = groups
        .into_iter()
        .map(|(key, acc)| Group {
            key,
            count: acc.count,
            aggregates: acc
                .sums
                .into_iter()
                .map(|(field, (count, sum))| {
                    let average = sum / count as f64;
                    (field, Aggregate { count, sum, average })
                })
                .collect(),
        })
        .collect();

    Report {
        group_by: group_by.to_string(),
        kind,
        total,
        groups,
    }
}

/// Stock position for one inventory item name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLevel {
    pub name: String,
    pub total_qty: f64,
    pub reorder_point: Option<f64>,
    pub below: bool,
}

/// Total quantity per inventory item name against its reorder point
///
/// Items without a name are skipped. The reorder point is the first one seen
/// for a name in store order. Ordered by name.
pub fn low_stock(store: &RecordStore) -> Vec<StockLevel> {
    let mut levels: BTreeMap<String, (f64, Option<f64>)> = BTreeMap::new();

    for record in store.records().filter(|r| r.kind() == RecordKind::InventoryItem) {
        let Some(name) = record.text("name") else {
            continue;
        };
        let qty = number(record, "qty").unwrap_or(0.0);
        let entry = levels.entry(name).or_insert((0.0, None));
        entry.0 += qty;
        if entry.1.is_none() {
            entry.1 = number(record, "reorder_point");
        }
    }

    levels
        .into_iter()
        .map(|(name, (total_qty, reorder_point))| StockLevel {
            below: reorder_point.is_some_and(|r| total_qty < r),
            name,
            total_qty,
            reorder_point,
        })
        .collect()
}

/// Status values that close a quote or job, compared case-insensitively
pub const CLOSED_STATUSES: [&str; 8] = [
    "accepted",
    "declined",
    "expired",
    "closed",
    "done",
    "complete",
    "completed",
    "cancelled",
];

/// A quote or job still open past its due date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overdue {
    pub kind: RecordKind,
    pub id: String,
    /// Customer for quotes, site for jobs
    pub label: Option<String>,
    pub due: NaiveDate,
    pub days_overdue: i64,
    pub status: Option<String>,
}

/// Open quotes past `valid_until` and open jobs past `end`, as of `today`
///
/// A record is open unless its status is one of `CLOSED_STATUSES`. Records
/// without a due date are never overdue. Ordered by due date, then kind and id.
pub fn overdue(store: &RecordStore, today: NaiveDate) -> Vec<Overdue> {
    let mut items: Vec<Overdue> = store
        .records()
        .filter_map(|record| {
            let (due_field, label_field) = match record.kind() {
                RecordKind::Quote => ("valid_until", "customer"),
                RecordKind::Job => ("end", "site"),
                RecordKind::InventoryItem => return None,
            };
            let Some(FieldValue::Date(due)) = record.get(due_field) else {
                return None;
            };
            let status = record.text("status");
            if *due >= today || status.as_deref().is_some_and(is_closed) {
                return None;
            }
            Some(Overdue {
                kind: record.kind(),
                id: record.id().to_string(),
                label: record.text(label_field),
                due: *due,
                days_overdue: (today - *due).num_days(),
                status,
            })
        })
        .collect();

    items.sort_by(|a, b| (a.due, a.kind, &a.id).cmp(&(b.due, b.kind, &b.id)));
    items
}

fn is_closed(status: &str) -> bool {
    CLOSED_STATUSES.iter().any(|s| s.eq_ignore_ascii_case(status.trim()))
}

fn number(record: &Record, field: &str) -> Option<f64> {
    record.get(field).and_then(|v| v.as_number())
}

/// Render a summary as an aligned text table
pub fn render_table(report: &Report) -> String {
    let fields: Vec<&String> = {
        let mut fields: Vec<&String> = report.groups.iter().flat_map(|g| g.aggregates.keys()).collect();
        fields.sort();
        fields.dedup();
        fields
    };

    let mut header = vec![report.group_by.clone(), "count".to_string()];
    for field in &fields {
        header.push(format!("{} sum", field));
        header.push(format!("{} avg", field));
    }

    let rows: Vec<Vec<String>> = report
        .groups
        .iter()
        .map(|g| {
            let mut row = vec![g.label().to_string(), g.count.to_string()];
            for field in &fields {
                match g.aggregates.get(*field) {
                    Some(a) => {
                        row.push(format_number(a.sum));
                        row.push(format_number(a.average));
                    }
                    None => {
                        row.push("-".to_string());
                        row.push("-".to_string());
                    }
                }
            }
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let head: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    let _ = writeln!(out, "{}", head.join("  ").bold());
    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    let _ = writeln!(out, "{} records", report.total);
    out
}

/// Render stock levels, one line per item, alerts highlighted
pub fn render_stock(levels: &[StockLevel]) -> String {
    let mut out = String::new();
    for level in levels {
        let _ = writeln!(out, "{}: total qty = {}", level.name, format_number(level.total_qty));
        if let (true, Some(reorder)) = (level.below, level.reorder_point) {
            let alert = format!(
                "ALERT: '{}' is below reorder point ({} < {})",
                level.name,
                format_number(level.total_qty),
                format_number(reorder)
            );
            let _ = writeln!(out, "{}", alert.red());
        }
    }
    out
}

/// Render overdue quotes and jobs, one highlighted line each
pub fn render_overdue(items: &[Overdue]) -> String {
    let mut out = String::new();
    for item in items {
        let line = format!(
            "OVERDUE: {} '{}'{} was due {} ({} day{} ago){}",
            item.kind,
            item.id,
            item.label.as_deref().map(|l| format!(" ({})", l)).unwrap_or_default(),
            item.due.format("%Y-%m-%d"),
            item.days_overdue,
            if item.days_overdue == 1 { "" } else { "s" },
            item.status.as_deref().map(|s| format!(" [{}]", s)).unwrap_or_default(),
        );
        let _ = writeln!(out, "{}", line.red());
    }
    let _ = writeln!(out, "{} overdue", items.len());
    out
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n)
    } else {
        format!("{:.2}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: Option<&str>, qty: f64, reorder: Option<f64>) -> Record {
        let mut record = Record::new(RecordKind::InventoryItem, id).unwrap();
        if let Some(name) = name {
            record.set("name", name).unwrap();
        }
        record.set("qty", qty).unwrap();
        if let Some(r) = reorder {
            record.set("reorder_point", r).unwrap();
        }
        record
    }

    fn sample_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.upsert(item("I-1", Some("Ledger"), 30.0, Some(50.0)));
        store.upsert(item("I-2", Some("Ledger"), 10.0, Some(20.0)));
        store.upsert(item("I-3", Some("Base Jack"), 80.0, Some(40.0)));
        store.upsert(item("I-4", None, 5.0, None));
        store.upsert(
            Record::new(RecordKind::Quote, "Q-1")
                .unwrap()
                .with("customer", "Harbour Builders")
                .unwrap()
                .with("total", 1200.0)
                .unwrap(),
        );
        store
    }

    #[test]
    fn test_two_rows_two_groups() {
        let mut store = RecordStore::new();
        store.upsert(item("1", Some("A"), 1.0, None));
        store.upsert(item("2", Some("B"), 1.0, None));

        let report = summarize(&store, "name", None);
        assert_eq!(report.groups.len(), 2);
        assert!(report.groups.iter().all(|g| g.count == 1));
        assert_eq!(report.groups[0].key.as_deref(), Some("A"));
        assert_eq!(report.groups[1].key.as_deref(), Some("B"));
    }

    #[test]
    fn test_group_counts_sum_to_total() {
        let store = sample_store();
        for field in ["name", "qty", "customer", "id", "nonexistent"] {
            let report = summarize(&store, field, None);
            let sum: usize = report.groups.iter().map(|g| g.count).sum();
            assert_eq!(sum, report.total, "grouping by {}", field);
            assert_eq!(report.total, store.len());
        }
    }

    #[test]
    fn test_missing_group_sorts_first() {
        let store = sample_store();
        let report = summarize(&store, "name", Some(RecordKind::InventoryItem));

        assert_eq!(report.total, 4);
        assert_eq!(report.groups[0].key, None);
        assert_eq!(report.groups[0].label(), MISSING_LABEL);
        let keys: Vec<&str> = report.groups.iter().map(|g| g.label()).collect();
        assert_eq!(keys, vec![MISSING_LABEL, "Base Jack", "Ledger"]);
    }

    #[test]
    fn test_numeric_aggregates() {
        let store = sample_store();
        let report = summarize(&store, "name", Some(RecordKind::InventoryItem));

        let ledger = report.groups.iter().find(|g| g.label() == "Ledger").unwrap();
        assert_eq!(ledger.count, 2);
        let qty = &ledger.aggregates["qty"];
        assert_eq!(qty.count, 2);
        assert_eq!(qty.sum, 40.0);
        assert_eq!(qty.average, 20.0);
        assert_eq!(ledger.aggregates["reorder_point"].sum, 70.0);
    }

    #[test]
    fn test_summarize_empty_store() {
        let report = summarize(&RecordStore::new(), "status", None);
        assert_eq!(report.total, 0);
        assert!(report.groups.is_empty());
    }

    #[test]
    fn test_low_stock() {
        let levels = low_stock(&sample_store());

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].name, "Base Jack");
        assert!(!levels[0].below);

        // Ledger totals 40 against the first reorder point seen (50)
        assert_eq!(levels[1].name, "Ledger");
        assert_eq!(levels[1].total_qty, 40.0);
        assert_eq!(levels[1].reorder_point, Some(50.0));
        assert!(levels[1].below);
    }

    #[test]
    fn test_render_table_rows() {
        let store = sample_store();
        let table = render_table(&summarize(&store, "name", Some(RecordKind::InventoryItem)));

        assert!(table.contains("Ledger"));
        assert!(table.contains("qty sum"));
        assert!(table.contains("4 records"));
    }

    #[test]
    fn test_render_stock_alerts() {
        let text = render_stock(&low_stock(&sample_store()));
        assert!(text.contains("Ledger: total qty = 40"));
        assert!(text.contains("ALERT: 'Ledger' is below reorder point (40 < 50)"));
        assert!(!text.contains("ALERT: 'Base Jack'"));
    }

    #[test]
    fn test_report_serializes() {
        let report = summarize(&sample_store(), "customer", Some(RecordKind::Quote));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["kind"], "quote");
        assert_eq!(json["groups"][0]["key"], "Harbour Builders");
        assert_eq!(json["groups"][0]["aggregates"]["total"]["sum"], 1200.0);
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dated_store() -> RecordStore {
        let mut store = RecordStore::new();
        let quote = |id: &str, valid_until: NaiveDate, status: Option<&str>| {
            let mut record = Record::new(RecordKind::Quote, id)
                .unwrap()
                .with("customer", "Acme")
                .unwrap()
                .with("valid_until", valid_until)
                .unwrap();
            if let Some(status) = status {
                record.set("status", status).unwrap();
            }
            record
        };
        store.upsert(quote("Q-1", date(2025, 3, 1), Some("sent")));
        store.upsert(quote("Q-2", date(2025, 2, 1), Some("Accepted")));
        store.upsert(quote("Q-3", date(2025, 4, 1), None));
        store.upsert(
            Record::new(RecordKind::Job, "J-1")
                .unwrap()
                .with("site", "Quay")
                .unwrap()
                .with("end", date(2025, 2, 20))
                .unwrap(),
        );
        store.upsert(
            Record::new(RecordKind::Job, "J-2")
                .unwrap()
                .with("site", "Mill")
                .unwrap()
                .with("end", date(2025, 1, 10))
                .unwrap()
                .with("status", "done")
                .unwrap(),
        );
        // No due date, never overdue
        store.upsert(Record::new(RecordKind::Job, "J-3").unwrap());
        store
    }

    #[test]
    fn test_overdue_skips_closed_and_future() {
        let items = overdue(&dated_store(), date(2025, 3, 15));

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["J-1", "Q-1"]);
        assert_eq!(items[0].label.as_deref(), Some("Quay"));
        assert_eq!(items[0].days_overdue, 23);
        assert_eq!(items[1].kind, RecordKind::Quote);
        assert_eq!(items[1].status.as_deref(), Some("sent"));
    }

    #[test]
    fn test_overdue_due_today_is_not_overdue() {
        let items = overdue(&dated_store(), date(2025, 3, 1));
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["J-1"]);
    }

    #[test]
    fn test_render_overdue() {
        let text = render_overdue(&overdue(&dated_store(), date(2025, 3, 2)));
        assert!(text.contains("OVERDUE: job 'J-1' (Quay) was due 2025-02-20 (10 days ago)"));
        assert!(text.contains("OVERDUE: quote 'Q-1' (Acme) was due 2025-03-01 (1 day ago) [sent]"));
        assert!(text.contains("2 overdue"));
    }
}
