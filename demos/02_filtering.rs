//! Example 02: Filtering
//!
//! This example builds a few jobs by hand and lists them with
//! `field<op>value` filters, the same expressions `yardbook list --where`
//! accepts.
//!
//! Run with: cargo run --example 02_filtering

use eyre::Result;
use yardbook::{Filter, FilterOp, Record, RecordKind, RecordStore};

fn job(id: &str, site: &str, status: &str, value: f64, tags: &str) -> Result<Record> {
    Ok(Record::new(RecordKind::Job, id)?
        .with("site", site)?
        .with("status", status)?
        .with("value", value)?
        .with("tags", tags)?)
}

fn show(store: &RecordStore, title: &str, filters: &[Filter]) {
    println!("{}", title);
    for record in store.list(RecordKind::Job, filters) {
        println!(
            "  {} - {} (status={}, value={})",
            record.id(),
            record.text("site").unwrap_or_default(),
            record.text("status").unwrap_or_default(),
            record.text("value").unwrap_or_default()
        );
    }
    println!();
}

fn main() -> Result<()> {
    println!("Yardbook Filtering Example");
    println!("==========================\n");

    let mut store = RecordStore::new();
    store.insert(job("J-1", "Harbour St", "active", 4200.0, "commercial, urgent")?)?;
    store.insert(job("J-2", "Mill Lane", "done", 1800.0, "residential")?)?;
    store.insert(job("J-3", "Quay Road", "active", 950.0, "residential, urgent")?)?;
    store.insert(job("J-4", "Station Sq", "booked", 12500.0, "commercial")?)?;

    // 1. Typed filter built in code
    show(&store, "1. status = active:", &[Filter::new("status", FilterOp::Eq, "active")]);

    // 2. Parsed from text, numeric comparison
    let over_1k: Filter = "value>=1000".parse()?;
    show(&store, "2. value >= 1000:", &[over_1k]);

    // 3. Case-insensitive substring match on a free-form tags column
    let urgent: Filter = "tags~URGENT".parse()?;
    show(&store, "3. tags contain 'urgent':", &[urgent.clone()]);

    // 4. Filters combine with AND
    let active: Filter = "status=active".parse()?;
    show(&store, "4. urgent and active:", &[urgent, active]);

    // 5. Identifier comparisons
    show(&store, "5. id != J-2:", &["id!=J-2".parse()?]);

    Ok(())
}
