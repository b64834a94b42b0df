//! Example 03: Overdue Quotes and Jobs
//!
//! This example lists quotes past their validity date and jobs past their
//! end date that have not been closed, as of a fixed day.
//!
//! Run with: cargo run --example 03_overdue

use chrono::NaiveDate;
use eyre::{Result, eyre};
use yardbook::{Record, RecordKind, RecordStore, overdue, report};

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| eyre!("invalid date {}-{}-{}", y, m, d))
}

fn main() -> Result<()> {
    println!("Yardbook Overdue Example");
    println!("========================\n");

    let mut store = RecordStore::new();
    store.insert(
        Record::new(RecordKind::Quote, "Q-101")?
            .with("customer", "Harbour Builders")?
            .with("status", "sent")?
            .with("valid_until", date(2025, 3, 1)?)?,
    )?;
    store.insert(
        Record::new(RecordKind::Quote, "Q-102")?
            .with("customer", "Mill Homes")?
            .with("status", "accepted")?
            .with("valid_until", date(2025, 2, 1)?)?,
    )?;
    store.insert(
        Record::new(RecordKind::Job, "J-7")?
            .with("site", "Quay Road")?
            .with("status", "active")?
            .with("end", date(2025, 3, 10)?)?,
    )?;
    store.insert(
        Record::new(RecordKind::Job, "J-8")?
            .with("site", "Station Sq")?
            .with("status", "done")?
            .with("end", date(2025, 3, 5)?)?,
    )?;

    let as_of = date(2025, 3, 14)?;
    println!("As of {}:", as_of);
    print!("{}", report::render_overdue(&overdue(&store, as_of)));

    Ok(())
}
