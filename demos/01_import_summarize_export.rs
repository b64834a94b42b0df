//! Example 01: Import, Summarize, Export
//!
//! This example imports an inventory spreadsheet, prints a grouped summary
//! and the low-stock alerts, saves the store and exports it back to CSV.
//!
//! Run with: cargo run --example 01_import_summarize_export

use eyre::Result;
use std::fs;
use yardbook::{RecordKind, RecordStore, export, import, low_stock, report, summarize};

const INVENTORY: &str = "\
id,name,category,location,qty,reorder_point,daily_rate
I-1,Ledger 2.4m,ledger,Yard A,30,50,0.80
I-2,Ledger 2.4m,ledger,Yard B,10,20,0.80
I-3,Base Jack,jack,Yard A,80,40,1.20
I-4,Scaffold Board,board,Yard B,120,100,0.50
";

fn main() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;

    println!("Yardbook Import / Summarize / Export Example");
    println!("============================================\n");

    let csv_path = temp_dir.path().join("inventory.csv");
    fs::write(&csv_path, INVENTORY)?;

    // 1. Import
    let store = import(&csv_path, RecordKind::InventoryItem)?;
    println!("1. Imported {} inventory items\n", store.len());

    // 2. Summarize by name
    println!("2. Summary grouped by name:");
    let summary = summarize(&store, "name", Some(RecordKind::InventoryItem));
    print!("{}", report::render_table(&summary));
    println!();

    // 3. Low stock
    println!("3. Stock levels:");
    print!("{}", report::render_stock(&low_stock(&store)));
    println!();

    // 4. Save and reload
    let store_path = temp_dir.path().join("yardbook.jsonl");
    store.save(&store_path)?;
    let reloaded = RecordStore::load(&store_path)?;
    println!("4. Saved and reloaded {} records from {}\n", reloaded.len(), store_path.display());

    // 5. Export; cell text such as 0.80 comes back as written
    let out_path = temp_dir.path().join("inventory-out.csv");
    let count = export(&reloaded, RecordKind::InventoryItem, &out_path)?;
    println!("5. Exported {} rows:", count);
    print!("{}", fs::read_to_string(&out_path)?);

    Ok(())
}
