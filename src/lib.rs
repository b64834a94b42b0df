// Yardbook - local records for quotes, inventory and jobs with CSV import/export

pub mod config;
pub mod error;
pub mod filter;
pub mod jsonl;
pub mod record;
pub mod report;
pub mod schema;
pub mod store;
pub mod tabular;

// Re-export main types for convenience
pub use config::{Config, DeletePolicy};
pub use error::{Error, Result};
pub use filter::{Filter, FilterOp};
pub use record::{FieldValue, Record, RecordKind};
pub use report::{Overdue, Report, StockLevel, low_stock, overdue, summarize};
pub use store::RecordStore;
pub use tabular::{ImportMode, export, import, import_into};
