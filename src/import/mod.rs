pub mod columns;
pub mod normalizer;
pub mod parse;

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::ledger;

pub use normalizer::{normalize_rows, rows_from_csv, NormalizedBatch, RawRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub success: bool,
    pub imported: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Normalize the rows and append the accepted ones at the ledger tail in one
/// transaction. PnL and equity come from the ledger, never from the file.
pub fn import_rows(conn: &mut Connection, rows: &[RawRow], default_budget: f64) -> Result<ImportSummary> {
    let batch = normalize_rows(rows)?;
    let imported = ledger::append_trades(conn, &batch.trades, default_budget)?;

    Ok(ImportSummary {
        success: true,
        imported,
        skipped: batch.skipped,
        total: batch.total,
    })
}
