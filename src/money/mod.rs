pub mod advisor;
pub mod inputs;

use rusqlite::Connection;

use crate::error::Result;
use crate::ledger;
use crate::stats::{load_trades, TradeOrder, TradeQuery};

pub use advisor::{calculate_stake_suggestion, MoneyManagementConfig, StakeSuggestion, StatsInput};
pub use inputs::{snapshot, suggest, GroupPayout, LedgerSnapshot, PayoutTable, SuggestionReport, SuggestionRequest};

/// Size the next stake for each group from the whole stored ledger.
pub fn suggestions_for_ledger(
    conn: &Connection,
    request: &SuggestionRequest,
    table: &PayoutTable,
    default_budget: f64,
) -> Result<SuggestionReport> {
    let trades = load_trades(conn, &TradeQuery::default(), TradeOrder::Chronological)?;
    let starting_balance = ledger::starting_balance(conn, default_budget)?;
    Ok(suggest(request, snapshot(&trades, starting_balance), table))
}
