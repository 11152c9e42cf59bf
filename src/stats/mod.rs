pub mod filters;
pub mod overview;
pub mod periods;
pub mod summary;

use rusqlite::Connection;

use crate::error::Result;
use crate::ledger;
use crate::models::TradeFilters;

pub use filters::{load_page, load_trades, TradeOrder, TradeQuery};
pub use overview::{build_overview, Overview};
pub use periods::{bucketize, Period, PeriodBucket, SortOrder};
pub use summary::{summarize, Summary, PROFIT_FACTOR_CAP};

pub fn overview(conn: &Connection, filters: &TradeFilters, default_budget: f64) -> Result<Overview> {
    let query = TradeQuery::from_filters(filters)?;
    let loaded = load_trades(conn, &query, TradeOrder::Chronological)?;
    let starting_balance = ledger::starting_balance(conn, default_budget)?;
    Ok(build_overview(&loaded, &query, starting_balance))
}

pub fn period_buckets(
    conn: &Connection,
    filters: &TradeFilters,
    period: Period,
    order: SortOrder,
) -> Result<Vec<PeriodBucket>> {
    let query = TradeQuery::from_filters(filters)?;
    let trades: Vec<_> = load_trades(conn, &query, TradeOrder::Chronological)?
        .into_iter()
        .filter(|t| query.keeps(t))
        .collect();
    Ok(bucketize(&trades, period, order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::NewTrade;
    use chrono::NaiveDate;

    fn append(conn: &mut Connection, day: u32, result: &str, amount: f64, rr: Option<f64>) {
        let new = NewTrade {
            date: NaiveDate::from_ymd_opt(2025, 11, day).and_then(|d| d.and_hms_opt(12, 0, 0)),
            currency_pair: Some("EUR/USD".to_string()),
            group_type: Some("Gruppo Live".to_string()),
            result: Some(result.to_string()),
            amount: Some(amount),
            risk_reward: rr,
            ..Default::default()
        };
        ledger::append_trade(conn, &new, 700.0).unwrap();
    }

    #[test]
    fn test_overview_reads_starting_balance() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock().unwrap();
        append(&mut conn, 17, "Presa", 50.0, Some(20.0));
        append(&mut conn, 18, "Persa", 30.0, None);

        let o = overview(&conn, &TradeFilters::default(), 700.0).unwrap();
        assert_eq!(o.starting_balance, 700.0);
        assert_eq!(o.summary.total_pnl, -20.0);
        assert_eq!(o.equity_curve.last().map(|p| p.equity), Some(680.0));
    }

    #[test]
    fn test_daily_buckets_respect_result_filter() {
        let db = Database::open_in_memory().unwrap();
        let mut conn = db.lock().unwrap();
        append(&mut conn, 17, "Presa", 50.0, Some(20.0));
        append(&mut conn, 17, "Persa", 30.0, None);
        append(&mut conn, 18, "Presa", 10.0, None);

        let filters = TradeFilters {
            result: Some("win".to_string()),
            ..Default::default()
        };
        let buckets = period_buckets(&conn, &filters, Period::Day, SortOrder::Desc).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, "2025-11-18");
        assert_eq!(buckets[1].summary.total_pnl, 10.0);
        assert_eq!(buckets[1].summary.win_rate, 100.0);
    }
}
