use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, ToSql};

use crate::error::{AppError, Result};
use crate::ledger::repository::{map_row_to_trade, TRADE_COLUMNS};
use crate::ledger::Outcome;
use crate::models::{Trade, TradeFilters};

const ALL: &str = "all";

/// Parsed form of the shared filter query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeQuery {
    pub start: Option<NaiveDateTime>,
    /// Exclusive upper bound (the day after `endDate`).
    pub end: Option<NaiveDateTime>,
    pub symbol: Option<String>,
    pub group_type: Option<String>,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOrder {
    /// import_order ascending
    Ledger,
    /// date ascending, then import_order
    Chronological,
}

impl TradeQuery {
    pub fn from_filters(filters: &TradeFilters) -> Result<Self> {
        let start = selected(&filters.start_date)
            .map(|d| parse_day(&d).map(|day| day.and_time(NaiveTime::MIN)))
            .transpose()?;
        let end = selected(&filters.end_date)
            .map(|d| {
                let day = parse_day(&d)?;
                day.checked_add_days(Days::new(1))
                    .map(|next| next.and_time(NaiveTime::MIN))
                    .ok_or_else(|| AppError::Validation(format!("endDate out of range: {}", d)))
            })
            .transpose()?;

        let outcome = match selected(&filters.result).as_deref() {
            None => None,
            Some("win") => Some(Outcome::Win),
            Some("loss") => Some(Outcome::Loss),
            Some("breakeven") => Some(Outcome::Breakeven),
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "result filter must be win, loss, breakeven or all, got {}",
                    other
                )))
            }
        };

        Ok(TradeQuery {
            start,
            end,
            symbol: selected(&filters.symbol),
            group_type: selected(&filters.group_type),
            outcome,
        })
    }

    /// Outcome is decided by the sign of the stored PnL, not by the label.
    pub fn keeps(&self, trade: &Trade) -> bool {
        match self.outcome {
            None => true,
            Some(Outcome::Win) => trade.pnl > 0.0,
            Some(Outcome::Loss) => trade.pnl < 0.0,
            Some(Outcome::Breakeven) => trade.pnl == 0.0,
        }
    }

    fn where_clause(&self, with_outcome: bool) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(start) = self.start {
            conditions.push("date >= ?");
            params.push(Box::new(start));
        }
        if let Some(end) = self.end {
            conditions.push("date < ?");
            params.push(Box::new(end));
        }
        if let Some(symbol) = &self.symbol {
            conditions.push("currency_pair = ?");
            params.push(Box::new(symbol.clone()));
        }
        if let Some(group) = &self.group_type {
            conditions.push("group_type = ?");
            params.push(Box::new(group.clone()));
        }
        if with_outcome {
            match self.outcome {
                Some(Outcome::Win) => conditions.push("pnl > 0"),
                Some(Outcome::Loss) => conditions.push("pnl < 0"),
                Some(Outcome::Breakeven) => conditions.push("pnl = 0"),
                None => {}
            }
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }
}

/// Trades matching the date, symbol and group filters. The outcome filter is
/// left to the caller (see [`TradeQuery::keeps`]) because some views need the
/// unfiltered set too.
pub fn load_trades(conn: &Connection, query: &TradeQuery, order: TradeOrder) -> Result<Vec<Trade>> {
    let (clause, params) = query.where_clause(false);
    fetch(conn, &format!("{}{}", clause, order_by(order)), params)
}

/// One page of trades with every filter applied, in ledger order.
/// Pages start at 1; a missing limit returns everything.
pub fn load_page(conn: &Connection, query: &TradeQuery, page: Option<u32>, limit: Option<u32>) -> Result<Vec<Trade>> {
    let (clause, mut params) = query.where_clause(true);
    let mut tail = format!("{}{}", clause, order_by(TradeOrder::Ledger));

    if let Some(limit) = limit.filter(|l| *l > 0) {
        let page = page.unwrap_or(1).max(1);
        let offset = (page as i64 - 1) * limit as i64;
        tail.push_str(" LIMIT ? OFFSET ?");
        params.push(Box::new(limit as i64));
        params.push(Box::new(offset));
    }

    fetch(conn, &tail, params)
}

fn fetch(conn: &Connection, tail: &str, params: Vec<Box<dyn ToSql>>) -> Result<Vec<Trade>> {
    let sql = format!("SELECT {} FROM trades{}", TRADE_COLUMNS, tail);
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let trades = stmt
        .query_map(param_refs.as_slice(), map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(trades)
}

fn order_by(order: TradeOrder) -> &'static str {
    match order {
        TradeOrder::Ledger => " ORDER BY import_order ASC, id ASC",
        TradeOrder::Chronological => " ORDER BY date ASC, import_order ASC, id ASC",
    }
}

/// A filter value, or `None` when blank or "all".
fn selected(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
        .map(str::to_string)
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("expected a YYYY-MM-DD date, got {}", raw)))
}
