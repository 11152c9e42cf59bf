use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::{AppError, Result};
use crate::ledger::equity::running_equity;
use crate::ledger::pnl::{compute_pnl, numeric_result};
use crate::models::{NewTrade, Settings, Trade, UpdateSettingsInput, UpdateTradeInput};

pub(crate) const TRADE_COLUMNS: &str = "id, trade_number, import_order, date, day_of_week, currency_pair, \
     position_type, open_time, group_type, result, amount, risk_reward, pnl, equity, numeric_result, \
     notes, created_at, updated_at";

/// Helper function to map a database row to a Trade struct
pub(crate) fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        trade_number: row.get(1)?,
        import_order: row.get(2)?,
        date: row.get(3)?,
        day_of_week: row.get(4)?,
        currency_pair: row.get(5)?,
        position_type: row.get(6)?,
        open_time: row.get(7)?,
        group_type: row.get(8)?,
        result: row.get(9)?,
        amount: row.get(10)?,
        risk_reward: row.get(11)?,
        pnl: row.get(12)?,
        equity: row.get(13)?,
        numeric_result: row.get(14)?,
        notes: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

/// Every trade in ledger order.
pub fn list_trades(conn: &Connection) -> Result<Vec<Trade>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades ORDER BY import_order ASC, id ASC",
        TRADE_COLUMNS
    ))?;
    let trades = stmt
        .query_map([], map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(trades)
}

pub fn get_trade(conn: &Connection, id: i64) -> Result<Trade> {
    conn.query_row(
        &format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS),
        [id],
        map_row_to_trade,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("trade {}", id)))
}

pub fn get_settings(conn: &Connection, default_budget: f64) -> Result<Settings> {
    let settings = conn
        .query_row(
            "SELECT id, initial_budget, created_at, updated_at FROM settings WHERE id = 1",
            [],
            |row| {
                Ok(Settings {
                    id: row.get(0)?,
                    initial_budget: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(settings.unwrap_or_else(|| {
        let now = Utc::now().timestamp();
        Settings {
            id: 1,
            initial_budget: default_budget,
            created_at: now,
            updated_at: now,
        }
    }))
}

pub fn starting_balance(conn: &Connection, default_budget: f64) -> Result<f64> {
    Ok(get_settings(conn, default_budget)?.initial_budget)
}

/// Change the starting balance. Every stored equity depends on it, so the
/// whole column is rebuilt in the same transaction.
pub fn update_settings(
    conn: &mut Connection,
    input: UpdateSettingsInput,
    default_budget: f64,
) -> Result<Settings> {
    let current = get_settings(conn, default_budget)?;
    let budget = input.initial_budget.unwrap_or(current.initial_budget);
    if !budget.is_finite() || budget < 0.0 {
        return Err(AppError::Validation(format!(
            "initialBudget must be a non-negative number, got {}",
            budget
        )));
    }

    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO settings (id, initial_budget, created_at, updated_at) VALUES (1, ?1, ?2, ?2)
         ON CONFLICT(id) DO UPDATE SET initial_budget = excluded.initial_budget, updated_at = excluded.updated_at",
        params![budget, now],
    )?;
    rebuild_equity(&tx, budget)?;
    tx.commit()?;

    log::info!("Initial budget set to {:.2}", budget);
    get_settings(conn, default_budget)
}

/// Append one trade at the tail of the ledger.
pub fn append_trade(conn: &mut Connection, new: &NewTrade, default_budget: f64) -> Result<Trade> {
    let tx = conn.transaction()?;
    let id = insert_at_tail(&tx, new, default_budget)?;
    tx.commit()?;
    get_trade(conn, id)
}

/// Append a batch in order. Either every trade lands or none does.
pub fn append_trades(conn: &mut Connection, batch: &[NewTrade], default_budget: f64) -> Result<usize> {
    let tx = conn.transaction()?;
    for new in batch {
        insert_at_tail(&tx, new, default_budget)?;
    }
    tx.commit()?;
    Ok(batch.len())
}

fn insert_at_tail(tx: &Transaction, new: &NewTrade, default_budget: f64) -> Result<i64> {
    let tail: Option<(i64, f64)> = tx
        .query_row(
            "SELECT import_order, equity FROM trades ORDER BY import_order DESC, id DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (import_order, previous_equity) = match tail {
        Some((order, equity)) => (order + 1, equity),
        None => (1, starting_balance(tx, default_budget)?),
    };

    let pnl = compute_pnl(new.result.as_deref(), new.amount, new.risk_reward);
    let equity = previous_equity + pnl;
    let now = Utc::now().timestamp();

    tx.execute(
        "INSERT INTO trades (
            trade_number, import_order, date, day_of_week, currency_pair, position_type,
            open_time, group_type, result, amount, risk_reward, pnl, equity, numeric_result,
            notes, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            new.trade_number.unwrap_or(import_order),
            import_order,
            new.date,
            new.day_of_week,
            new.currency_pair,
            new.position_type,
            new.open_time,
            new.group_type,
            new.result,
            new.amount,
            new.risk_reward,
            pnl,
            equity,
            numeric_result(new.result.as_deref()),
            new.notes,
            now,
            now
        ],
    )?;

    Ok(tx.last_insert_rowid())
}

/// Apply a partial edit, recompute its PnL and rebuild the equity column.
pub fn update_trade(
    conn: &mut Connection,
    id: i64,
    patch: UpdateTradeInput,
    default_budget: f64,
) -> Result<Trade> {
    let tx = conn.transaction()?;
    let mut trade = get_trade(&tx, id)?;
    patch.apply_to(&mut trade)?;

    let pnl = compute_pnl(trade.result.as_deref(), trade.amount, trade.risk_reward);
    tx.execute(
        "UPDATE trades SET
            trade_number = ?, date = ?, day_of_week = ?, currency_pair = ?, position_type = ?,
            open_time = ?, group_type = ?, result = ?, amount = ?, risk_reward = ?,
            pnl = ?, numeric_result = ?, notes = ?, updated_at = ?
         WHERE id = ?",
        params![
            trade.trade_number,
            trade.date,
            trade.day_of_week,
            trade.currency_pair,
            trade.position_type,
            trade.open_time,
            trade.group_type,
            trade.result,
            trade.amount,
            trade.risk_reward,
            pnl,
            numeric_result(trade.result.as_deref()),
            trade.notes,
            Utc::now().timestamp(),
            id
        ],
    )?;

    let start = starting_balance(&tx, default_budget)?;
    rebuild_equity(&tx, start)?;
    tx.commit()?;

    get_trade(conn, id)
}

pub fn delete_trade(conn: &mut Connection, id: i64, default_budget: f64) -> Result<()> {
    let tx = conn.transaction()?;
    let deleted = tx.execute("DELETE FROM trades WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!("trade {}", id)));
    }
    let start = starting_balance(&tx, default_budget)?;
    rebuild_equity(&tx, start)?;
    tx.commit()?;
    Ok(())
}

pub fn delete_all_trades(conn: &Connection) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM trades", [])?;
    log::info!("Deleted {} trades", deleted);
    Ok(deleted)
}

/// Reassign import order and trade number to 1..N keeping the current order.
/// PnL and equity are untouched.
pub fn renumber(conn: &mut Connection) -> Result<usize> {
    let tx = conn.transaction()?;
    let ids = ordered_ids(&tx)?;
    {
        let mut stmt = tx.prepare("UPDATE trades SET import_order = ?, trade_number = ? WHERE id = ?")?;
        for (i, id) in ids.iter().enumerate() {
            let n = i as i64 + 1;
            stmt.execute(params![n, n, id])?;
        }
    }
    tx.commit()?;
    Ok(ids.len())
}

/// Recompute every trade's PnL from its own fields, then the equity column.
pub fn recalculate_all(conn: &mut Connection, default_budget: f64) -> Result<usize> {
    let tx = conn.transaction()?;
    let rows: Vec<(i64, Option<String>, Option<f64>, Option<f64>)> = {
        let mut stmt = tx.prepare(
            "SELECT id, result, amount, risk_reward FROM trades ORDER BY import_order ASC, id ASC",
        )?;
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };

    {
        let mut stmt = tx.prepare("UPDATE trades SET pnl = ?, numeric_result = ? WHERE id = ?")?;
        for (id, result, amount, rr) in &rows {
            let pnl = compute_pnl(result.as_deref(), *amount, *rr);
            stmt.execute(params![pnl, numeric_result(result.as_deref()), id])?;
        }
    }

    let start = starting_balance(&tx, default_budget)?;
    rebuild_equity(&tx, start)?;
    tx.commit()?;

    log::info!("Recalculated PnL and equity for {} trades", rows.len());
    Ok(rows.len())
}

/// Overwrite the equity column with the prefix sum of PnL from `start`.
fn rebuild_equity(tx: &Transaction, start: f64) -> Result<()> {
    let rows: Vec<(i64, f64)> = {
        let mut stmt = tx.prepare("SELECT id, pnl FROM trades ORDER BY import_order ASC, id ASC")?;
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };

    let equities = running_equity(start, rows.iter().map(|(_, pnl)| *pnl));
    let mut stmt = tx.prepare("UPDATE trades SET equity = ? WHERE id = ?")?;
    for ((id, _), equity) in rows.iter().zip(equities) {
        stmt.execute(params![equity, id])?;
    }
    Ok(())
}

fn ordered_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM trades ORDER BY import_order ASC, id ASC")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}
