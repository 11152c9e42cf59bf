use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::Trade;
use crate::stats::filters::TradeQuery;
use crate::stats::summary::{summarize, Summary};

/// Label used for trades without a symbol or group.
pub const UNLABELLED: &str = "Altro";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDelta {
    pub id: i64,
    pub date: Option<NaiveDateTime>,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPoint {
    pub id: i64,
    pub date: Option<String>,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolStats {
    pub symbol: String,
    #[serde(flatten)]
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub group_type: String,
    #[serde(flatten)]
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub starting_balance: f64,
    #[serde(flatten)]
    pub summary: Summary,
    pub days_green: usize,
    pub days_red: usize,
    pub best_trade: Option<TradeDelta>,
    pub worst_trade: Option<TradeDelta>,
    pub equity_curve: Vec<EquityPoint>,
    pub pnl_by_symbol: Vec<SymbolStats>,
    pub group_stats: Vec<GroupStats>,
    pub best_group: Option<GroupStats>,
    pub worst_group: Option<GroupStats>,
    pub available_symbols: Vec<String>,
    pub available_groups: Vec<String>,
}

/// `loaded` is the set after date/symbol/group filtering, in chronological
/// order. The outcome filter is applied here so the available symbol and
/// group lists still cover every outcome.
pub fn build_overview(loaded: &[Trade], query: &TradeQuery, starting_balance: f64) -> Overview {
    let trades: Vec<&Trade> = loaded.iter().filter(|t| query.keeps(t)).collect();

    let mut equity = starting_balance;
    let mut equity_curve = Vec::with_capacity(trades.len());
    let mut day_pnl: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_symbol: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
    let mut by_group: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();

    for &trade in &trades {
        equity += trade.pnl;
        let day = trade.date.map(|d| d.format("%Y-%m-%d").to_string());
        if let Some(day) = &day {
            *day_pnl.entry(day.clone()).or_default() += trade.pnl;
        }
        equity_curve.push(EquityPoint {
            id: trade.id,
            date: day,
            equity,
        });

        by_symbol
            .entry(trade.currency_pair.as_deref().unwrap_or(UNLABELLED))
            .or_default()
            .push(trade);
        by_group
            .entry(trade.group_type.as_deref().unwrap_or(UNLABELLED))
            .or_default()
            .push(trade);
    }

    let days_green = day_pnl.values().filter(|p| **p > 0.0).count();
    let days_red = day_pnl.values().filter(|p| **p < 0.0).count();

    let pnl_by_symbol: Vec<SymbolStats> = by_symbol
        .into_iter()
        .map(|(symbol, members)| SymbolStats {
            symbol: symbol.to_string(),
            summary: summarize(members),
        })
        .collect();
    let group_stats: Vec<GroupStats> = by_group
        .into_iter()
        .map(|(group, members)| GroupStats {
            group_type: group.to_string(),
            summary: summarize(members),
        })
        .collect();

    Overview {
        starting_balance,
        summary: summarize(trades.iter().copied()),
        days_green,
        days_red,
        best_trade: extreme(&trades, |a, b| a > b),
        worst_trade: extreme(&trades, |a, b| a < b),
        equity_curve,
        best_group: pick_group(&group_stats, |a, b| a > b),
        worst_group: pick_group(&group_stats, |a, b| a < b),
        pnl_by_symbol,
        group_stats,
        available_symbols: distinct(loaded.iter().map(|t| t.currency_pair.as_deref())),
        available_groups: distinct(loaded.iter().map(|t| t.group_type.as_deref())),
    }
}

/// First trade whose PnL beats every earlier one under `better`.
fn extreme(trades: &[&Trade], better: impl Fn(f64, f64) -> bool) -> Option<TradeDelta> {
    let mut best: Option<&Trade> = None;
    for &trade in trades {
        if best.is_none_or(|b| better(trade.pnl, b.pnl)) {
            best = Some(trade);
        }
    }
    best.map(|t| TradeDelta {
        id: t.id,
        date: t.date,
        delta: t.pnl,
    })
}

fn pick_group(groups: &[GroupStats], better: impl Fn(f64, f64) -> bool) -> Option<GroupStats> {
    let mut best: Option<&GroupStats> = None;
    for group in groups {
        if best.is_none_or(|b| better(group.summary.total_pnl, b.summary.total_pnl)) {
            best = Some(group);
        }
    }
    best.cloned()
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
