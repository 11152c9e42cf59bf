use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ledger::equity::closing_equity;
use crate::models::Trade;
use crate::money::advisor::{calculate_stake_suggestion, MoneyManagementConfig, StakeSuggestion, StatsInput};

/// Payout odds per group, with a fallback for groups not listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutTable {
    pub default_payout: f64,
    pub payouts: Vec<GroupPayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPayout {
    pub group: String,
    pub payout: f64,
}

impl PayoutTable {
    pub fn payout_for(&self, group: &str) -> Option<f64> {
        self.payouts.iter().find(|p| p.group == group).map(|p| p.payout)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.payouts.iter().map(|p| p.group.as_str())
    }
}

impl Default for PayoutTable {
    fn default() -> Self {
        let entry = |group: &str, payout: f64| GroupPayout {
            group: group.to_string(),
            payout,
        };
        Self {
            default_payout: 0.8,
            payouts: vec![
                entry("Gruppo Live", 0.82),
                entry("Gruppo Elite Pro", 0.86),
                entry("Bot", 0.80),
            ],
        }
    }
}

/// Advisor inputs derived from the stored ledger.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub equity: f64,
    pub win_rate_user: f64,
    pub group_win_rates: BTreeMap<String, f64>,
    pub consecutive_losses: u32,
    #[serde(rename = "dailyPnLPercent")]
    pub daily_pnl_percent: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionRequest {
    pub config: MoneyManagementConfig,
    /// Per-group overrides, as fractions (0.84) or percentages (84).
    pub payouts: BTreeMap<String, f64>,
    /// Restrict the answer to these groups.
    pub groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSuggestion {
    pub group_type: String,
    pub payout: f64,
    pub win_rate_group: f64,
    #[serde(flatten)]
    pub suggestion: StakeSuggestion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionReport {
    pub config: MoneyManagementConfig,
    #[serde(flatten)]
    pub snapshot: LedgerSnapshot,
    pub suggestions: Vec<GroupSuggestion>,
}

/// Decided trades only; a set without wins or losses has no rate.
fn decided_rate(wins: usize, losses: usize) -> Option<f64> {
    let decided = wins + losses;
    (decided > 0).then(|| wins as f64 / decided as f64)
}

/// Derive the advisor inputs from trades in chronological order.
pub fn snapshot(trades: &[Trade], starting_balance: f64) -> LedgerSnapshot {
    let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
    let equity = closing_equity(starting_balance, &pnls);

    let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
    let losses = trades.iter().filter(|t| t.pnl < 0.0).count();
    let win_rate_user = decided_rate(wins, losses).unwrap_or(0.0);

    let mut per_group: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for trade in trades {
        let Some(group) = trade.group_type.as_deref() else {
            continue;
        };
        let entry = per_group.entry(group).or_default();
        if trade.pnl > 0.0 {
            entry.0 += 1;
        } else if trade.pnl < 0.0 {
            entry.1 += 1;
        }
    }
    let group_win_rates = per_group
        .into_iter()
        .map(|(group, (w, l))| (group.to_string(), decided_rate(w, l).unwrap_or(win_rate_user)))
        .collect();

    let consecutive_losses = trades.iter().rev().take_while(|t| t.pnl < 0.0).count() as u32;

    let last_day = trades.iter().rev().find_map(|t| t.date).map(|d| d.date());
    let last_day_pnl: f64 = trades
        .iter()
        .filter(|t| t.date.map(|d| d.date()) == last_day && last_day.is_some())
        .map(|t| t.pnl)
        .sum();
    let daily_pnl_percent = if equity > 0.0 { last_day_pnl / equity } else { 0.0 };

    LedgerSnapshot {
        equity,
        win_rate_user,
        group_win_rates,
        consecutive_losses,
        daily_pnl_percent,
    }
}

/// Percentages above 1 are read as "84" meaning 0.84.
fn as_fraction(payout: f64) -> f64 {
    if payout > 1.0 { payout / 100.0 } else { payout }
}

/// One stake suggestion per group. Groups are those asked for, else every
/// group known from the payout table or the ledger.
pub fn suggest(request: &SuggestionRequest, snapshot: LedgerSnapshot, table: &PayoutTable) -> SuggestionReport {
    let groups: Vec<String> = match &request.groups {
        Some(groups) => groups.clone(),
        None => table
            .groups()
            .chain(snapshot.group_win_rates.keys().map(String::as_str))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    let suggestions = groups
        .into_iter()
        .map(|group| {
            let payout = as_fraction(
                request
                    .payouts
                    .get(&group)
                    .copied()
                    .or_else(|| table.payout_for(&group))
                    .unwrap_or(table.default_payout),
            );
            let win_rate_group = snapshot
                .group_win_rates
                .get(&group)
                .copied()
                .unwrap_or(snapshot.win_rate_user);

            let stats = StatsInput {
                equity: snapshot.equity,
                win_rate_user: snapshot.win_rate_user,
                win_rate_group,
                payout,
                consecutive_losses: snapshot.consecutive_losses,
                daily_pnl_percent: snapshot.daily_pnl_percent,
            };

            GroupSuggestion {
                suggestion: calculate_stake_suggestion(&request.config, &stats),
                group_type: group,
                payout,
                win_rate_group,
            }
        })
        .collect();

    SuggestionReport {
        config: request.config,
        snapshot,
        suggestions,
    }
}
