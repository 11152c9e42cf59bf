use serde::{Deserialize, Serialize};

const USER_WEIGHT: f64 = 0.6;
const GROUP_WEIGHT: f64 = 0.4;
const MIN_WIN_RATE: f64 = 0.01;
const MAX_WIN_RATE: f64 = 0.99;

pub const DAILY_LOSS_REASON: &str = "Limite di perdita giornaliera raggiunto";
pub const CONSECUTIVE_LOSS_REASON: &str = "Limite di perdite consecutive raggiunto";

/// Risk limits chosen by the trader. Percentages are fractions (0.01 = 1%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoneyManagementConfig {
    pub base_risk_percent: f64,
    /// Share of the full Kelly fraction actually staked.
    pub kelly_factor: f64,
    pub max_daily_loss_percent: f64,
    pub max_consecutive_losses: u32,
    #[serde(alias = "stakeMinimo")]
    pub min_stake: f64,
    /// Multiplier applied to the stake while in recovery.
    pub recovery_reduction: f64,
}

impl Default for MoneyManagementConfig {
    fn default() -> Self {
        Self {
            base_risk_percent: 0.01,
            kelly_factor: 0.25,
            max_daily_loss_percent: 0.04,
            max_consecutive_losses: 3,
            min_stake: 1.0,
            recovery_reduction: 0.7,
        }
    }
}

/// Current state of the account as seen by the advisor. Win rates and the
/// daily PnL are fractions; `payout` is the net return of a win per unit staked.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsInput {
    pub equity: f64,
    pub win_rate_user: f64,
    pub win_rate_group: f64,
    pub payout: f64,
    pub consecutive_losses: u32,
    #[serde(rename = "dailyPnLPercent")]
    pub daily_pnl_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeSuggestion {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub suggested_stake: f64,
    pub base_stake: f64,
    pub kelly_stake: f64,
    pub used_risk_percent: f64,
    pub combined_win_rate: f64,
    /// Reduced stake to consider once trading resumes; 0 when sizing is allowed.
    pub recovery_stake: f64,
}

/// Kelly fraction `(p * (b + 1) - 1) / b` for win probability `p` and net
/// odds `b`, floored at 0.
pub fn kelly_fraction(win_rate: f64, payout: f64) -> f64 {
    if payout <= 0.0 {
        return 0.0;
    }
    let f = (win_rate * (payout + 1.0) - 1.0) / payout;
    if f.is_finite() && f > 0.0 { f } else { 0.0 }
}

/// Blend of personal and group win rate, kept away from 0 and 1.
pub fn combined_win_rate(user: f64, group: f64) -> f64 {
    let raw = USER_WEIGHT * user + GROUP_WEIGHT * group;
    if raw.is_nan() {
        return MIN_WIN_RATE;
    }
    raw.clamp(MIN_WIN_RATE, MAX_WIN_RATE)
}

pub fn calculate_stake_suggestion(config: &MoneyManagementConfig, stats: &StatsInput) -> StakeSuggestion {
    let equity = if stats.equity.is_finite() && stats.equity > 0.0 { stats.equity } else { 0.0 };
    let base_risk = config.base_risk_percent.max(0.0);
    let base_stake = equity * base_risk;

    let combined = combined_win_rate(stats.win_rate_user, stats.win_rate_group);
    let adjusted_kelly = kelly_fraction(combined, stats.payout) * config.kelly_factor.max(0.0);

    let used_risk_percent = base_risk.max(adjusted_kelly);
    let kelly_stake = equity * adjusted_kelly;
    let suggested_stake = equity * used_risk_percent;

    let blocked = if stats.daily_pnl_percent <= -config.max_daily_loss_percent {
        Some(DAILY_LOSS_REASON)
    } else if stats.consecutive_losses >= config.max_consecutive_losses {
        Some(CONSECUTIVE_LOSS_REASON)
    } else {
        None
    };

    match blocked {
        Some(reason) => StakeSuggestion {
            allowed: false,
            reason: Some(reason.to_string()),
            suggested_stake: 0.0,
            base_stake,
            kelly_stake,
            used_risk_percent: 0.0,
            combined_win_rate: combined,
            recovery_stake: suggested_stake * config.recovery_reduction.clamp(0.0, 1.0),
        },
        None => StakeSuggestion {
            allowed: true,
            reason: None,
            suggested_stake: suggested_stake.max(config.min_stake.max(0.0)).min(equity),
            base_stake,
            kelly_stake,
            used_risk_percent,
            combined_win_rate: combined,
            recovery_stake: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn healthy() -> StatsInput {
        StatsInput {
            equity: 1000.0,
            win_rate_user: 0.6,
            win_rate_group: 0.6,
            payout: 0.84,
            consecutive_losses: 0,
            daily_pnl_percent: 0.0,
        }
    }

    #[test]
    fn test_fractional_kelly_wins_over_base_risk() {
        let config = MoneyManagementConfig::default();
        let s = calculate_stake_suggestion(&config, &healthy());

        // f = (0.6 * 1.84 - 1) / 0.84 = 0.1047..., quarter Kelly = 0.0261...
        let expected_kelly = (0.6 * 1.84 - 1.0) / 0.84 * 0.25;
        assert!(s.allowed);
        assert!(s.reason.is_none());
        assert!(approx(s.combined_win_rate, 0.6));
        assert!(approx(s.used_risk_percent, expected_kelly));
        assert!(approx(s.kelly_stake, 1000.0 * expected_kelly));
        assert!(approx(s.suggested_stake, 1000.0 * expected_kelly));
        assert!(approx(s.base_stake, 10.0));
    }

    #[test]
    fn test_negative_edge_falls_back_to_base_risk() {
        let config = MoneyManagementConfig::default();
        let stats = StatsInput {
            win_rate_user: 0.4,
            win_rate_group: 0.4,
            ..healthy()
        };
        let s = calculate_stake_suggestion(&config, &stats);
        assert_eq!(s.kelly_stake, 0.0);
        assert!(approx(s.used_risk_percent, 0.01));
        assert!(approx(s.suggested_stake, 10.0));
    }

    #[test]
    fn test_win_rate_is_clamped() {
        assert_eq!(combined_win_rate(1.0, 1.0), MAX_WIN_RATE);
        assert_eq!(combined_win_rate(0.0, 0.0), MIN_WIN_RATE);
        assert_eq!(kelly_fraction(0.99, 0.0), 0.0);
    }

    #[test]
    fn test_daily_loss_limit_blocks() {
        let config = MoneyManagementConfig::default();
        let stats = StatsInput {
            daily_pnl_percent: -0.04,
            ..healthy()
        };
        let s = calculate_stake_suggestion(&config, &stats);
        assert!(!s.allowed);
        assert_eq!(s.reason.as_deref(), Some(DAILY_LOSS_REASON));
        assert_eq!(s.suggested_stake, 0.0);
        assert_eq!(s.used_risk_percent, 0.0);
        assert!(s.recovery_stake > 0.0);
    }

    #[test]
    fn test_consecutive_losses_block() {
        let config = MoneyManagementConfig::default();
        let stats = StatsInput {
            consecutive_losses: 3,
            ..healthy()
        };
        let s = calculate_stake_suggestion(&config, &stats);
        assert!(!s.allowed);
        assert_eq!(s.reason.as_deref(), Some(CONSECUTIVE_LOSS_REASON));
    }

    #[test]
    fn test_min_stake_never_exceeds_equity() {
        let config = MoneyManagementConfig {
            min_stake: 5.0,
            ..Default::default()
        };
        let small = StatsInput {
            equity: 100.0,
            ..healthy()
        };
        assert_eq!(calculate_stake_suggestion(&config, &small).suggested_stake, 5.0);

        let tiny = StatsInput {
            equity: 3.0,
            ..healthy()
        };
        assert_eq!(calculate_stake_suggestion(&config, &tiny).suggested_stake, 3.0);

        let broke = StatsInput {
            equity: -50.0,
            ..healthy()
        };
        let s = calculate_stake_suggestion(&config, &broke);
        assert_eq!(s.suggested_stake, 0.0);
        assert_eq!(s.base_stake, 0.0);
    }

    #[test]
    fn test_suggestion_is_never_negative() {
        let config = MoneyManagementConfig {
            kelly_factor: -1.0,
            base_risk_percent: -0.5,
            ..Default::default()
        };
        for payout in [0.0, 0.5, 0.84, 2.0] {
            for wr in [0.0, 0.3, 0.7, 1.0] {
                let stats = StatsInput {
                    win_rate_user: wr,
                    win_rate_group: wr,
                    payout,
                    ..healthy()
                };
                assert!(calculate_stake_suggestion(&config, &stats).suggested_stake >= 0.0);
            }
        }
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MoneyManagementConfig = serde_json::from_str(r#"{"kellyFactor": 0.5}"#).unwrap();
        assert_eq!(config.kelly_factor, 0.5);
        assert_eq!(config.max_consecutive_losses, 3);
        assert_eq!(config.recovery_reduction, 0.7);
    }

    #[test]
    fn test_client_field_names() {
        let config: MoneyManagementConfig = serde_json::from_str(r#"{"stakeMinimo": 5}"#).unwrap();
        assert_eq!(config.min_stake, 5.0);

        let stats: StatsInput = serde_json::from_str(
            r#"{"equity": 700, "winRateUser": 0.6, "winRateGroup": 0.6, "payout": 0.85,
                "consecutiveLosses": 0, "dailyPnLPercent": -0.05}"#,
        )
        .unwrap();
        assert_eq!(stats.daily_pnl_percent, -0.05);
        assert!(!calculate_stake_suggestion(&MoneyManagementConfig::default(), &stats).allowed);

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["dailyPnLPercent"], -0.05);
    }
}
