use serde::{Deserialize, Serialize};

/// Labels are matched as substrings of the lowercased, trimmed result text.
const WIN_MARKERS: &[&str] = &["presa", "vinta", "win"];
const LOSS_MARKERS: &[&str] = &["persa", "loss", "lost"];

/// Categorical outcome of a trade, derived from its free-text result label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
}

impl Outcome {
    /// Classify a result label. Anything that is neither a win nor a loss
    /// (pareggio, break-even, typos) counts as breakeven.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        if WIN_MARKERS.iter().any(|m| normalized.contains(m)) {
            Outcome::Win
        } else if LOSS_MARKERS.iter().any(|m| normalized.contains(m)) {
            Outcome::Loss
        } else {
            Outcome::Breakeven
        }
    }

    /// The numeric result stored alongside each trade: 1, -1 or 0.
    pub fn numeric(self) -> i64 {
        match self {
            Outcome::Win => 1,
            Outcome::Loss => -1,
            Outcome::Breakeven => 0,
        }
    }
}

/// Signed PnL of a single trade.
///
/// A win returns `amount * risk_reward / 100` when the risk-reward percentage
/// is positive, otherwise the stake itself (1:1). A loss always costs the full
/// stake. Missing result or zero stake yields 0.
pub fn compute_pnl(result: Option<&str>, amount: Option<f64>, risk_reward_percent: Option<f64>) -> f64 {
    let Some(result) = result.filter(|r| !r.trim().is_empty()) else {
        return 0.0;
    };
    let amount = match amount {
        Some(a) if a.is_finite() && a != 0.0 => a,
        _ => return 0.0,
    };

    match Outcome::from_label(result) {
        Outcome::Win => match risk_reward_percent {
            Some(rr) if rr.is_finite() && rr > 0.0 => amount * rr / 100.0,
            _ => amount,
        },
        Outcome::Loss => -amount.abs(),
        Outcome::Breakeven => 0.0,
    }
}

/// Numeric result for an optional label (0 when absent).
pub fn numeric_result(result: Option<&str>) -> i64 {
    result.map(|r| Outcome::from_label(r).numeric()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_costs_full_stake_regardless_of_rr() {
        assert_eq!(compute_pnl(Some("Persa"), Some(50.0), Some(80.0)), -50.0);
        assert_eq!(compute_pnl(Some("Persa"), Some(50.0), None), -50.0);
    }

    #[test]
    fn test_win_applies_risk_reward_percent() {
        assert_eq!(compute_pnl(Some("Presa"), Some(50.0), Some(20.0)), 10.0);
        assert_eq!(compute_pnl(Some("  PRESA "), Some(100.0), Some(84.0)), 84.0);
    }

    #[test]
    fn test_win_without_rr_falls_back_to_stake() {
        assert_eq!(compute_pnl(Some("Presa"), Some(50.0), None), 50.0);
        assert_eq!(compute_pnl(Some("Presa"), Some(50.0), Some(0.0)), 50.0);
        assert_eq!(compute_pnl(Some("Presa"), Some(50.0), Some(-5.0)), 50.0);
    }

    #[test]
    fn test_breakeven_and_missing_inputs() {
        assert_eq!(compute_pnl(Some("Pareggio"), Some(50.0), Some(10.0)), 0.0);
        assert_eq!(compute_pnl(None, Some(50.0), Some(10.0)), 0.0);
        assert_eq!(compute_pnl(Some(""), Some(50.0), Some(10.0)), 0.0);
        assert_eq!(compute_pnl(Some("Presa"), None, Some(10.0)), 0.0);
        assert_eq!(compute_pnl(Some("Presa"), Some(0.0), Some(10.0)), 0.0);
    }

    #[test]
    fn test_persa_is_not_mistaken_for_presa() {
        assert_eq!(Outcome::from_label("Persa"), Outcome::Loss);
        assert_eq!(Outcome::from_label("presa"), Outcome::Win);
        assert_eq!(Outcome::from_label("Vinta"), Outcome::Win);
        assert_eq!(Outcome::from_label("break-even"), Outcome::Breakeven);
    }

    #[test]
    fn test_numeric_result() {
        assert_eq!(numeric_result(Some("Presa")), 1);
        assert_eq!(numeric_result(Some("Persa")), -1);
        assert_eq!(numeric_result(Some("Pari")), 0);
        assert_eq!(numeric_result(None), 0);
    }
}
