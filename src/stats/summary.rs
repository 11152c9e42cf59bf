use serde::Serialize;

use crate::models::Trade;

/// Reported instead of infinity when a set has wins and no losses.
pub const PROFIT_FACTOR_CAP: f64 = 999.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_trades: usize,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub win_rate: f64,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub avg_risk_reward: f64,
}

/// Statistics over any trade collection. Wins and losses are decided by the
/// sign of the stored PnL.
pub fn summarize<'a, I>(trades: I) -> Summary
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut s = Summary::default();
    let mut rr_sum = 0.0;
    let mut rr_count = 0usize;

    for trade in trades {
        s.total_trades += 1;
        s.total_pnl += trade.pnl;

        if trade.pnl > 0.0 {
            s.wins += 1;
            s.gross_profit += trade.pnl;
        } else if trade.pnl < 0.0 {
            s.losses += 1;
            s.gross_loss += trade.pnl.abs();
        } else {
            s.breakevens += 1;
        }

        if let Some(rr) = trade.risk_reward.filter(|rr| rr.is_finite()) {
            rr_sum += rr;
            rr_count += 1;
        }
    }

    if s.total_trades > 0 {
        s.avg_pnl = s.total_pnl / s.total_trades as f64;
    }
    if rr_count > 0 {
        s.avg_risk_reward = rr_sum / rr_count as f64;
    }
    s.win_rate = win_rate(s.wins, s.losses);
    s.profit_factor = profit_factor(s.gross_profit, s.gross_loss);
    s
}

/// Percentage of decided trades that were won; breakevens don't count.
pub fn win_rate(wins: usize, losses: usize) -> f64 {
    let decided = wins + losses;
    if decided == 0 {
        0.0
    } else {
        wins as f64 / decided as f64 * 100.0
    }
}

pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
    } else if gross_profit > 0.0 {
        PROFIT_FACTOR_CAP
    } else {
        0.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn trade_with(id: i64, pnl: f64) -> Trade {
        Trade {
            id,
            trade_number: Some(id),
            import_order: id,
            date: None,
            day_of_week: None,
            currency_pair: None,
            position_type: None,
            open_time: None,
            group_type: None,
            result: None,
            amount: Some(pnl.abs()),
            risk_reward: None,
            pnl,
            equity: 0.0,
            numeric_result: 0,
            notes: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_win_rate_excludes_breakevens() {
        let trades: Vec<Trade> = [10.0, 5.0, 8.0, -4.0, -6.0, 0.0]
            .iter()
            .enumerate()
            .map(|(i, pnl)| trade_with(i as i64 + 1, *pnl))
            .collect();
        let s = summarize(&trades);

        assert_eq!(s.total_trades, 6);
        assert_eq!((s.wins, s.losses, s.breakevens), (3, 2, 1));
        assert_eq!(s.win_rate, 60.0);
        assert_eq!(s.total_pnl, 13.0);
        assert_eq!(s.gross_profit, 23.0);
        assert_eq!(s.gross_loss, 10.0);
        assert_eq!(s.profit_factor, 2.3);
    }

    #[test]
    fn test_empty_set() {
        let s = summarize(&Vec::<Trade>::new());
        assert_eq!(s, Summary::default());
    }

    #[test]
    fn test_profit_factor_sentinel() {
        let trades = vec![trade_with(1, 10.0), trade_with(2, 0.0)];
        assert_eq!(summarize(&trades).profit_factor, PROFIT_FACTOR_CAP);

        let trades = vec![trade_with(1, 0.0)];
        assert_eq!(summarize(&trades).profit_factor, 0.0);
        assert_eq!(summarize(&trades).win_rate, 0.0);
    }

    #[test]
    fn test_average_risk_reward_ignores_missing() {
        let mut a = trade_with(1, 10.0);
        a.risk_reward = Some(20.0);
        let mut b = trade_with(2, 42.0);
        b.risk_reward = Some(84.0);
        let c = trade_with(3, -5.0);

        assert_eq!(summarize(&[a, b, c]).avg_risk_reward, 52.0);
    }
}
