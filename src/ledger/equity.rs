//! Running-equity arithmetic over a ledger ordered by import order.

/// Prefix sums of `pnls` seeded from `starting_balance`:
/// `equity[0] = start + pnl[0]`, `equity[i] = equity[i-1] + pnl[i]`.
pub fn running_equity<I>(starting_balance: f64, pnls: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut equity = starting_balance;
    pnls.into_iter()
        .map(|pnl| {
            equity += pnl;
            equity
        })
        .collect()
}

/// Equity after the last entry, or the starting balance for an empty ledger.
pub fn closing_equity(starting_balance: f64, pnls: &[f64]) -> f64 {
    starting_balance + pnls.iter().sum::<f64>()
}

/// Index of the first entry whose stored equity breaks the chain, if any.
/// Stored values are compared with a small tolerance for float round-off.
pub fn first_break(starting_balance: f64, rows: &[(f64, f64)]) -> Option<usize> {
    const EPSILON: f64 = 1e-6;
    let mut previous = starting_balance;
    for (i, &(pnl, equity)) in rows.iter().enumerate() {
        if (previous + pnl - equity).abs() > EPSILON {
            return Some(i);
        }
        previous = equity;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_equity_threads_from_start() {
        let equity = running_equity(700.0, [10.0, -30.0, 0.0, 25.5]);
        assert_eq!(equity, vec![710.0, 680.0, 680.0, 705.5]);
    }

    #[test]
    fn test_empty_ledger() {
        assert!(running_equity(700.0, Vec::new()).is_empty());
        assert_eq!(closing_equity(700.0, &[]), 700.0);
    }

    #[test]
    fn test_first_break_detects_stale_row() {
        let rows = vec![(10.0, 710.0), (-30.0, 680.0), (5.0, 700.0)];
        assert_eq!(first_break(700.0, &rows), Some(2));

        let rows = vec![(10.0, 710.0), (-30.0, 680.0)];
        assert_eq!(first_break(700.0, &rows), None);
    }
}
