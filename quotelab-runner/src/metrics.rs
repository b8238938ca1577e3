//! Performance metrics — pure functions from NAV histories and signal
//! series to scalar statistics.
//!
//! Every metric is a pure function: series in, scalar out. No dependencies
//! on the runner or the engine. Degenerate inputs (too few samples, zero
//! variance, non-finite intermediate values) resolve to 0.0 rather than
//! propagating NaN into a leaderboard.

use serde::{Deserialize, Serialize};

/// Simple period returns from a NAV history: `nav[t] / nav[t-1] - 1`.
/// The first, undefined value is dropped; fewer than two samples yield an
/// empty series.
pub fn periodic_returns(nav_history: &[f64]) -> Vec<f64> {
    if nav_history.len() < 2 {
        return Vec::new();
    }
    nav_history
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Cumulative growth of one unit through a return series.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(returns.len());
    let mut acc = 1.0;
    for r in returns {
        acc *= 1.0 + r;
        cumulative.push(acc);
    }
    cumulative
}

/// Annualized Sharpe ratio of a NAV history.
///
/// `mean(returns) * periods_per_year / (std(returns, ddof=1) * sqrt(periods_per_year))`.
/// Returns 0.0 for fewer than two returns or a zero/non-finite deviation.
pub fn sharpe_ratio(nav_history: &[f64], periods_per_year: f64) -> f64 {
    sharpe_from_returns(&periodic_returns(nav_history), periods_per_year)
}

/// Sharpe ratio of an already-computed return series.
pub fn sharpe_from_returns(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let sd = std_dev(returns);
    if !sd.is_finite() || sd < 1e-12 {
        return 0.0;
    }
    mean_f64(returns) * periods_per_year / (sd * periods_per_year.sqrt())
}

/// Maximum drawdown of a cumulative-return series, as a negative fraction.
///
/// Drawdown at each point is `value / running_max - 1`; non-finite points
/// (a running max of zero) are clamped to 0. Reports the minimum.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut running_max = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in cumulative {
        if value > running_max {
            running_max = value;
        }
        let mut dd = value / running_max - 1.0;
        if !dd.is_finite() {
            dd = 0.0;
        }
        if dd < worst {
            worst = dd;
        }
    }
    worst
}

/// Total return over a NAV history: `last / first - 1`.
pub fn total_return(nav_history: &[f64]) -> f64 {
    match (nav_history.first(), nav_history.last()) {
        (Some(&first), Some(&last)) if nav_history.len() >= 2 && first > 0.0 => last / first - 1.0,
        _ => 0.0,
    }
}

/// Annualized return over a NAV history.
pub fn annualized_return(nav_history: &[f64], periods_per_year: f64) -> f64 {
    let returns = periodic_returns(nav_history);
    if returns.is_empty() {
        return 0.0;
    }
    let (first, last) = (nav_history[0], nav_history[nav_history.len() - 1]);
    if first <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    (last / first).powf(periods_per_year / returns.len() as f64) - 1.0
}

/// Turnover of a signal series: the sum of absolute period-to-period
/// changes. The step into the first signal costs nothing.
pub fn turnover(signals: &[f64]) -> f64 {
    signals.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
}

// ─── Vectorized signal evaluation ───────────────────────────────────

/// Metrics of one signal series applied to one price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub ann_return: f64,
    pub ann_vol: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub total_return: f64,
    pub turnover: f64,
    /// Primary leaderboard score; currently the Sharpe ratio.
    pub score: f64,
}

/// Net period returns of a target-position signal over a price series.
///
/// The signal is shifted one period before being applied, so a position
/// decided at `t` earns the return realized over `t -> t+1` — no
/// look-ahead. A transaction cost proportional to the absolute change in
/// signal, in basis points, is charged at the period of the change.
pub fn signal_returns(prices: &[f64], signals: &[f64], cost_bps: f64) -> Vec<f64> {
    let n = prices.len();
    let signal_at = |t: usize| -> f64 {
        if t < signals.len() {
            signals[t]
        } else {
            0.0
        }
    };
    (0..n)
        .map(|t| {
            let price_return = if t == 0 || prices[t - 1] <= 0.0 {
                0.0
            } else {
                prices[t] / prices[t - 1] - 1.0
            };
            let held = if t == 0 { 0.0 } else { signal_at(t - 1) };
            let change = if t == 0 {
                0.0
            } else {
                (signal_at(t) - signal_at(t - 1)).abs()
            };
            held * price_return - change * (cost_bps / 10_000.0)
        })
        .collect()
}

/// Evaluate a signal series against a price series.
pub fn evaluate_signals(
    prices: &[f64],
    signals: &[f64],
    cost_bps: f64,
    periods_per_year: f64,
) -> SignalReport {
    let net = signal_returns(prices, signals, cost_bps);
    let cumulative = cumulative_returns(&net);
    let sharpe = sharpe_from_returns(&net, periods_per_year);
    let final_growth = cumulative.last().copied().unwrap_or(1.0);

    let ann_return = if net.is_empty() || final_growth <= 0.0 {
        0.0
    } else {
        final_growth.powf(periods_per_year / net.len() as f64) - 1.0
    };
    let ann_vol = if net.len() < 2 {
        0.0
    } else {
        std_dev(&net) * periods_per_year.sqrt()
    };

    SignalReport {
        ann_return,
        ann_vol,
        sharpe,
        max_drawdown: max_drawdown(&cumulative),
        total_return: final_growth - 1.0,
        turnover: turnover(signals),
        score: sharpe,
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
