//! Golden regression tests for the replay accounting.
//!
//! Execution is deterministic and fee-free cases have no modeled noise,
//! so these assert exact equality against independently recomputed
//! values. If one fails, either a bug crept into the accounting or the
//! accounting genuinely changed (update the golden arithmetic).

use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use irslab_core::apy::{annualize, SECONDS_PER_YEAR};
use irslab_runner::{run_backtest, BacktestConfig, StrategyConfig};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 4, 1, 0, 0, 0).unwrap()
}

fn write_dataset(dir: &Path, token: &str, indices: &[f64]) {
    let mut contents = String::from("date,liquidityIndex\n");
    for (i, idx) in indices.iter().enumerate() {
        let stamp = start() + Duration::days(i as i64);
        contents.push_str(&format!("{},{:e}\n", stamp.to_rfc3339(), idx));
    }
    std::fs::write(dir.join(format!("{token}.csv")), contents).unwrap();
}

fn long_rate_config(dir: &Path, fee: f64, leverage: f64, capital: f64) -> BacktestConfig {
    BacktestConfig {
        data_dir: dir.to_path_buf(),
        tokens: vec!["aave_usdc".to_string()],
        start: None,
        end: None,
        leverage,
        initial_capital: capital,
        fee,
        exit_policy: Default::default(),
        resample_daily: false,
        strategy: StrategyConfig::LongRate,
    }
}

#[test]
fn constant_index_pins_final_equity_to_one() {
    // A dormant pool: both legs of the swap accrue exactly zero, so the
    // equity curve never moves off 1.0.
    let tmp = tempfile::tempdir().unwrap();
    write_dataset(tmp.path(), "aave_usdc", &[1e27; 8]);

    let result = run_backtest(&long_rate_config(tmp.path(), 0.0, 1.0, 1.0)).unwrap();

    assert_eq!(result.equity_curve.len(), 9);
    for point in &result.equity_curve {
        assert_eq!(point.equity, 1.0);
        assert_eq!(point.returns, 0.0);
    }
}

#[test]
fn increasing_index_matches_the_recomputed_curve_exactly() {
    // Strictly increasing index from 1e27, leverage 1, capital 1, zero
    // fees: the long fills on bar 2 and the remaining bars mark the swap
    // against the locked fixed leg. Every value below is recomputed from
    // the accounting definitions and must match bit for bit.
    let mut indices = vec![1e27];
    for _ in 1..6 {
        indices.push(indices.last().unwrap() * (1.0 + 0.0002));
    }
    let tmp = tempfile::tempdir().unwrap();
    write_dataset(tmp.path(), "aave_usdc", &indices);

    let result = run_backtest(&long_rate_config(tmp.path(), 0.0, 1.0, 1.0)).unwrap();

    // Fill happens while draining bar 2: fixed leg from bars 1-2, the
    // variable leg accrues from bar 2's index.
    let fixed_rate = annualize(indices[1] / indices[0] - 1.0, 86400.0);
    let starting = indices[1];

    // Holdings totals: seed + bar 1 + bar 2 are all cash; bars 3..6 mark
    // the open swap (cash is zero, value = margin + cashflow).
    let mut totals = vec![1.0, 1.0, 1.0];
    for (i, &index) in indices.iter().enumerate().skip(2) {
        let variable = index / starting - 1.0;
        let elapsed = ((i - 1) as f64) * 86400.0;
        let fixed = fixed_rate * elapsed / SECONDS_PER_YEAR;
        let cashflow = 1.0 * 1.0 * (variable - fixed);
        let value = 1.0 + cashflow;
        totals.push(0.0 + value);
    }

    assert_eq!(result.holdings.len(), totals.len());
    for (snapshot, &expected) in result.holdings.iter().zip(&totals) {
        assert_eq!(snapshot.total, expected, "total mismatch at {}", snapshot.timestamp);
        assert!(snapshot.is_consistent());
    }

    // Equity: cumulative product of bar-over-bar returns, from 1.0.
    let mut equity = 1.0;
    let mut expected_curve = vec![1.0];
    for pair in totals.windows(2) {
        let returns = pair[1] / pair[0] - 1.0;
        equity *= 1.0 + returns;
        expected_curve.push(equity);
    }
    let final_equity = result.equity_curve.last().unwrap().equity;
    assert_eq!(final_equity, *expected_curve.last().unwrap());
    // Under steady growth the compounded fixed leg outpaces the linear
    // index ratio, so the variable taker bleeds slightly.
    assert!(
        final_equity < 1.0,
        "steady growth favors the fixed leg, got {final_equity}"
    );
}

#[test]
fn fee_and_margin_leave_cash_in_the_same_step() {
    // Fee 10 on a 1000 margin post: cash goes to -10 at the fill and the
    // cumulative fee reads 10 from the next snapshot on.
    let mut indices = vec![1e27];
    for _ in 1..5 {
        indices.push(indices.last().unwrap() * (1.0 + 0.0001));
    }
    let tmp = tempfile::tempdir().unwrap();
    write_dataset(tmp.path(), "aave_usdc", &indices);

    let result = run_backtest(&long_rate_config(tmp.path(), 10.0, 1.0, 1000.0)).unwrap();

    // Bar 2's snapshot predates the fill cascade; bar 3's reflects it.
    assert_eq!(result.holdings[2].cash, 1000.0);
    assert_eq!(result.holdings[2].fee, 0.0);
    assert_eq!(result.holdings[3].cash, -10.0);
    assert_eq!(result.holdings[3].fee, 10.0);
    for snapshot in &result.holdings {
        assert!(snapshot.is_consistent());
    }
}

#[test]
fn levered_sizing_scales_the_swap_not_the_margin() {
    let mut indices = vec![1e27];
    for _ in 1..6 {
        indices.push(indices.last().unwrap() * (1.0 + 0.0002));
    }
    let tmp = tempfile::tempdir().unwrap();
    write_dataset(tmp.path(), "aave_usdc", &indices);

    let unlevered = run_backtest(&long_rate_config(tmp.path(), 0.0, 1.0, 1.0)).unwrap();
    let levered = run_backtest(&long_rate_config(tmp.path(), 0.0, 10.0, 1.0)).unwrap();

    // Same margin outlay, ten times the notional: the levered total
    // moves ten times as far from 1.0 on every marked bar.
    let unlevered_final = unlevered.holdings.last().unwrap().total;
    let levered_final = levered.holdings.last().unwrap().total;
    let expected = 1.0 + (unlevered_final - 1.0) * 10.0;
    assert!(
        (levered_final - expected).abs() < 1e-12,
        "levered {levered_final} vs expected {expected}"
    );
    // Steady growth bleeds the variable taker, so leverage amplifies the
    // bleed.
    assert!(levered_final < unlevered_final);
}
