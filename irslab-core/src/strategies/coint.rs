//! Cointegration gate for the pairs strategy.
//!
//! The gate is a capability so tests can stub the verdict; the default is
//! a two-step Engle–Granger check: OLS hedge regression, then an
//! augmented Dickey–Fuller statistic (one lagged difference, no
//! deterministic terms) on the spread, mapped to an approximate p-value
//! by interpolating the standard two-variable critical values.

/// Reports how confident we are that two series are NOT cointegrated.
///
/// Values at or above the caller's threshold (conventionally 0.05) mean
/// the no-cointegration hypothesis cannot be rejected and pair trades
/// should be unwound.
pub trait CointegrationTest {
    fn p_value(&self, x: &[f64], y: &[f64]) -> f64;
}

/// Interpolation anchors: (ADF t-statistic, p-value) for a two-variable
/// cointegrating regression with constant. The inner three points are the
/// standard 1% / 5% / 10% critical values.
const P_ANCHORS: &[(f64, f64)] = &[
    (-6.00, 0.0001),
    (-3.90, 0.01),
    (-3.34, 0.05),
    (-3.04, 0.10),
    (-2.57, 0.20),
    (-1.94, 0.45),
    (-1.00, 0.70),
    (0.00, 0.90),
];

/// Minimum observations for a meaningful verdict; shorter inputs cannot
/// reject anything.
const MIN_OBSERVATIONS: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct EngleGranger;

impl CointegrationTest for EngleGranger {
    fn p_value(&self, x: &[f64], y: &[f64]) -> f64 {
        let n = x.len().min(y.len());
        if n < MIN_OBSERVATIONS {
            return 1.0;
        }
        let x = &x[x.len() - n..];
        let y = &y[y.len() - n..];

        let Some((intercept, slope)) = hedge_regression(x, y) else {
            return 1.0;
        };
        let spread: Vec<f64> = x
            .iter()
            .zip(y)
            .map(|(&xv, &yv)| yv - intercept - slope * xv)
            .collect();

        match adf_t_stat(&spread) {
            Some(t) => p_from_t(t),
            None => 1.0,
        }
    }
}

/// OLS of y on x with intercept. `None` when x has no variance.
fn hedge_regression(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&xv, &yv) in x.iter().zip(y) {
        sxx += (xv - x_mean) * (xv - x_mean);
        sxy += (xv - x_mean) * (yv - y_mean);
    }
    if sxx < 1e-300 {
        return None;
    }
    let slope = sxy / sxx;
    Some((y_mean - slope * x_mean, slope))
}

/// ADF regression with one lagged difference and no deterministic terms:
/// `Δs_t = γ·s_{t-1} + φ·Δs_{t-1} + ε`. Returns the t-statistic of γ̂,
/// or `None` when the regressors are (near) collinear.
fn adf_t_stat(spread: &[f64]) -> Option<f64> {
    let n = spread.len();
    if n < 4 {
        return None;
    }

    // Observation t runs over 2..n.
    let m = n - 2;
    let mut s_ll = 0.0; // Σ lag²
    let mut s_ld = 0.0; // Σ lag·dlag
    let mut s_dd = 0.0; // Σ dlag²
    let mut s_ly = 0.0; // Σ lag·Δ
    let mut s_dy = 0.0; // Σ dlag·Δ
    for t in 2..n {
        let dy = spread[t] - spread[t - 1];
        let lag = spread[t - 1];
        let dlag = spread[t - 1] - spread[t - 2];
        s_ll += lag * lag;
        s_ld += lag * dlag;
        s_dd += dlag * dlag;
        s_ly += lag * dy;
        s_dy += dlag * dy;
    }

    let det = s_ll * s_dd - s_ld * s_ld;
    if det.abs() < 1e-300 {
        return None;
    }
    let gamma = (s_ly * s_dd - s_dy * s_ld) / det;
    let phi = (s_dy * s_ll - s_ly * s_ld) / det;

    let mut rss = 0.0;
    for t in 2..n {
        let dy = spread[t] - spread[t - 1];
        let lag = spread[t - 1];
        let dlag = spread[t - 1] - spread[t - 2];
        let residual = dy - gamma * lag - phi * dlag;
        rss += residual * residual;
    }
    if m <= 2 {
        return None;
    }
    let sigma2 = rss / (m - 2) as f64;
    let var_gamma = sigma2 * s_dd / det;
    if var_gamma <= 0.0 {
        // Zero residual variance: the spread is exactly deterministic and
        // carries no information about mean reversion. Don't reject.
        return None;
    }
    Some(gamma / var_gamma.sqrt())
}

/// Piecewise-linear interpolation over the anchor table, clamped at the
/// ends.
fn p_from_t(t: f64) -> f64 {
    if t.is_nan() {
        return 1.0;
    }
    let (first_t, first_p) = P_ANCHORS[0];
    if t <= first_t {
        return first_p;
    }
    for window in P_ANCHORS.windows(2) {
        let (t0, p0) = window[0];
        let (t1, p1) = window[1];
        if t <= t1 {
            let frac = (t - t0) / (t1 - t0);
            return p0 + frac * (p1 - p0);
        }
    }
    let (_, last_p) = P_ANCHORS[P_ANCHORS.len() - 1];
    last_p.max(0.95)
}
