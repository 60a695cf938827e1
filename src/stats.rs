//! Small numeric helpers shared by the aggregation modules.

use statrs::statistics::Statistics;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}

/// Quantile with linear interpolation between closest ranks.
///
/// `statrs` order statistics use the median-unbiased estimator, so the
/// interpolation is done here over a sorted copy.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + fraction * (sorted[upper] - sorted[lower]))
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Pearson correlation. NaN when either side has zero variance or fewer than two points.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return f64::NAN;
    }
    let var_x = xs.iter().population_variance();
    let var_y = ys.iter().population_variance();
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    let cov = xs.iter().population_covariance(ys.iter());
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Per-column min-max scaling onto `[lo, hi]`.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,
    pub lo: f64,
    pub hi: f64,
}

impl MinMaxScaler {
    /// Fits bounds over the rows; returns `None` for an empty input.
    pub fn fit(rows: &[Vec<f64>], lo: f64, hi: f64) -> Option<Self> {
        let width = rows.first()?.len();
        let mut mins = vec![f64::INFINITY; width];
        let mut maxs = vec![f64::NEG_INFINITY; width];
        for row in rows {
            for (j, v) in row.iter().enumerate() {
                mins[j] = mins[j].min(*v);
                maxs[j] = maxs[j].max(*v);
            }
        }
        Some(Self { mins, maxs, lo, hi })
    }

    /// Scales one value of column `j`. A constant column maps to `lo`.
    pub fn scale(&self, j: usize, value: f64) -> f64 {
        let range = self.maxs[j] - self.mins[j];
        if range == 0.0 {
            return self.lo;
        }
        self.lo + (value - self.mins[j]) / range * (self.hi - self.lo)
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter().enumerate().map(|(j, v)| self.scale(j, *v)).collect()
    }
}
