use crate::models::{CorrelationMatrix, Metric, StudentRecord};
use crate::stats;

/// Columns shown in the correlation heatmap.
pub const CORRELATION_COLUMNS: [Metric; 8] = [
    Metric::StudyHoursPerDay,
    Metric::SocialMediaHours,
    Metric::NetflixHours,
    Metric::AttendancePercentage,
    Metric::SleepHours,
    Metric::ExerciseFrequency,
    Metric::MentalHealthRating,
    Metric::ExamScore,
];

/// Pairwise Pearson correlations rounded to two decimals.
///
/// A row missing any of `columns` is dropped from the whole matrix, not just
/// from the pairs involving that column. Undefined coefficients (zero
/// variance, fewer than two rows) are NaN.
pub fn correlation_matrix<'a, I>(records: I, columns: &[Metric]) -> CorrelationMatrix
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let rows: Vec<Vec<f64>> = records
        .into_iter()
        .filter_map(|r| Metric::values(columns, r))
        .collect();

    let series: Vec<Vec<f64>> = (0..columns.len())
        .map(|j| rows.iter().map(|row| row[j]).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = stats::round_to(stats::pearson(&series[i], &series[j]), 2);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: columns.to_vec(),
        values,
        rows_used: rows.len(),
    }
}

/// Off-diagonal pairs ordered by absolute coefficient, strongest first.
pub fn strongest_pairs(matrix: &CorrelationMatrix) -> Vec<(Metric, Metric, f64)> {
    let mut pairs = Vec::new();
    for (i, a) in matrix.columns.iter().enumerate() {
        for (j, b) in matrix.columns.iter().enumerate().skip(i + 1) {
            let r = matrix.values[i][j];
            if r.is_finite() {
                pairs.push((*a, *b, r));
            }
        }
    }
    pairs.sort_by(|x, y| y.2.abs().total_cmp(&x.2.abs()));
    pairs
}
