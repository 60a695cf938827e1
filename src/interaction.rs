//! UI events mapped onto fresh aggregations. Each event yields one figure.

use serde::Deserialize;
use tracing::debug;

use crate::charts::radar::UserTrace;
use crate::charts::Figure;
use crate::dashboard::{Dashboard, RadarBaseline};
use crate::error::{DashboardError, Result};
use crate::models::Metric;
use crate::summary::Demographic;

/// Slider values (raw units, one per radar habit) and the button click counter.
#[derive(Debug, Clone, Deserialize)]
pub struct RadarRequest {
    pub values: Vec<f64>,
    #[serde(default)]
    pub clicks: u32,
}

/// Whether a higher value of the habit is the healthier direction.
fn higher_is_better(habit: Metric) -> bool {
    !matches!(habit, Metric::SocialMediaHours | Metric::NetflixHours)
}

/// True when the viewer is at least as good as the mid-level baseline.
pub fn on_track(habit: Metric, user: f64, mid: f64) -> bool {
    if higher_is_better(habit) {
        user >= mid
    } else {
        user <= mid
    }
}

pub fn advice(habit: Metric, encouraging: bool) -> &'static str {
    match (habit, encouraging) {
        (Metric::StudyHoursPerDay, true) => "Great study routine, keep it going!",
        (Metric::StudyHoursPerDay, false) => "Try adding a little more focused study time each day.",
        (Metric::SocialMediaHours, true) => "Nice balance with social media.",
        (Metric::SocialMediaHours, false) => "Consider cutting back on social media.",
        (Metric::NetflixHours, true) => "Your streaming time is under control.",
        (Metric::NetflixHours, false) => "Try limiting streaming to free up time.",
        (Metric::SleepHours, true) => "You're getting good rest.",
        (Metric::SleepHours, false) => "Aim for a bit more sleep each night.",
        (Metric::DietQuality, true) => "Your diet supports your performance.",
        (Metric::DietQuality, false) => "Improving your diet could boost your energy.",
        (Metric::ExerciseFrequency, true) => "Good job staying active!",
        (Metric::ExerciseFrequency, false) => "Adding regular exercise can help your focus.",
        (Metric::MentalHealthRating, true) => "You're taking care of your mental health.",
        (Metric::MentalHealthRating, false) => "Consider taking time for your mental well-being.",
        (_, true) => "You're on track.",
        (_, false) => "There is room to improve here.",
    }
}

/// Normalizes slider values with the baseline's bounds and picks advice per habit.
pub fn user_trace(baseline: &RadarBaseline, raw: &[f64]) -> Result<UserTrace> {
    if raw.len() != baseline.habits.len() {
        return Err(DashboardError::InvalidInput(format!(
            "expected {} slider values, got {}",
            baseline.habits.len(),
            raw.len()
        )));
    }
    if let Some(bad) = raw.iter().find(|v| !v.is_finite()) {
        return Err(DashboardError::InvalidInput(format!(
            "slider value {bad} is not a number"
        )));
    }

    let (lo, hi) = baseline.range;
    let values: Vec<f64> = raw
        .iter()
        .enumerate()
        .map(|(j, v)| match &baseline.scaler {
            Some(scaler) => scaler.scale(j, *v).clamp(lo, hi),
            None => lo,
        })
        .collect();

    let mid = baseline.mid_level();
    let lines = baseline
        .habits
        .iter()
        .zip(&values)
        .map(|(habit, user)| {
            let encouraging = mid
                .and_then(|m| m.mean(*habit))
                .map_or(true, |mid| on_track(*habit, *user, mid));
            advice(*habit, encouraging)
        })
        .collect();

    Ok(UserTrace {
        values,
        advice: lines,
    })
}

/// "Recompute radar chart": no clicks yet means the plain group comparison.
pub fn recompute_radar(dashboard: &Dashboard, request: &RadarRequest) -> Result<Figure> {
    debug!(clicks = request.clicks, "recomputing radar chart");
    if request.clicks == 0 {
        return dashboard.radar_figure(None);
    }
    let baseline = dashboard.radar_baseline()?;
    let user = user_trace(&baseline, &request.values)?;
    dashboard.radar_figure(Some(&user))
}

/// "Recompute correlation matrix" for `All students` or one persona.
pub fn recompute_correlation(dashboard: &Dashboard, group: &str) -> Result<Figure> {
    debug!(group, "recomputing correlation matrix");
    dashboard.correlation_figure(group)
}

/// "Recompute Sankey" for a left dimension and a habit column name.
pub fn recompute_sankey(dashboard: &Dashboard, left: &str, habit: &str) -> Result<Figure> {
    debug!(left, habit, "recomputing sankey");
    let left: Demographic = left.parse()?;
    let habit: Metric = habit.parse()?;
    dashboard.sankey_figure(left, habit)
}
