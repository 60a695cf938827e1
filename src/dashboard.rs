//! The loaded table plus everything derived from it once per process.

use tracing::{info, warn};

use crate::charts::radar::UserTrace;
use crate::charts::{bar, heatmap, radar, sankey, scatter, waffle, ChartKind, Figure};
use crate::cluster::{cluster_students, ClusterProfile, Clustering};
use crate::config::{
    AggregationProfile, Config, BAR_PROFILE, RADAR_PROFILE, SANKEY_PROFILE, WAFFLE_PROFILE,
};
use crate::error::{DashboardError, Result};
use crate::grouping::assign_groups;
use crate::models::{HabitSummary, Metric, PerformanceGroup, StudentRecord};
use crate::stats::MinMaxScaler;
use crate::summary::{summarize_by, Demographic};

/// Normalized group means for the radar chart and the bounds used to produce them.
#[derive(Debug, Clone)]
pub struct RadarBaseline {
    pub habits: Vec<Metric>,
    pub range: (f64, f64),
    pub summaries: Vec<HabitSummary<PerformanceGroup>>,
    pub scaler: Option<MinMaxScaler>,
}

impl RadarBaseline {
    pub fn mid_level(&self) -> Option<&HabitSummary<PerformanceGroup>> {
        self.summaries.iter().find(|s| s.group == PerformanceGroup::Mid)
    }
}

pub struct Dashboard {
    pub config: Config,
    pub records: Vec<StudentRecord>,
    clustering: Result<Clustering>,
}

impl Dashboard {
    /// Clusters once up front. A clustering failure is kept and reported by
    /// the charts that need it; the other charts still work.
    pub fn new(config: Config, records: Vec<StudentRecord>) -> Self {
        let clustering = cluster_students(&records, &config.clustering);
        match &clustering {
            Ok(c) => info!(personas = ?c.persona_names(), "dashboard ready"),
            Err(e) => warn!(error = %e, "clustering unavailable"),
        }
        Self {
            config,
            records,
            clustering,
        }
    }

    pub fn clustering(&self) -> Result<&Clustering> {
        match &self.clustering {
            Ok(c) => Ok(c),
            Err(DashboardError::InsufficientRows { required, found }) => {
                Err(DashboardError::InsufficientRows {
                    required: *required,
                    found: *found,
                })
            }
            Err(other) => Err(DashboardError::Clustering(other.to_string())),
        }
    }

    pub fn profile(&self, name: &str) -> Result<&AggregationProfile> {
        self.config.profile(name)
    }

    pub fn cluster_profiles(&self) -> Result<Vec<ClusterProfile>> {
        Ok(self.clustering()?.profiles(&self.records))
    }

    pub fn radar_baseline(&self) -> Result<RadarBaseline> {
        let profile = self.profile(RADAR_PROFILE)?;
        let range = profile.normalize_range().unwrap_or((0.0, 5.0));
        let grouping = assign_groups(&self.records, &profile.grouping)?;
        let rows = grouping.rows(&self.records);

        let complete: Vec<Vec<f64>> = rows
            .iter()
            .filter_map(|(r, _)| Metric::values(&profile.habits, r))
            .collect();
        let scaler = MinMaxScaler::fit(&complete, range.0, range.1);

        Ok(RadarBaseline {
            habits: profile.habits.clone(),
            range,
            summaries: summarize_by(&rows, &profile.habits, Some(range)),
            scaler,
        })
    }

    pub fn radar_figure(&self, user: Option<&UserTrace>) -> Result<Figure> {
        let baseline = self.radar_baseline()?;
        Ok(radar::build(
            &baseline.summaries,
            &baseline.habits,
            baseline.range,
            user,
        ))
    }

    pub fn correlation_figure(&self, group: &str) -> Result<Figure> {
        heatmap::build(&self.records, self.clustering()?, group)
    }

    pub fn sankey_figure(&self, left: Demographic, habit: Metric) -> Result<Figure> {
        sankey::build(&self.records, self.profile(SANKEY_PROFILE)?, left, habit)
    }

    /// Initial state of each chart.
    pub fn figure(&self, kind: ChartKind) -> Result<Figure> {
        match kind {
            ChartKind::Bar => bar::build(&self.records, self.profile(BAR_PROFILE)?),
            ChartKind::Scatter => Ok(scatter::build(&self.records, self.clustering()?)),
            ChartKind::Heatmap => self.correlation_figure(heatmap::ALL_STUDENTS),
            ChartKind::Waffle => waffle::build(&self.records, self.profile(WAFFLE_PROFILE)?),
            ChartKind::Sankey => {
                let habit = self
                    .profile(SANKEY_PROFILE)?
                    .habits
                    .first()
                    .copied()
                    .ok_or_else(|| DashboardError::Config("sankey profile has no habits".to_string()))?;
                self.sankey_figure(Demographic::Age, habit)
            }
            ChartKind::Radar => self.radar_figure(None),
        }
    }
}
