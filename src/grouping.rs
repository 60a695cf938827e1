//! Performance groups derived from exam-score quantiles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::models::{PerformanceGroup, StudentRecord};
use crate::stats;

/// How exam scores are bucketed into performance groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum GroupingScheme {
    /// Two increasing cut points split scores into Low, Mid and Top.
    /// A score equal to a cut point falls into the higher group.
    Tiered { cut_points: [f64; 2] },
    /// Only the tails are labelled: `score <= q(low)` is Low and
    /// `score >= q(high)` is Top. Scores in between stay unlabelled.
    Extremes { low: f64, high: f64 },
}

impl GroupingScheme {
    pub fn validate(&self) -> Result<()> {
        let (a, b) = match self {
            GroupingScheme::Tiered { cut_points } => (cut_points[0], cut_points[1]),
            GroupingScheme::Extremes { low, high } => (*low, *high),
        };
        if !(0.0 < a && a < b && b < 1.0) {
            return Err(DashboardError::Config(format!(
                "quantile cut points must satisfy 0 < {a} < {b} < 1"
            )));
        }
        Ok(())
    }

    fn quantiles(&self) -> [f64; 2] {
        match self {
            GroupingScheme::Tiered { cut_points } => *cut_points,
            GroupingScheme::Extremes { low, high } => [*low, *high],
        }
    }
}

/// Group labels aligned index-for-index with the records they were computed from.
#[derive(Debug, Clone)]
pub struct PerformanceGrouping {
    pub thresholds: [f64; 2],
    pub labels: Vec<Option<PerformanceGroup>>,
}

impl PerformanceGrouping {
    pub fn count(&self, group: PerformanceGroup) -> usize {
        self.labels.iter().filter(|l| **l == Some(group)).count()
    }

    pub fn labelled(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }

    /// Pairs each labelled record with its group.
    pub fn rows<'a>(
        &self,
        records: &'a [StudentRecord],
    ) -> Vec<(&'a StudentRecord, PerformanceGroup)> {
        records
            .iter()
            .zip(&self.labels)
            .filter_map(|(record, label)| label.map(|g| (record, g)))
            .collect()
    }
}

/// Labels every record with a performance group.
///
/// Thresholds are quantiles over all non-missing exam scores in `records`.
/// Records without a score are left unlabelled.
pub fn assign_groups(
    records: &[StudentRecord],
    scheme: &GroupingScheme,
) -> Result<PerformanceGrouping> {
    scheme.validate()?;

    let scores: Vec<f64> = records.iter().filter_map(|r| r.exam_score).collect();
    let [q1, q2] = scheme.quantiles();
    let (Some(t1), Some(t2)) = (stats::quantile(&scores, q1), stats::quantile(&scores, q2)) else {
        return Ok(PerformanceGrouping {
            thresholds: [f64::NAN, f64::NAN],
            labels: vec![None; records.len()],
        });
    };

    let labels = records
        .iter()
        .map(|r| r.exam_score.and_then(|score| classify(score, t1, t2, scheme)))
        .collect();

    let grouping = PerformanceGrouping {
        thresholds: [t1, t2],
        labels,
    };
    debug!(
        low = grouping.count(PerformanceGroup::Low),
        mid = grouping.count(PerformanceGroup::Mid),
        top = grouping.count(PerformanceGroup::Top),
        unlabelled = records.len() - grouping.labelled(),
        "assigned performance groups"
    );
    Ok(grouping)
}

fn classify(score: f64, t1: f64, t2: f64, scheme: &GroupingScheme) -> Option<PerformanceGroup> {
    match scheme {
        GroupingScheme::Tiered { .. } => Some(if score < t1 {
            PerformanceGroup::Low
        } else if score < t2 {
            PerformanceGroup::Mid
        } else {
            PerformanceGroup::Top
        }),
        GroupingScheme::Extremes { .. } => {
            if score <= t1 {
                Some(PerformanceGroup::Low)
            } else if score >= t2 {
                Some(PerformanceGroup::Top)
            } else {
                None
            }
        }
    }
}
