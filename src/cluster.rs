//! Behavioural personas: standardization, k-means and a 2-D PCA projection.

use std::collections::HashSet;

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use linfa_reduction::Pca;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ClusteringConfig, PersonaNaming};
use crate::error::{DashboardError, Result};
use crate::models::{Metric, Persona, StudentRecord};

pub const CLUSTER_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct ClusterAssignment {
    /// Position of the record in the source table.
    pub index: usize,
    pub cluster: usize,
    pub persona: Persona,
    pub pc1: f64,
    pub pc2: f64,
}

#[derive(Debug, Clone)]
pub struct Clustering {
    pub features: Vec<Metric>,
    pub assignments: Vec<ClusterAssignment>,
    /// Persona for each cluster id.
    pub personas: [Persona; CLUSTER_COUNT],
    pub inertia: f64,
    pub dropped: usize,
}

/// Averages shown on a persona's hover card and profile panel.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub persona: Persona,
    pub name: &'static str,
    pub color: &'static str,
    pub description: &'static str,
    pub count: usize,
    pub pct_female: f64,
    pub averages: Vec<(Metric, f64)>,
}

impl ClusterProfile {
    pub fn average(&self, metric: Metric) -> Option<f64> {
        self.averages
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, v)| *v)
    }
}

const PROFILE_METRICS: [Metric; 8] = [
    Metric::StudyHoursPerDay,
    Metric::SocialMediaHours,
    Metric::NetflixHours,
    Metric::AttendancePercentage,
    Metric::SleepHours,
    Metric::ExerciseFrequency,
    Metric::MentalHealthRating,
    Metric::ExamScore,
];

impl Clustering {
    #[cfg(test)]
    pub fn persona_of(&self, index: usize) -> Option<Persona> {
        self.assignments
            .iter()
            .find(|a| a.index == index)
            .map(|a| a.persona)
    }

    /// Personas in cluster-id order.
    pub fn persona_names(&self) -> Vec<&'static str> {
        self.personas.iter().map(|p| p.name()).collect()
    }

    pub fn members<'a>(
        &'a self,
        records: &'a [StudentRecord],
        persona: Persona,
    ) -> impl Iterator<Item = &'a StudentRecord> + 'a {
        self.assignments
            .iter()
            .filter(move |a| a.persona == persona)
            .filter_map(move |a| records.get(a.index))
    }

    pub fn profiles(&self, records: &[StudentRecord]) -> Vec<ClusterProfile> {
        (0..CLUSTER_COUNT)
            .map(|cluster| {
                let persona = self.personas[cluster];
                let members: Vec<&StudentRecord> = self.members(records, persona).collect();
                let female = members.iter().filter(|r| r.is_female()).count();
                let pct_female = if members.is_empty() {
                    0.0
                } else {
                    100.0 * female as f64 / members.len() as f64
                };
                ClusterProfile {
                    cluster,
                    persona,
                    name: persona.name(),
                    color: persona.color(),
                    description: persona.description(),
                    count: members.len(),
                    pct_female,
                    averages: crate::summary::column_means(&members, &PROFILE_METRICS),
                }
            })
            .collect()
    }
}

/// Clusters students into the four personas.
///
/// Rows missing a feature or an auxiliary column are dropped. Fails when fewer
/// than four distinct feature rows remain.
pub fn cluster_students(records: &[StudentRecord], config: &ClusteringConfig) -> Result<Clustering> {
    config.validate()?;
    let features = &config.features;

    let mut indices = Vec::new();
    let mut raw = Vec::new();
    for (index, record) in records.iter().enumerate() {
        if !config.auxiliary.iter().all(|aux| aux.present(record)) {
            continue;
        }
        if let Some(values) = Metric::values(features, record) {
            indices.push(index);
            raw.push(values);
        }
    }

    let distinct: HashSet<Vec<u64>> = raw
        .iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect())
        .collect();
    if distinct.len() < CLUSTER_COUNT {
        return Err(DashboardError::InsufficientRows {
            required: CLUSTER_COUNT,
            found: distinct.len(),
        });
    }

    let rows = indices.len();
    let x = standardize(&Array2::from_shape_vec(
        (rows, features.len()),
        raw.into_iter().flatten().collect(),
    )?);

    let dataset = DatasetBase::from(x.clone());
    let model = KMeans::params_with_rng(CLUSTER_COUNT, StdRng::seed_from_u64(config.seed))
        .n_runs(config.restarts.max(1))
        .max_n_iterations(config.max_iterations.max(1) as u64)
        .tolerance(1e-4)
        .fit(&dataset)
        .map_err(|e| DashboardError::Clustering(e.to_string()))?;
    let labels: Array1<usize> = model.predict(&x);
    let inertia = model.inertia();

    let centroids: Vec<Vec<f64>> = model.centroids().outer_iter().map(|c| c.to_vec()).collect();
    let personas = match config.naming {
        PersonaNaming::Positional => Persona::POSITIONAL,
        PersonaNaming::Centroid => {
            name_from_centroids(features, &centroids).unwrap_or(Persona::POSITIONAL)
        }
    };

    let projection = project_2d(&x);
    let assignments = indices
        .iter()
        .zip(labels.iter())
        .zip(projection.outer_iter())
        .map(|((index, cluster), pc)| ClusterAssignment {
            index: *index,
            cluster: *cluster,
            persona: personas[*cluster],
            pc1: pc[0],
            pc2: pc[1],
        })
        .collect();

    let dropped = records.len() - rows;
    info!(rows, dropped, inertia, personas = ?personas, "clustered students");

    Ok(Clustering {
        features: features.clone(),
        assignments,
        personas,
        inertia,
        dropped,
    })
}

/// Zero mean, unit (population) variance per column. Constant columns become 0.
fn standardize(raw: &Array2<f64>) -> Array2<f64> {
    let means = raw
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(raw.ncols()));
    let scales = raw
        .std_axis(Axis(0), 0.0)
        .mapv(|sd| if sd == 0.0 { 1.0 } else { sd });
    (raw - &means) / &scales
}

/// Derives personas from what each centroid looks like.
///
/// Highest screen time is the Media Addict, then highest study time is the
/// Bookworm, then lowest overall level is the Minimalist; the remaining
/// cluster is the Balanced Learner. Returns `None` when the features lack
/// study or screen-time columns.
fn name_from_centroids(features: &[Metric], centroids: &[Vec<f64>]) -> Option<[Persona; CLUSTER_COUNT]> {
    let position = |m: Metric| features.iter().position(|f| *f == m);
    let study = position(Metric::StudyHoursPerDay)?;
    let screen: Vec<usize> = [Metric::SocialMediaHours, Metric::NetflixHours]
        .into_iter()
        .filter_map(position)
        .collect();
    if screen.is_empty() || centroids.len() != CLUSTER_COUNT {
        return None;
    }

    let screen_time = |c: &Vec<f64>| screen.iter().map(|j| c[*j]).sum::<f64>() / screen.len() as f64;
    let overall = |c: &Vec<f64>| c.iter().sum::<f64>() / c.len() as f64;

    let mut remaining: Vec<usize> = (0..CLUSTER_COUNT).collect();
    let mut personas = [Persona::BalancedLearner; CLUSTER_COUNT];

    let pick = |remaining: &mut Vec<usize>, score: &dyn Fn(&Vec<f64>) -> f64| {
        let (slot, _) = remaining
            .iter()
            .enumerate()
            .map(|(slot, c)| (slot, score(&centroids[*c])))
            .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        remaining.remove(slot)
    };

    personas[pick(&mut remaining, &screen_time)] = Persona::MediaAddict;
    personas[pick(&mut remaining, &|c: &Vec<f64>| c[study])] = Persona::Bookworm;
    personas[pick(&mut remaining, &|c: &Vec<f64>| -overall(c))] = Persona::Minimalist;
    personas[remaining[0]] = Persona::BalancedLearner;
    Some(personas)
}

/// Projects standardized rows onto their first two principal components.
///
/// Each component is oriented so its dominant loading is positive. Falls back
/// to the origin when the decomposition fails.
fn project_2d(x: &Array2<f64>) -> Array2<f64> {
    let fitted = Pca::params(2).fit(&DatasetBase::from(x.clone()));
    let mut projected: Array2<f64> = match fitted {
        Ok(pca) => pca.predict(x),
        Err(e) => {
            warn!(error = %e, "principal component projection failed");
            return Array2::zeros((x.nrows(), 2));
        }
    };

    let centred = x - &x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
    for mut component in projected.columns_mut() {
        let loadings = centred.t().dot(&component);
        let dominant = loadings
            .iter()
            .copied()
            .fold(0.0_f64, |acc, l| if l.abs() > acc.abs() { l } else { acc });
        if dominant < 0.0 {
            component.mapv_inplace(|v| -v);
        }
    }
    projected
}
