//! HTTP surface: the page, the six initial figures and the three recompute events.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::charts::heatmap::ALL_STUDENTS;
use crate::charts::{ChartKind, Figure};
use crate::cluster::ClusterProfile;
use crate::dashboard::Dashboard;
use crate::error::DashboardError;
use crate::interaction::{self, RadarRequest};

const INDEX_HTML: &str = include_str!("../static/index.html");

type AppState = Arc<Dashboard>;
type ApiResult<T> = Result<Json<T>, DashboardError>;

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::UnknownGroup(_)
            | DashboardError::UnknownChart(_)
            | DashboardError::UnknownProfile(_)
            | DashboardError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DashboardError::InsufficientRows { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

pub fn router(dashboard: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/figures/:chart", get(figure))
        .route("/api/radar", post(radar))
        .route("/api/correlation", get(correlation))
        .route("/api/sankey", get(sankey))
        .route("/api/profiles", get(profiles))
        .with_state(dashboard)
}

pub async fn serve(dashboard: Dashboard) -> anyhow::Result<()> {
    let address = format!("{}:{}", dashboard.config.server.host, dashboard.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, students = dashboard.records.len(), "serving dashboard");

    axum::serve(listener, router(Arc::new(dashboard)))
        .await
        .context("server stopped unexpectedly")?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn figure(State(dashboard): State<AppState>, Path(chart): Path<String>) -> ApiResult<Figure> {
    debug!(%chart, "figure requested");
    let kind: ChartKind = chart.parse()?;
    Ok(Json(dashboard.figure(kind)?))
}

async fn radar(
    State(dashboard): State<AppState>,
    Json(request): Json<RadarRequest>,
) -> ApiResult<Figure> {
    Ok(Json(interaction::recompute_radar(&dashboard, &request)?))
}

#[derive(Debug, Deserialize)]
struct CorrelationQuery {
    group: Option<String>,
}

async fn correlation(
    State(dashboard): State<AppState>,
    Query(query): Query<CorrelationQuery>,
) -> ApiResult<Figure> {
    let group = query.group.as_deref().unwrap_or(ALL_STUDENTS);
    Ok(Json(interaction::recompute_correlation(&dashboard, group)?))
}

#[derive(Debug, Deserialize)]
struct SankeyQuery {
    left: Option<String>,
    habit: Option<String>,
}

async fn sankey(
    State(dashboard): State<AppState>,
    Query(query): Query<SankeyQuery>,
) -> ApiResult<Figure> {
    let left = query.left.as_deref().unwrap_or("age");
    let habit = query.habit.as_deref().unwrap_or("study_hours_per_day");
    Ok(Json(interaction::recompute_sankey(&dashboard, left, habit)?))
}

async fn profiles(State(dashboard): State<AppState>) -> ApiResult<Vec<ClusterProfile>> {
    Ok(Json(dashboard.cluster_profiles()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::tests::sample_dashboard;

    fn state() -> AppState {
        Arc::new(sample_dashboard())
    }

    #[tokio::test]
    async fn serves_every_chart() {
        let state = state();
        for kind in ChartKind::ALL {
            let Json(figure) = figure(State(state.clone()), Path(kind.name().to_string()))
                .await
                .unwrap();
            assert!(!figure.data.is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_chart_is_a_bad_request() {
        let err = figure(State(state()), Path("pie".to_string())).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn insufficient_rows_is_unprocessable() {
        let err = DashboardError::InsufficientRows { required: 4, found: 1 };
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn clustering_config_fault_is_a_server_error() {
        let mut config = crate::config::Config::default();
        config.clustering.features.truncate(2);
        let dashboard = Dashboard::new(config, sample_dashboard().records);
        assert!(matches!(
            dashboard.clustering(),
            Err(DashboardError::Clustering(_))
        ));

        let err = profiles(State(Arc::new(dashboard))).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn query_defaults_apply() {
        let state = state();
        let Json(heatmap) = correlation(State(state.clone()), Query(CorrelationQuery { group: None }))
            .await
            .unwrap();
        assert_eq!(heatmap.title(), Some("Correlation Matrix - All students"));

        let Json(flow) = sankey(
            State(state.clone()),
            Query(SankeyQuery { left: Some("gender".to_string()), habit: None }),
        )
        .await
        .unwrap();
        assert!(flow.title().unwrap().starts_with("Sankey: Gender"));
    }

    #[tokio::test]
    async fn radar_event_adds_user_trace() {
        let request = RadarRequest {
            values: vec![4.0, 2.0, 1.0, 8.0, 3.0, 4.0, 7.0],
            clicks: 2,
        };
        let Json(figure) = radar(State(state()), Json(request)).await.unwrap();
        assert_eq!(figure.data.last().unwrap()["name"], "You");
    }

    #[tokio::test]
    async fn profiles_list_four_personas() {
        let Json(profiles) = profiles(State(state())).await.unwrap();
        assert_eq!(profiles.len(), 4);

        let panel = serde_json::to_value(&profiles[0]).unwrap();
        assert!(!panel["description"].as_str().unwrap().is_empty());
        assert!(panel["color"].as_str().unwrap().starts_with('#'));
        assert_eq!(panel["averages"][0][0], "study_hours_per_day");
        assert_eq!(panel["averages"][7][0], "exam_score");
    }

    #[tokio::test]
    async fn page_shows_profile_on_scatter_click() {
        let Html(page) = index().await;
        assert!(page.contains("id=\"profile-panel\""));
        assert!(page.contains("plotly_click"));
        assert!(page.contains("/api/profiles"));
    }
}
