//! Chart builders. Each returns a Plotly-compatible figure (`data` + `layout`).

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::DashboardError;

pub mod bar;
pub mod heatmap;
pub mod radar;
pub mod sankey;
pub mod scatter;
pub mod waffle;

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}

impl Figure {
    #[cfg(test)]
    pub fn title(&self) -> Option<&str> {
        self.layout
            .get("title")
            .and_then(|t| t.get("text").or(Some(t)))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Scatter,
    Heatmap,
    Waffle,
    Sankey,
    Radar,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Bar,
        ChartKind::Scatter,
        ChartKind::Heatmap,
        ChartKind::Waffle,
        ChartKind::Sankey,
        ChartKind::Radar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Waffle => "waffle",
            ChartKind::Sankey => "sankey",
            ChartKind::Radar => "radar",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DashboardError::UnknownChart(s.to_string()))
    }
}
