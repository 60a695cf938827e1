use serde_json::{json, Value};

use crate::charts::Figure;
use crate::cluster::Clustering;
use crate::correlation::{correlation_matrix, CORRELATION_COLUMNS};
use crate::error::{DashboardError, Result};
use crate::models::{CorrelationMatrix, Persona, StudentRecord};

pub const ALL_STUDENTS: &str = "All students";

/// Selectable heatmap groups: everyone first, then personas that have members.
pub fn group_names(clustering: &Clustering) -> Vec<&'static str> {
    let mut names = vec![ALL_STUDENTS];
    for persona in clustering.personas {
        if clustering.assignments.iter().any(|a| a.persona == persona) {
            names.push(persona.name());
        }
    }
    names
}

/// Correlation matrix for one selectable group.
///
/// Only clustered rows take part, so "All students" and the persona subsets
/// share the same missing-value filtering.
pub fn matrix_for(
    records: &[StudentRecord],
    clustering: &Clustering,
    group: &str,
) -> Result<CorrelationMatrix> {
    if !group_names(clustering).contains(&group) {
        return Err(DashboardError::UnknownGroup(group.to_string()));
    }
    let persona = Persona::from_name(group);
    let rows = clustering
        .assignments
        .iter()
        .filter(|a| group == ALL_STUDENTS || Some(a.persona) == persona)
        .filter_map(|a| records.get(a.index));
    Ok(correlation_matrix(rows, &CORRELATION_COLUMNS))
}

fn trace(matrix: &CorrelationMatrix, visible: bool) -> Value {
    let labels: Vec<&str> = matrix.columns.iter().map(|c| c.column()).collect();
    json!({
        "type": "heatmap",
        "z": matrix.values,
        "x": labels,
        "y": labels,
        "zmin": -1,
        "zmax": 1,
        "colorscale": "YlOrRd",
        "visible": visible,
        "hovertemplate": "Correlation %{x} ↔ %{y}: %{z}<extra></extra>",
    })
}

/// One heatmap trace per group with a dropdown switching between them.
pub fn build(records: &[StudentRecord], clustering: &Clustering, selected: &str) -> Result<Figure> {
    let groups = group_names(clustering);
    let active = groups
        .iter()
        .position(|g| *g == selected)
        .ok_or_else(|| DashboardError::UnknownGroup(selected.to_string()))?;

    let mut data = Vec::with_capacity(groups.len());
    let mut buttons = Vec::with_capacity(groups.len());
    for (i, group) in groups.iter().enumerate() {
        let matrix = matrix_for(records, clustering, group)?;
        data.push(trace(&matrix, i == active));

        let visibility: Vec<bool> = (0..groups.len()).map(|j| j == i).collect();
        buttons.push(json!({
            "label": group,
            "method": "update",
            "args": [
                {"visible": visibility},
                {"title": format!("Correlation Matrix - {group}")},
            ],
        }));
    }

    Ok(Figure {
        data,
        layout: json!({
            "title": format!("Correlation Matrix - {selected}"),
            "updatemenus": [{"active": active, "buttons": buttons, "x": 1.1, "y": 0.5}],
            "xaxis": {"side": "bottom"},
            "yaxis": {"autorange": "reversed"},
            "font": {"color": "white"},
            "paper_bgcolor": "black",
            "plot_bgcolor": "black",
            "height": 700,
        }),
    })
}
