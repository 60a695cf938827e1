use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("{path} is missing required columns: {}", columns.join(", "))]
    MissingColumns { path: String, columns: Vec<String> },

    #[error("{0} contains no student rows")]
    EmptyTable(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("clustering needs at least {required} distinct rows, found {found}")]
    InsufficientRows { required: usize, found: usize },

    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error("matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("unknown chart: {0}")]
    UnknownChart(String),

    #[error("unknown aggregation profile: {0}")]
    UnknownProfile(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
