use thiserror::Error;

#[derive(Debug, Error)]
pub enum CovidError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("line {line}: expected {expected} fields, found {found}")]
    RowLength {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid date {value:?}")]
    InvalidDate { line: u64, value: String },
    #[error("line {line}: invalid count {value:?} in column {column}")]
    InvalidCount {
        line: u64,
        column: String,
        value: String,
    },
    #[error("expected {expected} source files, found {found}")]
    SourceFiles { expected: usize, found: usize },
    #[error("unknown metric {0:?}, expected an index 0-6 or a metric name")]
    UnknownMetric(String),
    #[error("no country passed the threshold, nothing to plot for {0}")]
    NothingToPlot(String),
    #[error("rendering failed: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, CovidError>;

/// line number of a csv record, 0 when unknown
pub(crate) fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}
