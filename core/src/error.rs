use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Empty input: at least one order line is required")]
    EmptyInput,

    #[error("Missing required column '{column}'")]
    MissingField { column: String },

    #[error("Malformed input at row {row}: {column} = '{value}'")]
    MalformedInput {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
