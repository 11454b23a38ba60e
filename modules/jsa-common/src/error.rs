use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Nothing to merge: no cached files for this run")]
    NothingToMerge,

    #[error("Row {row} has unparseable briefing_date '{value}'")]
    BadDate { row: usize, value: String },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
