use std::path::PathBuf;

use thiserror::Error;

/// Failures that terminate a command. Per-document and per-record problems
/// never surface here; they are counted in the run summary instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    #[error("no .html or .csv files in {0}")]
    NoInputFiles(PathBuf),

    #[error("{file}: required column '{column}' is missing")]
    MissingColumn { file: PathBuf, column: String },

    #[error("unknown source '{0}' (expected one of: levelsfyi, glassdoor, glassdoor-companies)")]
    UnknownSource(String),

    #[error("no salary records survived extraction")]
    NoRecords,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_names_file_and_column() {
        let err = PipelineError::MissingColumn {
            file: PathBuf::from("seed.csv"),
            column: "location|company".into(),
        };
        assert_eq!(
            err.to_string(),
            "seed.csv: required column 'location|company' is missing"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PipelineError = io.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
