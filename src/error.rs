use thiserror::Error;

/// Errors raised by the analytics core and the loaders. None of these is
/// fatal to the process: a failed view degrades to a warning and the other
/// views keep rendering. An empty selection is a valid result, not an error.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("expected column '{column}' is missing from the extract")]
    MissingColumn { column: String },

    #[error("non-numeric value '{value}' in column '{column}'")]
    InvalidInputKind { column: String, value: String },

    #[error("unparseable sample date '{value}'")]
    UnparseableDate { value: String },
}
