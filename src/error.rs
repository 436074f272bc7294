use thiserror::Error;

pub type FigureResult<T> = Result<T, FigureError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FigureError {
    #[error("location not found in dataset: {location}")]
    NotFound { location: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
