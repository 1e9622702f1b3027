use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImmuForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    #[error("Feature length mismatch: expected {expected}, found {found}")]
    FeatureLength { expected: usize, found: usize },

    #[error("Cannot recombine detectors of different labels ({0} vs {1})")]
    LabelMismatch(u16, u16),

    #[error("Selection Error: {0}")]
    SelectionImpossible(String),

    #[error("Thread Pool Error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type IfResult<T> = Result<T, ImmuForgeError>;
