use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpwError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("no convergence: {0}")]
    NoConvergence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("plot error: {0}")]
    Plot(String),
}

impl GpwError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        GpwError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GpwError>;
