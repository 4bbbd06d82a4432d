use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Payment of {payment:.2} does not cover the {interest:.2} of interest accruing each month")]
    PaymentTooLowForInterest { payment: f64, interest: f64 },

    #[error("Config directory not found at {0}. Run 'loanbook init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize loan state: {0}")]
    StateSerialize(#[from] toml::ser::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Loan '{0}' not found")]
    LoanNotFound(String),

    #[error("Invalid loan index '{0}'. Use 'loanbook list' to see available loans.")]
    InvalidLoanIndex(String),

    #[error("Loan ids are exhausted (last id {0}). Check the counter in loans.toml.")]
    LoanIdsExhausted(u32),

    #[error("Nothing to update. Pass at least one of --name, --principal, --rate, --term or --notes.")]
    NothingToUpdate,
}

impl LoanError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LoanError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
