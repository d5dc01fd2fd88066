use quota_core::{Denial, ResourceKind};
use thiserror::Error;

use crate::engines::ExternalError;

/// What the user sees when a turn fails for a reason other than a quota.
pub const APOLOGY: &str = "Something went wrong, please try again";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("db error: {0}")]
    Db(#[from] quota_db::DbError),
    #[error("external service error: {0}")]
    External(#[from] ExternalError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{message}")]
    QuotaExceeded {
        resource: ResourceKind,
        remaining: u64,
        message: String,
    },
    #[error("{0}")]
    AdmissionDenied(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::QuotaExceeded {
                resource,
                remaining,
                message,
            } => AppError::QuotaExceeded {
                resource,
                remaining,
                message,
            },
            Denial::AdmissionDenied { message } => AppError::AdmissionDenied(message),
        }
    }
}

impl AppError {
    /// True when the ledger could not be read or written. Enforcement treats
    /// this as a denial.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, AppError::Db(_))
    }

    /// Quota and admission refusals, plus input the turn cannot use.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            AppError::QuotaExceeded { .. }
                | AppError::AdmissionDenied(_)
                | AppError::InvalidInput(_)
        )
    }

    /// Text safe to show the requester. Internal causes are replaced by
    /// [`APOLOGY`].
    pub fn user_message(&self) -> String {
        match self {
            AppError::QuotaExceeded { message, .. } => message.clone(),
            AppError::AdmissionDenied(message) | AppError::InvalidInput(message) => {
                message.clone()
            }
            AppError::Db(_) | AppError::External(_) | AppError::Io(_) | AppError::Message(_) => {
                APOLOGY.to_string()
            }
        }
    }
}
