use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures of the loyalty component. All recoverable and surfaced to
/// the caller; none are fatal to the process.
#[derive(Debug, Error)]
pub enum LoyaltyError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("not enough points for this reward")]
    InsufficientBalance,
    #[error("voucher has already been used")]
    AlreadyUsed,
    #[error("voucher has expired")]
    Expired,
    #[error("profile was modified concurrently, please retry")]
    Conflict,
    #[error("database error")]
    Db(#[from] sqlx::Error),
    #[error("profile document encoding error")]
    Doc(#[from] serde_json::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LoyaltyError {
    pub fn status(&self) -> StatusCode {
        match self {
            LoyaltyError::NotFound(_) => StatusCode::NOT_FOUND,
            LoyaltyError::InsufficientBalance
            | LoyaltyError::AlreadyUsed
            | LoyaltyError::Conflict => StatusCode::CONFLICT,
            LoyaltyError::Expired => StatusCode::GONE,
            LoyaltyError::Db(_) | LoyaltyError::Doc(_) | LoyaltyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for LoyaltyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "loyalty request failed");
            (status, "Internal error".to_string()).into_response()
        } else {
            (status, self.to_string()).into_response()
        }
    }
}
