use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Typed outcomes surfaced by the auth core. Everything the HTTP layer needs
/// to translate into a rejection is encoded in the variant; credential and
/// token failures all collapse into [`AppError::Unauthenticated`] so the
/// caller cannot tell which check failed.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Conflict(String),

    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            // The unique constraint on users.username is the authoritative
            // duplicate check; the application-level pre-check is a fast path.
            if db_err.is_unique_violation() {
                return AppError::Conflict("Username already registered".into());
            }
        }
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if let AppError::Internal(cause) = &self {
            error!(error = %cause, "internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": {
                "status": status.as_u16(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_gives_no_detail() {
        // Same message no matter which check failed upstream.
        assert_eq!(
            AppError::Unauthenticated.to_string(),
            "Could not validate credentials"
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
