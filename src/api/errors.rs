use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::{archive::ArchiveError, moon::MoonError};

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        if let Some(e) = self.0.downcast_ref::<ArchiveError>() {
            return match e {
                ArchiveError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ArchiveError::UnknownWindow(_) => StatusCode::BAD_REQUEST,
                ArchiveError::InvalidWindowDefinition { .. }
                | ArchiveError::CalendarOutOfRange { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if self.0.downcast_ref::<MoonError>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self.0, "Request failed");
        } else {
            warn!(status = %status, error = %self.0, "Request rejected");
        }
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{archive::window::WindowKind, store::StoreError};

    #[test]
    fn data_unavailable_is_503() {
        let err = AppError::from(ArchiveError::DataUnavailable(StoreError::Database(
            sqlx::Error::PoolTimedOut,
        )));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_window_is_500() {
        let now = Utc::now();
        let err = AppError::from(ArchiveError::InvalidWindowDefinition {
            window: WindowKind::LastMonth,
            start: now,
            end: now,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unknown_window_is_400() {
        let err = AppError::from(ArchiveError::UnknownWindow("next_week".to_owned()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_instant_is_400() {
        let err = AppError::from(MoonError::InvalidInstant("NaN".to_owned()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_errors_are_500() {
        let err = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
