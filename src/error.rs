//! Error types for the academy server

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};

use crate::entity::PaymentStatus;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("You are already enrolled in this course")]
  AlreadyEnrolled,

  #[error("Enrollment is not available for this course")]
  EnrollmentClosed,

  #[error("You are not enrolled in this course")]
  NotEnrolled,

  #[error("You do not have permission to perform this action")]
  Forbidden,

  #[error("Authentication credentials were not provided or are invalid")]
  Unauthorized,

  #[error("{0}")]
  Validation(String),

  #[error("Payment status cannot change from `{}`", .from.as_str())]
  InvalidTransition { from: PaymentStatus },

  #[error("Database error: {0}")]
  Database(DbErr),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl From<DbErr> for Error {
  fn from(err: DbErr) -> Self {
    // raised by `before_save` hooks
    match err {
      DbErr::Custom(msg) => Self::Validation(msg),
      err => Self::Database(err),
    }
  }
}

impl Error {
  pub fn code(&self) -> &'static str {
    match self {
      Error::NotFound(_) => "not_found",
      Error::AlreadyEnrolled => "already_enrolled",
      Error::EnrollmentClosed => "enrollment_closed",
      Error::NotEnrolled => "not_enrolled",
      Error::Forbidden => "forbidden",
      Error::Unauthorized => "unauthorized",
      Error::Validation(_) => "validation_error",
      Error::InvalidTransition { .. } => "invalid_transition",
      Error::Database(_) | Error::Io(_) | Error::Internal(_) => "server_error",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::AlreadyEnrolled | Error::Validation(_) => StatusCode::BAD_REQUEST,
      Error::EnrollmentClosed | Error::NotEnrolled | Error::Forbidden => {
        StatusCode::FORBIDDEN
      }
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::InvalidTransition { .. } => StatusCode::CONFLICT,
      Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  /// Maps a unique index violation to `err`, passing everything else through.
  pub fn on_unique(db: DbErr, err: Error) -> Error {
    match db.sql_err() {
      Some(SqlErr::UniqueConstraintViolation(_)) => err,
      _ => db.into(),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
        tracing::error!("Request failed: {self}");
        "Internal server error".to_string()
      }
      other => other.to_string(),
    };

    let body = json::json!({
      "success": false,
      "code": self.code(),
      "error": message,
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use axum::body::to_bytes;

  use super::*;

  #[tokio::test]
  async fn test_internal_error_hides_details() {
    let err = Error::Internal("secret connection string".into());
    let res = err.into_response();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: json::Value = json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "server_error");
    assert_eq!(body["error"], "Internal server error");
  }

  #[test]
  fn test_custom_db_error_is_validation() {
    let err: Error = DbErr::Custom("Price cannot be negative".into()).into();
    assert!(matches!(err, Error::Validation(ref msg) if msg.contains("Price")));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
  }
}
