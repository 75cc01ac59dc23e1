use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use sqlx::error::ErrorKind;

/// Errors surfaced by the HTTP handlers. Every variant renders as
/// `{"message": ...}` with the matching status code.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "Internal error: {}", _0)]
    Internal(anyhow::Error),
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::ForeignKeyViolation => {
                    return AppError::bad_request("Referenced record does not exist");
                }
                ErrorKind::NotNullViolation => {
                    return AppError::bad_request(format!(
                        "Missing required value: {}",
                        db_err.message()
                    ));
                }
                ErrorKind::CheckViolation => {
                    return AppError::bad_request(format!("Invalid value: {}", db_err.message()));
                }
                _ => {}
            }
        }
        AppError::Internal(err.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

/// Unique or primary key collision. SQLSTATE 23000 alone also covers
/// foreign key and NOT NULL failures, so the driver's error kind decides.
pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use sqlx::error::DatabaseError;
    use std::borrow::Cow;
    use std::fmt;

    /// Integrity error shaped like the MySQL driver's: every variant shares
    /// SQLSTATE 23000 and only the server errno tells them apart.
    #[derive(Debug)]
    struct IntegrityError {
        errno: u16,
    }

    impl fmt::Display for IntegrityError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} (23000): {}", self.errno, self.message())
        }
    }

    impl std::error::Error for IntegrityError {}

    impl DatabaseError for IntegrityError {
        fn message(&self) -> &str {
            match self.errno {
                1062 => "Duplicate entry 'alice' for key 'uq_users_username'",
                1452 => "Cannot add or update a child row: a foreign key constraint fails",
                1048 => "Column 'first_name' cannot be null",
                _ => "Integrity constraint violation",
            }
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23000"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.errno {
                1062 => ErrorKind::UniqueViolation,
                1452 => ErrorKind::ForeignKeyViolation,
                1048 => ErrorKind::NotNullViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn integrity(errno: u16) -> sqlx::Error {
        sqlx::Error::Database(Box::new(IntegrityError { errno }))
    }

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[actix_web::test]
    async fn client_errors_keep_their_message() {
        let (status, json) = body_json(AppError::bad_request("Out Time already set")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Out Time already set");

        let (status, json) = body_json(AppError::not_found("Employee profile not found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Employee profile not found");

        let (status, _) = body_json(AppError::forbidden("Admin only")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = body_json(AppError::Conflict("taken".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn internal_errors_hide_details() {
        let (status, json) = body_json(AppError::Internal(anyhow::anyhow!("db exploded"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal Server Error");
    }

    #[test]
    fn sqlx_errors_become_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(!is_duplicate_key(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn only_unique_violations_count_as_duplicates() {
        assert!(is_duplicate_key(&integrity(1062)));
        assert!(!is_duplicate_key(&integrity(1452)));
        assert!(!is_duplicate_key(&integrity(1048)));

        assert!(is_foreign_key_violation(&integrity(1452)));
        assert!(!is_foreign_key_violation(&integrity(1062)));
    }

    #[actix_web::test]
    async fn integrity_errors_become_bad_requests() {
        let (status, json) = body_json(integrity(1452).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Referenced record does not exist");

        let (status, json) = body_json(integrity(1048).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["message"],
            "Missing required value: Column 'first_name' cannot be null"
        );

        let err: AppError = integrity(1062).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
