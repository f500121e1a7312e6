use crate::{
    db::dao::DaoLayerError,
    services::{DirectoryError, GateError},
};

/// Transport-level error. Every variant renders as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::NotFound(message)
            | Self::Internal(message) => message.as_str(),
        }
    }
}

impl From<DaoLayerError> for AppError {
    fn from(err: DaoLayerError) -> Self {
        tracing::error!(error = %err, "storage failure");
        AppError::internal("Internal server error")
    }
}

// Gate refusals all collapse into one client-error class.
impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Storage(err) => err.into(),
            GateError::Unauthorized(message)
            | GateError::Forbidden(message)
            | GateError::NotFound(message)
            | GateError::InvalidArgument(message) => AppError::BadRequest(message),
        }
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Storage(err) => err.into(),
            DirectoryError::InvalidIdentity(message) => AppError::BadRequest(message),
            DirectoryError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;

    use super::AppError;
    use crate::{
        db::dao::DaoLayerError,
        services::{DirectoryError, GateError},
    };

    #[test]
    fn gate_refusals_map_to_bad_request_with_message() {
        let cases = [
            GateError::Unauthorized("not allowed".to_string()),
            GateError::Forbidden("untouchable".to_string()),
            GateError::NotFound("missing".to_string()),
            GateError::InvalidArgument("bad role".to_string()),
        ];

        for case in cases {
            let expected = case.to_string();
            let err = AppError::from(case);
            assert!(matches!(err, AppError::BadRequest(_)));
            assert_eq!(err.message(), expected);
        }
    }

    #[test]
    fn storage_failures_hide_database_details() {
        let err = AppError::from(GateError::Storage(DaoLayerError::Db(DbErr::Custom(
            "connection refused".to_string(),
        ))));

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn directory_not_found_keeps_its_status_class() {
        let err = AppError::from(DirectoryError::NotFound("Profile not found".to_string()));
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.message(), "Profile not found");
    }
}
