use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Insufficient permission")]
    InsufficientPermission,

    #[error("Operation timed out")]
    Timeout,

    #[error("Store error: {0}")]
    Internal(sqlx::Error),
}

impl DeviceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeviceError::DeviceNotFound => StatusCode::NOT_FOUND,
            DeviceError::InsufficientPermission => StatusCode::FORBIDDEN,
            DeviceError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            DeviceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for DeviceError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => DeviceError::Timeout,
            other => DeviceError::Internal(other),
        }
    }
}
