use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("فقط در بازه زمانی رزرو خود می‌توانید دستگاه را کنترل کنید")]
    OutOfWindow,

    #[error("device already on")]
    AlreadyOn,

    #[error("device not available")]
    DeviceUnavailable,

    #[error("Insufficient permission")]
    InsufficientPermission,

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Device does not belong to the reservation")]
    DeviceMismatch,

    #[error("SMS gateway error: {0}")]
    GatewayError(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Store error: {0}")]
    Internal(sqlx::Error),
}

impl CommandError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CommandError::OutOfWindow => StatusCode::BAD_REQUEST,
            CommandError::AlreadyOn => StatusCode::BAD_REQUEST,
            CommandError::DeviceUnavailable => StatusCode::BAD_REQUEST,
            CommandError::InsufficientPermission => StatusCode::FORBIDDEN,
            CommandError::ReservationNotFound => StatusCode::NOT_FOUND,
            CommandError::DeviceNotFound => StatusCode::NOT_FOUND,
            CommandError::DeviceMismatch => StatusCode::BAD_REQUEST,
            CommandError::GatewayError(_) => StatusCode::BAD_GATEWAY,
            CommandError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CommandError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CommandError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => CommandError::Timeout,
            other => CommandError::Internal(other),
        }
    }
}
