use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("invalid reservation")]
    SlotInvalid,

    #[error("این ساعت دستگاه رزرو شده است")]
    SlotTaken,

    #[error("reservation hold expired")]
    HoldExpired,

    #[error("device not available")]
    DeviceUnavailable,

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Insufficient permission")]
    InsufficientPermission,

    #[error("Invalid request parameters")]
    InvalidRequest,

    #[error("Operation timed out")]
    Timeout,

    #[error("Store error: {0}")]
    Internal(sqlx::Error),
}

impl ReservationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReservationError::SlotInvalid => StatusCode::BAD_REQUEST,
            ReservationError::SlotTaken => StatusCode::BAD_REQUEST,
            ReservationError::HoldExpired => StatusCode::BAD_REQUEST,
            ReservationError::DeviceUnavailable => StatusCode::BAD_REQUEST,
            ReservationError::ReservationNotFound => StatusCode::NOT_FOUND,
            ReservationError::DeviceNotFound => StatusCode::NOT_FOUND,
            ReservationError::InsufficientPermission => StatusCode::FORBIDDEN,
            ReservationError::InvalidRequest => StatusCode::BAD_REQUEST,
            ReservationError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ReservationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ReservationError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => ReservationError::Timeout,
            other => ReservationError::Internal(other),
        }
    }
}
