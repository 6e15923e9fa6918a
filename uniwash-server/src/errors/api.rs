use super::{AuthError, CommandError, DeviceError, ReservationError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    #[error("Reservation error: {0}")]
    ReservationError(#[from] ReservationError),

    #[error("Command error: {0}")]
    CommandError(#[from] CommandError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
