use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};

use super::{Command, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    /// Held for a short while until payment settles
    Tentative,
    /// Paid for and binding
    Confirmed,
    /// Released by the user or the business
    Canceled,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationState::Tentative => "tentative",
            ReservationState::Confirmed => "confirmed",
            ReservationState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tentative" => Ok(ReservationState::Tentative),
            "confirmed" => Ok(ReservationState::Confirmed),
            "canceled" => Ok(ReservationState::Canceled),
            other => Err(format!("unknown reservation state: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHoldRequest {
    /// Device (product) to reserve
    pub product_id: Id,
    /// Local calendar date of the reservation
    #[serde(with = "super::date_format")]
    pub date: Date,
    /// Local wall-clock start of the slot
    #[serde(with = "super::clock_format")]
    pub start: Time,
    /// Local wall-clock end of the slot
    #[serde(with = "super::clock_format")]
    pub end: Time,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationUser {
    /// User first name
    pub first_name: String,
    /// User last name
    pub last_name: String,
    /// User mobile number
    pub mobile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    /// Reservation identifier
    pub id: Id,
    /// Reserved device identifier
    pub device_id: Id,
    /// Reserving user identifier
    pub user_id: Id,
    /// Business owning the device
    pub business_id: Id,
    /// Lifecycle state
    pub state: ReservationState,
    /// Absolute start of the slot
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// Absolute end of the slot
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    /// Expiry of a tentative hold
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    /// Last command delivered under this reservation
    pub last_command: Option<Command>,
    /// Time the last command was delivered
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_command_time: Option<OffsetDateTime>,
    /// Gateway reference of the last command
    pub last_command_sms_ref: Option<String>,
    /// Whether the turn-on reminder went out
    pub on_reminder_sent: bool,
    /// Whether the turn-off reminder went out
    pub off_reminder_sent: bool,
    /// Reserving user details, when joined
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<ReservationUser>,
    /// Device label, when joined
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub device_sku: Option<String>,
    /// Number of reservations held by the same user, when requested
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage_count: Option<i64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::{date, time};

    use super::*;

    #[test]
    fn test_create_hold_request_uses_local_formats() {
        let request: CreateHoldRequest = serde_json::from_value(json!({
            "product_id": 4,
            "date": "2025-03-15",
            "start": "08:30",
            "end": "10:00"
        }))
        .unwrap();

        assert_eq!(request.date, date!(2025 - 03 - 15));
        assert_eq!(request.start, time!(08:30));
        assert_eq!(request.end, time!(10:00));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["start"], json!("08:30"));
    }

    #[test]
    fn test_state_round_trips_through_str() {
        assert_eq!("confirmed".parse::<ReservationState>().unwrap(), ReservationState::Confirmed);
        assert!("reserved".parse::<ReservationState>().is_err());
    }
}
