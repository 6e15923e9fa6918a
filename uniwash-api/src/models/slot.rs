use serde::{Deserialize, Serialize};
use time::Time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOption {
    /// Local wall-clock start
    #[serde(with = "super::clock_format")]
    pub start: Time,
    /// Local wall-clock end, `00:00` meaning the following midnight
    #[serde(with = "super::clock_format")]
    pub end: Time,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationOption {
    /// Weekday number, Sunday being 0
    pub weekday: u8,
    /// Bookable slots of that weekday in start order
    pub slots: Vec<SlotOption>,
}
