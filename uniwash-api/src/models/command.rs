use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Start the machine
    #[serde(rename = "ON")]
    On,
    /// Stop the machine
    #[serde(rename = "OFF")]
    Off,
    /// Ask the machine for an extra water cycle
    MoreWater,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::On => "ON",
            Command::Off => "OFF",
            Command::MoreWater => "MoreWater",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Command::On),
            "OFF" => Ok(Command::Off),
            "MoreWater" => Ok(Command::MoreWater),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCommandRequest {
    /// Reservation the command is issued under
    pub reservation_id: Id,
    /// Device (product) the reservation belongs to
    pub product_id: Id,
    /// Command to deliver
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Operation result message
    pub message: String,
    /// Reference id returned by the SMS gateway
    pub sms_reference: String,
}
