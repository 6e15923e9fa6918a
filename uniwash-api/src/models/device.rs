use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Command, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineStatus {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
    Offline,
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::On => "ON",
            MachineStatus::Off => "OFF",
            MachineStatus::Offline => "Offline",
        }
    }

    /// Status a successfully dispatched command leaves the machine in.
    pub fn after(self, command: Command) -> MachineStatus {
        match command {
            Command::On => MachineStatus::On,
            Command::Off => MachineStatus::Off,
            Command::MoreWater => self,
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(MachineStatus::On),
            "OFF" => Ok(MachineStatus::Off),
            "Offline" => Ok(MachineStatus::Offline),
            other => Err(format!("unknown machine status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatusResponse {
    /// Device identifier
    pub id: Id,
    /// Owning business identifier
    pub business_id: Id,
    /// Post the device is listed under
    pub post_id: Id,
    /// Stock keeping label
    pub sku: String,
    /// Mobile number of the device SIM
    pub mobile_number: String,
    /// Current machine status
    pub machine_status: MachineStatus,
    /// Last command delivered to the machine
    pub last_command: Option<Command>,
    /// Time the last command was delivered
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_command_time: Option<OffsetDateTime>,
    /// Gateway reference of the last command
    pub last_command_sms_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAvailabilityRequest {
    /// Whether the device should be taken out of service
    pub offline: bool,
}
