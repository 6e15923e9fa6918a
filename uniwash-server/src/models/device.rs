use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use time::OffsetDateTime;
use uniwash_api::models::{Command, DeviceStatusResponse, MachineStatus};

use super::{Table, decode_optional_text, decode_text};

/// A washing machine reachable over an SMS control channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i32,
    pub business_id: i32,
    pub post_id: i32,
    pub sku: String,
    pub mobile_number: String,
    pub machine_status: MachineStatus,
    /// Status to restore once an operator brings the device back online.
    pub status_before_offline: Option<MachineStatus>,
    pub last_command: Option<Command>,
    pub last_command_time: Option<OffsetDateTime>,
    pub last_command_sms_ref: Option<String>,
    pub deleted_at: Option<OffsetDateTime>,
}

impl Device {
    pub fn is_available(&self) -> bool {
        self.deleted_at.is_none() && self.machine_status != MachineStatus::Offline
    }

    pub fn into_response(self) -> DeviceStatusResponse {
        DeviceStatusResponse {
            id: self.id,
            business_id: self.business_id,
            post_id: self.post_id,
            sku: self.sku,
            mobile_number: self.mobile_number,
            machine_status: self.machine_status,
            last_command: self.last_command,
            last_command_time: self.last_command_time,
            last_command_sms_ref: self.last_command_sms_ref,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Device {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            business_id: row.try_get("business_id")?,
            post_id: row.try_get("post_id")?,
            sku: row.try_get("sku")?,
            mobile_number: row.try_get("mobile_number")?,
            machine_status: decode_text(row, "machine_status")?,
            status_before_offline: decode_optional_text(row, "status_before_offline")?,
            last_command: decode_optional_text(row, "last_command")?,
            last_command_time: row.try_get("last_command_time")?,
            last_command_sms_ref: row.try_get("last_command_sms_ref")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

#[derive(Clone)]
pub struct DeviceTable;

impl Table for DeviceTable {
    fn name(&self) -> &'static str {
        "devices"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                business_id INTEGER NOT NULL,
                post_id INTEGER NOT NULL,
                sku VARCHAR(255) NOT NULL,
                mobile_number TEXT NOT NULL,
                machine_status TEXT NOT NULL DEFAULT 'OFF',
                status_before_offline TEXT,
                last_command TEXT,
                last_command_time TIMESTAMP,
                last_command_sms_ref TEXT,
                deleted_at TIMESTAMP,
                FOREIGN KEY (business_id) REFERENCES businesses (id) ON DELETE CASCADE,
                FOREIGN KEY (post_id) REFERENCES posts (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS devices;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["businesses", "posts"]
    }
}
