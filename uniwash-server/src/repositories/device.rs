use std::sync::Arc;

use sqlx::{Error, Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;
use uniwash_api::models::{Command, MachineStatus};

use crate::configs::Storage;
use crate::models::Device;

pub struct DeviceRepository {
    storage: Arc<Storage>,
}

impl DeviceRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &SqlitePool {
        self.storage.get_pool()
    }
}

impl DeviceRepository {
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Device>, Error> {
        let device: Option<Device> = sqlx::query_as("SELECT * FROM devices WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(device)
    }

    pub async fn find_by_business_id(&self, business_id: i32) -> Result<Vec<Device>, Error> {
        let devices: Vec<Device> = sqlx::query_as(
            "SELECT * FROM devices WHERE business_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(business_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(devices)
    }

    /// Records a dispatched command on the device row.
    pub async fn update_command_state(
        &self,
        id: i32,
        status: MachineStatus,
        command: Command,
        time: OffsetDateTime,
        sms_ref: &str,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE devices
            SET machine_status = $1, last_command = $2, last_command_time = $3, last_command_sms_ref = $4
            WHERE id = $5
            "#,
        )
        .bind(status.as_str())
        .bind(command.as_str())
        .bind(time)
        .bind(sms_ref)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn update_availability(
        &self,
        id: i32,
        status: MachineStatus,
        status_before_offline: Option<MachineStatus>,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE devices
            SET machine_status = $1, status_before_offline = $2
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(status_before_offline.map(|status| status.as_str()))
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn soft_delete(
        &self,
        id: i32,
        deleted_at: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE devices SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL")
            .bind(deleted_at)
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }
}
