use std::sync::Arc;

use uniwash_api::models::MachineStatus;

use crate::errors::DeviceError;
use crate::models::Device;
use crate::repositories::DeviceRepository;
use crate::services::{Actor, Clock};

/// Operator-facing device actions. Command driven transitions live in
/// [`crate::services::CommandService`].
pub struct DeviceService {
    device_repository: Arc<DeviceRepository>,
    clock: Arc<dyn Clock>,
}

impl DeviceService {
    pub fn new(device_repository: Arc<DeviceRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            device_repository,
            clock,
        }
    }

    pub async fn list_for_business(&self, actor: &Actor, business_id: i32) -> Result<Vec<Device>, DeviceError> {
        ensure_manager(actor, business_id)?;

        Ok(self.device_repository.find_by_business_id(business_id).await?)
    }

    /// Takes the device out of service, remembering its status for later.
    pub async fn set_offline(&self, actor: &Actor, business_id: i32, device_id: i32) -> Result<Device, DeviceError> {
        let device = self.managed(actor, business_id, device_id).await?;
        if device.machine_status == MachineStatus::Offline {
            return Ok(device);
        }

        let mut tx = self.device_repository.get_pool().begin().await?;
        self.device_repository
            .update_availability(device.id, MachineStatus::Offline, Some(device.machine_status), &mut tx)
            .await?;
        tx.commit().await?;

        tracing::info!(device_id, previous = %device.machine_status, "device marked offline");

        self.managed(actor, business_id, device_id).await
    }

    /// Restores the status held before going offline, `OFF` if none was kept.
    pub async fn clear_offline(&self, actor: &Actor, business_id: i32, device_id: i32) -> Result<Device, DeviceError> {
        let device = self.managed(actor, business_id, device_id).await?;
        if device.machine_status != MachineStatus::Offline {
            return Ok(device);
        }

        let restored = device
            .status_before_offline
            .filter(|status| *status != MachineStatus::Offline)
            .unwrap_or(MachineStatus::Off);

        let mut tx = self.device_repository.get_pool().begin().await?;
        self.device_repository
            .update_availability(device.id, restored, None, &mut tx)
            .await?;
        tx.commit().await?;

        tracing::info!(device_id, restored = %restored, "device back online");

        self.managed(actor, business_id, device_id).await
    }

    pub async fn remove(&self, actor: &Actor, business_id: i32, device_id: i32) -> Result<(), DeviceError> {
        let device = self.managed(actor, business_id, device_id).await?;

        let mut tx = self.device_repository.get_pool().begin().await?;
        self.device_repository
            .soft_delete(device.id, self.clock.now(), &mut tx)
            .await?;
        tx.commit().await?;

        tracing::info!(device_id, "device removed");

        Ok(())
    }

    async fn managed(&self, actor: &Actor, business_id: i32, device_id: i32) -> Result<Device, DeviceError> {
        ensure_manager(actor, business_id)?;

        self.device_repository
            .find_by_id(device_id)
            .await?
            .filter(|device| device.business_id == business_id && device.deleted_at.is_none())
            .ok_or(DeviceError::DeviceNotFound)
    }
}

fn ensure_manager(actor: &Actor, business_id: i32) -> Result<(), DeviceError> {
    match actor {
        Actor::BusinessAgent {
            business_id: agent_business,
            ..
        } if *agent_business == business_id && actor.can_manage_devices() => Ok(()),
        _ => Err(DeviceError::InsufficientPermission),
    }
}
