use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uniwash_api::models::{Command, MachineStatus, ReservationState};

use crate::errors::CommandError;
use crate::repositories::{DeviceRepository, ReservationRepository};
use crate::services::{
    Actor, COMMAND_TEMPLATE_ID, Clock, SmsError, SmsGateway, SmsRequest, command_literal,
    send_with_deadline,
};

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub reference_id: String,
    pub machine_status: MachineStatus,
    pub issued_at: OffsetDateTime,
}

/// Validates and delivers machine commands over SMS.
pub struct CommandService {
    reservation_repository: Arc<ReservationRepository>,
    device_repository: Arc<DeviceRepository>,
    gateway: Arc<dyn SmsGateway>,
    clock: Arc<dyn Clock>,
    provider: String,
    sms_timeout: Duration,
}

impl CommandService {
    pub fn new(
        reservation_repository: Arc<ReservationRepository>,
        device_repository: Arc<DeviceRepository>,
        gateway: Arc<dyn SmsGateway>,
        clock: Arc<dyn Clock>,
        provider: String,
        sms_timeout: Duration,
    ) -> Self {
        Self {
            reservation_repository,
            device_repository,
            gateway,
            clock,
            provider,
            sms_timeout,
        }
    }

    /// Sends `command` to the device of `reservation_id` within `business_id`.
    ///
    /// An ON is claimed on the reservation before sending and released again
    /// if the gateway fails. Everything else is written only once the gateway
    /// accepted the message, reservation and device in one transaction.
    pub async fn send_command(
        &self,
        actor: &Actor,
        business_id: i32,
        device_id: i32,
        reservation_id: i32,
        command: Command,
    ) -> Result<CommandOutcome, CommandError> {
        let now = self.clock.now();

        let reservation = self
            .reservation_repository
            .find_by_id(reservation_id)
            .await?
            .filter(|reservation| reservation.business_id == business_id)
            .ok_or(CommandError::ReservationNotFound)?;

        if !actor.may_access(reservation.business_id, reservation.user_id) {
            return Err(CommandError::InsufficientPermission);
        }
        if reservation.state != ReservationState::Confirmed || !reservation.is_live(now) {
            return Err(CommandError::ReservationNotFound);
        }
        if reservation.device_id != device_id {
            return Err(CommandError::DeviceMismatch);
        }

        if let Actor::EndUser { .. } = actor {
            let (open, close) = reservation.command_window();
            if now < open || now > close {
                return Err(CommandError::OutOfWindow);
            }
        }

        if command == Command::On && reservation.last_command == Some(Command::On) {
            return Err(CommandError::AlreadyOn);
        }

        let device = self
            .device_repository
            .find_by_id(device_id)
            .await?
            .ok_or(CommandError::DeviceNotFound)?;
        if !device.is_available() {
            return Err(CommandError::DeviceUnavailable);
        }

        // a concurrent ON must not reach the machine twice
        if command == Command::On {
            let mut tx = self.reservation_repository.get_pool().begin().await?;
            let claimed = self.reservation_repository.claim_turn_on(reservation.id, &mut tx).await?;
            tx.commit().await?;

            if !claimed {
                return Err(CommandError::AlreadyOn);
            }
        }

        let request = SmsRequest::new(
            &self.provider,
            COMMAND_TEMPLATE_ID,
            vec![command_literal(command).to_string()],
            &device.mobile_number,
        );
        let receipt = match send_with_deadline(self.gateway.as_ref(), request, self.sms_timeout).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(reservation_id, device_id, %command, "command sms failed: {}", e);
                if command == Command::On {
                    self.release_turn_on(reservation.id, reservation.last_command).await;
                }

                return Err(match e {
                    SmsError::Timeout => CommandError::Timeout,
                    other => CommandError::GatewayError(other.to_string()),
                });
            }
        };

        // keep command times strictly increasing per reservation
        let mut issued_at = self.clock.now();
        if let Some(previous) = reservation.last_command_time {
            if issued_at <= previous {
                issued_at = previous + time::Duration::seconds(1);
            }
        }
        let machine_status = device.machine_status.after(command);

        let mut tx = self.reservation_repository.get_pool().begin().await?;
        self.reservation_repository
            .update_command(reservation.id, command, issued_at, &receipt.reference_id, &mut tx)
            .await?;
        self.device_repository
            .update_command_state(device.id, machine_status, command, issued_at, &receipt.reference_id, &mut tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            reservation_id,
            device_id,
            %command,
            reference_id = %receipt.reference_id,
            "command dispatched"
        );

        Ok(CommandOutcome {
            reference_id: receipt.reference_id,
            machine_status,
            issued_at,
        })
    }

    async fn release_turn_on(&self, reservation_id: i32, previous: Option<Command>) {
        let released = async {
            let mut tx = self.reservation_repository.get_pool().begin().await?;
            self.reservation_repository
                .release_turn_on(reservation_id, previous, &mut tx)
                .await?;
            tx.commit().await
        }
        .await;

        if let Err(e) = released {
            tracing::error!(reservation_id, "failed to release turn-on claim: {}", e);
        }
    }
}
