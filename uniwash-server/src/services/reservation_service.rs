use std::sync::Arc;

use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};
use uniwash_api::models::ReservationState;

use crate::errors::ReservationError;
use crate::models::Reservation;
use crate::repositories::{
    DeviceRepository, NewReservation, ReservationFilter, ReservationListRow, ReservationRepository,
};
use crate::services::{Actor, Clock, Slot, SlotCatalog};

/// How long a tentative hold keeps its slot before payment must confirm it.
pub const HOLD_TTL: Duration = Duration::minutes(10);

#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub device_id: i32,
    pub business_id: i32,
    pub user_id: i32,
    /// Local calendar date of the slot.
    pub date: Date,
    pub start: Time,
    pub end: Time,
}

pub struct ReservationService {
    reservation_repository: Arc<ReservationRepository>,
    device_repository: Arc<DeviceRepository>,
    catalog: SlotCatalog,
    clock: Arc<dyn Clock>,
    offset: UtcOffset,
}

impl ReservationService {
    pub fn new(
        reservation_repository: Arc<ReservationRepository>,
        device_repository: Arc<DeviceRepository>,
        catalog: SlotCatalog,
        clock: Arc<dyn Clock>,
        offset: UtcOffset,
    ) -> Self {
        Self {
            reservation_repository,
            device_repository,
            catalog,
            clock,
            offset,
        }
    }

    pub fn catalog(&self) -> &SlotCatalog {
        &self.catalog
    }

    /// UTC bounds of the local calendar day `date`.
    pub fn day_range(&self, date: Date) -> Option<(OffsetDateTime, OffsetDateTime)> {
        Slot::new(Time::MIDNIGHT, Time::MIDNIGHT).resolve(date, self.offset)
    }

    /// Claims a slot with a tentative hold that lapses after [`HOLD_TTL`].
    pub async fn create_hold(&self, request: &HoldRequest) -> Result<Reservation, ReservationError> {
        let (start_at, end_at) = self
            .catalog
            .resolve(request.date, request.start, request.end, self.offset)
            .ok_or(ReservationError::SlotInvalid)?;

        let now = self.clock.now();
        if end_at <= now {
            return Err(ReservationError::SlotInvalid);
        }

        let device = self
            .device_repository
            .find_by_id(request.device_id)
            .await?
            .filter(|device| device.business_id == request.business_id)
            .ok_or(ReservationError::DeviceNotFound)?;

        if !device.is_available() {
            return Err(ReservationError::DeviceUnavailable);
        }

        let item = NewReservation {
            device_id: device.id,
            user_id: request.user_id,
            business_id: request.business_id,
            start_at,
            end_at,
            expires_at: now + HOLD_TTL,
        };

        let mut tx = self.reservation_repository.get_pool().begin().await?;
        let id = self
            .reservation_repository
            .create_hold(&item, now, &mut tx)
            .await?;
        let Some(id) = id else {
            tracing::debug!(device_id = device.id, start = %start_at, "slot already held");
            return Err(ReservationError::SlotTaken);
        };
        tx.commit().await?;

        tracing::info!(reservation_id = id, device_id = device.id, user_id = request.user_id, "hold created");

        self.load(id).await
    }

    /// Promotes a live hold. Confirming an already confirmed reservation is a
    /// no-op; a lapsed or canceled one fails with `HoldExpired`.
    pub async fn confirm_hold(&self, actor: &Actor, business_id: i32, id: i32) -> Result<Reservation, ReservationError> {
        let reservation = self.authorized(actor, business_id, id).await?;

        match reservation.state {
            ReservationState::Confirmed => return Ok(reservation),
            ReservationState::Canceled => return Err(ReservationError::HoldExpired),
            ReservationState::Tentative => {}
        }

        let now = self.clock.now();
        let mut tx = self.reservation_repository.get_pool().begin().await?;
        let confirmed = self.reservation_repository.confirm(id, now, &mut tx).await?;
        tx.commit().await?;

        if !confirmed {
            // a concurrent confirm may have won the race
            let current = self.load(id).await?;
            if current.state == ReservationState::Confirmed {
                return Ok(current);
            }
            return Err(ReservationError::HoldExpired);
        }

        tracing::info!(reservation_id = id, "hold confirmed");

        self.load(id).await
    }

    pub async fn cancel(&self, actor: &Actor, business_id: i32, id: i32) -> Result<Reservation, ReservationError> {
        let reservation = self.authorized(actor, business_id, id).await?;
        if reservation.state == ReservationState::Canceled {
            return Ok(reservation);
        }

        let mut tx = self.reservation_repository.get_pool().begin().await?;
        self.reservation_repository.cancel(id, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(reservation_id = id, "reservation canceled");

        self.load(id).await
    }

    pub async fn get(&self, actor: &Actor, business_id: i32, id: i32) -> Result<Reservation, ReservationError> {
        self.authorized(actor, business_id, id).await
    }

    pub async fn list(
        &self,
        filter: &ReservationFilter,
    ) -> Result<(Vec<ReservationListRow>, i64), ReservationError> {
        let now = self.clock.now();

        Ok(self.reservation_repository.find_by_filter(filter, now).await?)
    }

    async fn authorized(&self, actor: &Actor, business_id: i32, id: i32) -> Result<Reservation, ReservationError> {
        let reservation = self.load(id).await?;
        if reservation.business_id != business_id {
            return Err(ReservationError::ReservationNotFound);
        }

        if !actor.may_access(reservation.business_id, reservation.user_id) {
            return Err(ReservationError::InsufficientPermission);
        }

        Ok(reservation)
    }

    async fn load(&self, id: i32) -> Result<Reservation, ReservationError> {
        let now = self.clock.now();

        self.reservation_repository
            .find_by_id(id)
            .await?
            .filter(|reservation| reservation.deleted_at.is_none_or(|deleted_at| deleted_at > now))
            .ok_or(ReservationError::ReservationNotFound)
    }
}
