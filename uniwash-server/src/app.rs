use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::handles::*;
use crate::middlewares::TokenState;
use crate::repositories::{BusinessRepository, DeviceRepository, ReservationRepository};
use crate::services::*;

/// Long-lived services shared by the router and the reminder scheduler.
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<Storage>,
    pub token_service: Arc<TokenService>,
    pub business_repository: Arc<BusinessRepository>,
    pub reservation_service: Arc<ReservationService>,
    pub command_service: Arc<CommandService>,
    pub device_service: Arc<DeviceService>,
    pub reminder_service: Arc<ReminderService>,
}

impl AppContext {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let storage = Arc::new(
            Storage::new(settings.database.clone(), SchemaManager::default())
                .await
                .context("failed to open storage")?,
        );
        let gateway = build_gateway(settings).context("failed to build sms gateway")?;

        Self::from_parts(settings, storage, gateway, Arc::new(SystemClock))
    }

    /// Wires services over explicit collaborators.
    pub fn from_parts(
        settings: &Settings,
        storage: Arc<Storage>,
        gateway: Arc<dyn SmsGateway>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let offset = settings.utc_offset()?;

        let business_repository = Arc::new(BusinessRepository::new(storage.clone()));
        let device_repository = Arc::new(DeviceRepository::new(storage.clone()));
        let reservation_repository = Arc::new(ReservationRepository::new(storage.clone()));

        let reservation_service = Arc::new(ReservationService::new(
            reservation_repository.clone(),
            device_repository.clone(),
            SlotCatalog::standard(),
            clock.clone(),
            offset,
        ));
        let command_service = Arc::new(CommandService::new(
            reservation_repository.clone(),
            device_repository.clone(),
            gateway.clone(),
            clock.clone(),
            settings.sms.provider.clone(),
            settings.sms_timeout(),
        ));
        let device_service = Arc::new(DeviceService::new(device_repository, clock.clone()));
        let reminder_service = Arc::new(ReminderService::new(
            reservation_repository,
            gateway,
            clock,
            settings.sms.provider.clone(),
            settings.sms_timeout(),
            offset,
            settings.production,
            settings.scheduler.batch_size,
        ));

        Ok(Self {
            storage,
            token_service: Arc::new(TokenService::new(settings.auth.clone())),
            business_repository,
            reservation_service,
            command_service,
            device_service,
            reminder_service,
        })
    }

    pub fn start_scheduler(&self, settings: &Settings) -> anyhow::Result<ReminderScheduler> {
        Ok(ReminderScheduler::start(
            self.reminder_service.clone(),
            settings.scheduler.turn_on_interval()?,
            settings.scheduler.turn_off_interval()?,
        ))
    }
}

pub fn create_app(context: &AppContext) -> Router {
    let token_state = TokenState {
        token_service: context.token_service.clone(),
    };

    let reservations = reservation_router(
        ReservationHandleState {
            reservation_service: context.reservation_service.clone(),
            business_repository: context.business_repository.clone(),
        },
        token_state.clone(),
    );

    let uniwash = uniwash_router(
        UniWashState {
            reservation_service: context.reservation_service.clone(),
            command_service: context.command_service.clone(),
            device_service: context.device_service.clone(),
            business_repository: context.business_repository.clone(),
        },
        token_state,
    );

    Router::new()
        .merge(reservations)
        .merge(uniwash)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
