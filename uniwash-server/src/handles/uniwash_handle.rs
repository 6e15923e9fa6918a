use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router, middleware};
use serde::Deserialize;
use time::Date;
use uniwash_api::models::*;

use crate::errors::{ApiError, ReservationError};
use crate::middlewares::{TokenState, auth};
use crate::repositories::{BusinessRepository, ReservationFilter};
use crate::services::{
    Actor, CommandService, DeviceService, HoldRequest, ReservationService, TokenClaims,
};

use super::{business_actor, into_page};

#[derive(Clone)]
pub struct UniWashState {
    pub reservation_service: Arc<ReservationService>,
    pub command_service: Arc<CommandService>,
    pub device_service: Arc<DeviceService>,
    pub business_repository: Arc<BusinessRepository>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReservedMachinesQuery {
    #[serde(rename = "Date", with = "date_format::option")]
    pub date: Option<Date>,
    #[serde(rename = "ProductID")]
    pub product_id: Option<i32>,
    /// Comma separated extras: `tentative`, `usage_count`.
    #[serde(rename = "With")]
    pub with: Option<String>,
    #[serde(rename = "Page")]
    pub page: Option<u32>,
    #[serde(rename = "PageSize")]
    pub page_size: Option<u32>,
}

pub fn uniwash_router(uniwash_state: UniWashState, token_state: TokenState) -> Router {
    Router::new()
        .route("/business/:business_id/uni-wash/send-command", post(send_business_command))
        .route(
            "/business/:business_id/uni-wash/device/reservation-options",
            get(get_reservation_options),
        )
        .route("/business/:business_id/uni-wash/devices", get(get_devices))
        .route(
            "/business/:business_id/uni-wash/devices/:device_id",
            delete(delete_device),
        )
        .route(
            "/business/:business_id/uni-wash/devices/:device_id/availability",
            put(update_device_availability),
        )
        .route("/user/business/:business_id/uni-wash/send-command", post(send_user_command))
        .route(
            "/user/business/:business_id/uni-wash/reserved-machines",
            get(get_reserved_machines),
        )
        .route("/user/business/:business_id/uni-wash/reservations", post(create_reservation))
        .route(
            "/user/business/:business_id/uni-wash/reservations/:reservation_id/cancel",
            post(cancel_user_reservation),
        )
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(uniwash_state)
}

pub async fn send_business_command(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<UniWashState>,
    Path(business_id): Path<i32>,
    Json(body): Json<SendCommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let actor = business_actor(&state.business_repository, &token_data, business_id).await?;

    dispatch(&state, &actor, business_id, body).await
}

pub async fn send_user_command(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<UniWashState>,
    Path(business_id): Path<i32>,
    Json(body): Json<SendCommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let actor = Actor::EndUser {
        user_id: token_data.sub,
    };

    dispatch(&state, &actor, business_id, body).await
}

async fn dispatch(
    state: &UniWashState,
    actor: &Actor,
    business_id: i32,
    body: SendCommandRequest,
) -> Result<Json<CommandResponse>, ApiError> {
    let outcome = state
        .command_service
        .send_command(actor, business_id, body.product_id, body.reservation_id, body.command)
        .await?;

    Ok(Json(CommandResponse {
        message: format!("command {} sent", body.command),
        sms_reference: outcome.reference_id,
    }))
}

pub async fn get_reserved_machines(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<UniWashState>,
    Path(business_id): Path<i32>,
    Query(query): Query<ReservedMachinesQuery>,
) -> Result<Json<Page<ReservationResponse>>, ApiError> {
    let service = &state.reservation_service;

    let (start_from, end_until) = match query.date {
        Some(date) => {
            let (start, end) = service.day_range(date).ok_or(ReservationError::InvalidRequest)?;
            (Some(start), Some(end))
        }
        None => (None, None),
    };

    let extras: Vec<&str> = query
        .with
        .as_deref()
        .map(|with| with.split(',').map(str::trim).collect())
        .unwrap_or_default();

    let filter = ReservationFilter {
        business_id: Some(business_id),
        user_id: Some(token_data.sub),
        device_id: query.product_id,
        start_from,
        end_until,
        include_tentative: extras.contains(&"tentative"),
        with_usage_count: extras.contains(&"usage_count"),
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(20),
        ..Default::default()
    };

    let (rows, total) = service.list(&filter).await?;

    Ok(Json(into_page(rows, total, &filter)))
}

pub async fn get_reservation_options(
    State(state): State<UniWashState>,
    Path(_business_id): Path<i32>,
) -> Json<Vec<ReservationOption>> {
    Json(state.reservation_service.catalog().options())
}

pub async fn create_reservation(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<UniWashState>,
    Path(business_id): Path<i32>,
    Json(body): Json<CreateHoldRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = state
        .reservation_service
        .create_hold(&HoldRequest {
            device_id: body.product_id,
            business_id,
            user_id: token_data.sub,
            date: body.date,
            start: body.start,
            end: body.end,
        })
        .await?;

    Ok(Json(reservation.into_response()))
}

pub async fn cancel_user_reservation(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<UniWashState>,
    Path((business_id, reservation_id)): Path<(i32, i32)>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let actor = Actor::EndUser {
        user_id: token_data.sub,
    };

    let reservation = state
        .reservation_service
        .cancel(&actor, business_id, reservation_id)
        .await?;

    Ok(Json(reservation.into_response()))
}

pub async fn get_devices(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<UniWashState>,
    Path(business_id): Path<i32>,
) -> Result<Json<Vec<DeviceStatusResponse>>, ApiError> {
    let actor = business_actor(&state.business_repository, &token_data, business_id).await?;

    let devices = state.device_service.list_for_business(&actor, business_id).await?;

    Ok(Json(devices.into_iter().map(|device| device.into_response()).collect()))
}

pub async fn update_device_availability(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<UniWashState>,
    Path((business_id, device_id)): Path<(i32, i32)>,
    Json(body): Json<UpdateAvailabilityRequest>,
) -> Result<Json<DeviceStatusResponse>, ApiError> {
    let actor = business_actor(&state.business_repository, &token_data, business_id).await?;

    let device = if body.offline {
        state.device_service.set_offline(&actor, business_id, device_id).await?
    } else {
        state.device_service.clear_offline(&actor, business_id, device_id).await?
    };

    Ok(Json(device.into_response()))
}

pub async fn delete_device(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<UniWashState>,
    Path((business_id, device_id)): Path<(i32, i32)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let actor = business_actor(&state.business_repository, &token_data, business_id).await?;

    state.device_service.remove(&actor, business_id, device_id).await?;

    Ok(Json(MessageResponse {
        message: String::from("device removed"),
    }))
}
