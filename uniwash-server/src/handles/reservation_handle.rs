use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router, middleware};
use serde::Deserialize;
use time::Date;
use uniwash_api::models::{Page, ReservationResponse, ReservationState, date_format};

use crate::errors::{ApiError, AuthError, ReservationError};
use crate::middlewares::{TokenState, auth};
use crate::repositories::{BusinessRepository, ReservationFilter};
use crate::services::{ReservationService, TokenClaims};

use super::{business_actor, into_page, parse_ids};

#[derive(Clone)]
pub struct ReservationHandleState {
    pub reservation_service: Arc<ReservationService>,
    pub business_repository: Arc<BusinessRepository>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReservationQuery {
    pub user_id: Option<i32>,
    pub device_id: Option<i32>,
    pub state: Option<ReservationState>,
    pub mobile: Option<String>,
    pub full_name: Option<String>,
    #[serde(with = "date_format::option")]
    pub from: Option<Date>,
    #[serde(with = "date_format::option")]
    pub until: Option<Date>,
    pub post_ids: Option<String>,
    pub city_ids: Option<String>,
    pub workspace_ids: Option<String>,
    pub dormitory_ids: Option<String>,
    pub include_tentative: bool,
    pub with_usage_count: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub fn reservation_router(reservation_state: ReservationHandleState, token_state: TokenState) -> Router {
    Router::new()
        .route("/business/:business_id/reservations", get(get_business_reservations))
        .route(
            "/business/:business_id/reservations/:reservation_id",
            get(get_business_reservation),
        )
        .route(
            "/business/:business_id/reservations/:reservation_id/confirm",
            post(confirm_reservation),
        )
        .route(
            "/business/:business_id/reservations/:reservation_id/cancel",
            post(cancel_business_reservation),
        )
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(reservation_state)
}

pub async fn get_business_reservations(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ReservationHandleState>,
    Path(business_id): Path<i32>,
    Query(query): Query<ReservationQuery>,
) -> Result<Json<Page<ReservationResponse>>, ApiError> {
    let actor = business_actor(&state.business_repository, &token_data, business_id).await?;
    if !actor.can_manage_devices() {
        return Err(AuthError::InsufficientPermission.into());
    }

    let service = &state.reservation_service;
    let start_from = match query.from {
        Some(date) => Some(service.day_range(date).ok_or(ReservationError::InvalidRequest)?.0),
        None => None,
    };
    let end_until = match query.until {
        Some(date) => Some(service.day_range(date).ok_or(ReservationError::InvalidRequest)?.1),
        None => None,
    };

    let filter = ReservationFilter {
        business_id: Some(business_id),
        user_id: query.user_id,
        device_id: query.device_id,
        state: query.state,
        mobile: query.mobile,
        full_name: query.full_name,
        start_from,
        end_until,
        post_ids: parse_ids(query.post_ids.as_deref())?,
        city_ids: parse_ids(query.city_ids.as_deref())?,
        workspace_ids: parse_ids(query.workspace_ids.as_deref())?,
        dormitory_ids: parse_ids(query.dormitory_ids.as_deref())?,
        include_tentative: query.include_tentative,
        with_usage_count: query.with_usage_count,
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(20),
    };

    let (rows, total) = service.list(&filter).await?;

    Ok(Json(into_page(rows, total, &filter)))
}

pub async fn get_business_reservation(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ReservationHandleState>,
    Path((business_id, reservation_id)): Path<(i32, i32)>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let actor = business_actor(&state.business_repository, &token_data, business_id).await?;

    let reservation = state.reservation_service.get(&actor, business_id, reservation_id).await?;

    Ok(Json(reservation.into_response()))
}

/// Called once payment for a hold has settled.
pub async fn confirm_reservation(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ReservationHandleState>,
    Path((business_id, reservation_id)): Path<(i32, i32)>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let actor = business_actor(&state.business_repository, &token_data, business_id).await?;

    let reservation = state
        .reservation_service
        .confirm_hold(&actor, business_id, reservation_id)
        .await?;

    Ok(Json(reservation.into_response()))
}

pub async fn cancel_business_reservation(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ReservationHandleState>,
    Path((business_id, reservation_id)): Path<(i32, i32)>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let actor = business_actor(&state.business_repository, &token_data, business_id).await?;

    let reservation = state.reservation_service.cancel(&actor, business_id, reservation_id).await?;

    Ok(Json(reservation.into_response()))
}
