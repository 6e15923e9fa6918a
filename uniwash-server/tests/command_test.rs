use time::macros::datetime;
use uniwash_api::models::{Command, MachineStatus, ReservationState};
use uniwash_server::errors::CommandError;
use uniwash_server::models::Reservation;
use uniwash_server::repositories::{DeviceRepository, ReservationRepository};
use uniwash_server::services::{Actor, COMMAND_TEMPLATE_ID};
use uniwash_server::tests::*;

mod common;
use common::mock_app::MockApp;

/// Confirmed reservation for 10:00-11:30 Tehran time on 2025-03-15.
async fn morning_reservation(app: &MockApp) -> Reservation {
    create_test_reservation(
        app.storage.clone(),
        &app.device,
        app.customer.id,
        ReservationState::Confirmed,
        datetime!(2025-03-15 06:30 UTC),
        datetime!(2025-03-15 08:00 UTC),
        None,
    )
    .await
}

#[tokio::test]
async fn test_happy_path_turns_machine_on() {
    // 08:21 Tehran time, slot 08:30-10:00
    let app = MockApp::new(datetime!(2025-03-15 04:51 UTC)).await;
    let reservation = create_test_reservation(
        app.storage.clone(),
        &app.device,
        app.customer.id,
        ReservationState::Confirmed,
        datetime!(2025-03-15 05:00 UTC),
        datetime!(2025-03-15 06:30 UTC),
        None,
    )
    .await;

    let outcome = app
        .context
        .command_service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await
        .unwrap();
    assert_eq!(outcome.machine_status, MachineStatus::On);

    let sent = app.gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template_id, COMMAND_TEMPLATE_ID);
    assert_eq!(sent[0].params, vec![String::from("7")]);
    assert_eq!(sent[0].mobile, "09120000000");

    let stored = ReservationRepository::new(app.storage.clone())
        .find_by_id(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_command, Some(Command::On));
    assert_eq!(stored.last_command_sms_ref.as_deref(), Some(outcome.reference_id.as_str()));
    assert_eq!(stored.last_command_time, Some(datetime!(2025-03-15 04:51 UTC)));

    let device = DeviceRepository::new(app.storage.clone())
        .find_by_id(app.device.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(device.machine_status, MachineStatus::On);
    assert_eq!(device.last_command, Some(Command::On));
}

#[tokio::test]
async fn test_window_opens_ten_minutes_before_start() {
    let app = MockApp::new(datetime!(2025-03-15 06:19 UTC)).await;
    let reservation = morning_reservation(&app).await;
    let service = &app.context.command_service;

    // 09:49 Tehran time
    let result = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await;
    assert!(matches!(result, Err(CommandError::OutOfWindow)));

    app.clock.set(datetime!(2025-03-15 06:19:59 UTC));
    let result = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await;
    assert!(matches!(result, Err(CommandError::OutOfWindow)));

    // 09:50 Tehran time
    app.clock.set(datetime!(2025-03-15 06:20 UTC));
    let result = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await;
    assert!(result.is_ok());
    assert_eq!(app.gateway.sent().len(), 1);
}

#[tokio::test]
async fn test_window_closes_ten_minutes_before_end() {
    let app = MockApp::new(datetime!(2025-03-15 07:50 UTC)).await;
    let reservation = morning_reservation(&app).await;
    let service = &app.context.command_service;

    let result = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::Off)
        .await;
    assert!(result.is_ok());

    app.clock.set(datetime!(2025-03-15 07:50:01 UTC));
    let result = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::MoreWater)
        .await;
    assert!(matches!(result, Err(CommandError::OutOfWindow)));
}

#[tokio::test]
async fn test_business_agent_is_not_bound_to_window() {
    let app = MockApp::new(datetime!(2025-03-15 02:00 UTC)).await;
    let reservation = morning_reservation(&app).await;

    let result = app
        .context
        .command_service
        .send_command(&app.owner_actor(), app.business.id, app.device.id, reservation.id, Command::Off)
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_second_on_is_refused() {
    let app = MockApp::new(datetime!(2025-03-15 06:30 UTC)).await;
    let reservation = morning_reservation(&app).await;
    let service = &app.context.command_service;

    service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await
        .unwrap();

    let result = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await;
    assert!(matches!(result, Err(CommandError::AlreadyOn)));
    assert_eq!(app.gateway.sent().len(), 1);
}

#[tokio::test]
async fn test_command_times_strictly_increase() {
    let app = MockApp::new(datetime!(2025-03-15 06:30 UTC)).await;
    let reservation = morning_reservation(&app).await;
    let service = &app.context.command_service;

    let on = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await
        .unwrap();
    // clock has not moved
    let off = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::Off)
        .await
        .unwrap();

    assert!(off.issued_at > on.issued_at);
    assert_eq!(off.machine_status, MachineStatus::Off);
}

#[tokio::test]
async fn test_offline_device_refuses_commands() {
    let app = MockApp::new(datetime!(2025-03-15 06:30 UTC)).await;
    let reservation = morning_reservation(&app).await;

    app.context
        .device_service
        .set_offline(&app.owner_actor(), app.business.id, app.device.id)
        .await
        .unwrap();

    let result = app
        .context
        .command_service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await;

    assert!(matches!(result, Err(CommandError::DeviceUnavailable)));
    assert!(app.gateway.sent().is_empty());
}

#[tokio::test]
async fn test_gateway_failure_leaves_state_untouched() {
    let app = MockApp::new(datetime!(2025-03-15 06:30 UTC)).await;
    let reservation = morning_reservation(&app).await;
    app.gateway.set_failing(true);

    let result = app
        .context
        .command_service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::Off)
        .await;
    assert!(matches!(result, Err(CommandError::GatewayError(_))));

    let stored = ReservationRepository::new(app.storage.clone())
        .find_by_id(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_command, None);
    assert_eq!(stored.last_command_time, None);

    let device = DeviceRepository::new(app.storage.clone())
        .find_by_id(app.device.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(device.machine_status, MachineStatus::On);
    assert_eq!(device.last_command, None);
}

#[tokio::test]
async fn test_only_owner_and_business_may_command() {
    let app = MockApp::new(datetime!(2025-03-15 06:30 UTC)).await;
    let reservation = morning_reservation(&app).await;
    let other = create_test_user(app.storage.clone(), "Nima", "Rahimi", "09123000000").await;
    let service = &app.context.command_service;

    let result = service
        .send_command(&Actor::EndUser { user_id: other.id }, app.business.id, app.device.id, reservation.id, Command::On)
        .await;
    assert!(matches!(result, Err(CommandError::InsufficientPermission)));

    let result = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id + 100, reservation.id, Command::On)
        .await;
    assert!(matches!(result, Err(CommandError::DeviceMismatch)));
}

#[tokio::test]
async fn test_unconfirmed_reservations_cannot_command() {
    let app = MockApp::new(datetime!(2025-03-15 06:30 UTC)).await;
    let reservation = create_test_reservation(
        app.storage.clone(),
        &app.device,
        app.customer.id,
        ReservationState::Tentative,
        datetime!(2025-03-15 06:30 UTC),
        datetime!(2025-03-15 08:00 UTC),
        Some(datetime!(2025-03-15 06:40 UTC)),
    )
    .await;

    let result = app
        .context
        .command_service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await;

    assert!(matches!(result, Err(CommandError::ReservationNotFound)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_turn_on_reaches_machine_once() {
    let app = MockApp::new(datetime!(2025-03-15 06:30 UTC)).await;
    let reservation = morning_reservation(&app).await;
    let actor = app.customer_actor();
    let service = app.context.command_service.clone();

    let (first, second) = tokio::join!(
        service.send_command(&actor, app.business.id, app.device.id, reservation.id, Command::On),
        service.send_command(&actor, app.business.id, app.device.id, reservation.id, Command::On),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|result| matches!(result, Err(CommandError::AlreadyOn)))
            .count(),
        1
    );
    assert_eq!(app.gateway.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_turn_on_can_be_retried() {
    let app = MockApp::new(datetime!(2025-03-15 06:30 UTC)).await;
    let reservation = morning_reservation(&app).await;
    let service = &app.context.command_service;

    app.gateway.set_failing(true);
    let result = service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await;
    assert!(matches!(result, Err(CommandError::GatewayError(_))));

    let stored = ReservationRepository::new(app.storage.clone())
        .find_by_id(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_command, None);

    app.gateway.set_failing(false);
    service
        .send_command(&app.customer_actor(), app.business.id, app.device.id, reservation.id, Command::On)
        .await
        .unwrap();
    assert_eq!(app.gateway.sent().len(), 1);
}
