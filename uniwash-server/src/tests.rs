//! Fixtures shared by the integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uniwash_api::models::{MachineStatus, ReservationState};

use crate::configs::{Auth, Database, Logger, Scheduler, SchemaManager, Server, Settings, Sms, Storage};
use crate::models::{Business, BusinessRole, Device, Post, PostStatus, Reservation, Taxonomy, TaxonomyKind, User};
use crate::services::{SmsError, SmsGateway, SmsReceipt, SmsRequest};

pub use crate::services::ManualClock;

pub fn test_settings(production: bool) -> Settings {
    Settings {
        server: Server {
            host: String::from("127.0.0.1"),
            port: 0,
        },
        logger: Logger {
            level: String::from("debug"),
        },
        database: test_database(),
        auth: Auth {
            secret: String::from("test"),
            expiration: 1000,
        },
        sms: Sms {
            base_url: String::from("http://127.0.0.1:9"),
            api_key: String::from("test-key"),
            provider: String::from("kavenegar"),
            developer_mobile: String::from("09350000000"),
            timeout_secs: 1,
        },
        scheduler: Scheduler::default(),
        production,
        timezone: String::from("Asia/Tehran"),
    }
}

pub fn test_database() -> Database {
    Database {
        migration_path: None,
        clean_start: true,
        url: String::from("sqlite::memory:"),
        max_connections: 1,
        acquire_timeout_secs: 5,
    }
}

pub async fn create_test_storage() -> Arc<Storage> {
    Arc::new(
        Storage::new(test_database(), SchemaManager::default())
            .await
            .unwrap(),
    )
}

pub async fn create_test_user(storage: Arc<Storage>, first_name: &str, last_name: &str, mobile: &str) -> User {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (first_name, last_name, mobile)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(first_name)
    .bind(last_name)
    .bind(mobile)
    .fetch_one(storage.get_pool())
    .await
    .unwrap()
}

/// Creates a business and registers `owner_id` as its owner.
pub async fn create_test_business(storage: Arc<Storage>, owner_id: i32, name: &str) -> Business {
    let business = sqlx::query_as::<_, Business>(
        r#"
        INSERT INTO businesses (owner_id, name)
            VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(owner_id)
    .bind(name)
    .fetch_one(storage.get_pool())
    .await
    .unwrap();

    create_test_member(storage, owner_id, business.id, BusinessRole::Owner).await;

    business
}

pub async fn create_test_member(storage: Arc<Storage>, user_id: i32, business_id: i32, role: BusinessRole) {
    sqlx::query("INSERT INTO business_members (user_id, business_id, role) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(business_id)
        .bind(role.as_str())
        .execute(storage.get_pool())
        .await
        .unwrap();
}

pub async fn create_test_post(storage: Arc<Storage>, business_id: i32, title: &str, status: PostStatus) -> Post {
    sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (business_id, title, status)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(business_id)
    .bind(title)
    .bind(status.as_str())
    .fetch_one(storage.get_pool())
    .await
    .unwrap()
}

/// Creates a taxonomy term and attaches it to `post_id`.
pub async fn create_test_taxonomy(storage: Arc<Storage>, post_id: i32, kind: TaxonomyKind, title: &str) -> Taxonomy {
    let taxonomy = sqlx::query_as::<_, Taxonomy>(
        r#"
        INSERT INTO taxonomies (kind, title)
            VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(kind.as_str())
    .bind(title)
    .fetch_one(storage.get_pool())
    .await
    .unwrap();

    sqlx::query("INSERT INTO post_taxonomies (post_id, taxonomy_id) VALUES ($1, $2)")
        .bind(post_id)
        .bind(taxonomy.id)
        .execute(storage.get_pool())
        .await
        .unwrap();

    taxonomy
}

pub async fn create_test_device(
    storage: Arc<Storage>,
    business_id: i32,
    post_id: i32,
    sku: &str,
    mobile_number: &str,
    status: MachineStatus,
) -> Device {
    sqlx::query_as::<_, Device>(
        r#"
        INSERT INTO devices (business_id, post_id, sku, mobile_number, machine_status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(business_id)
    .bind(post_id)
    .bind(sku)
    .bind(mobile_number)
    .bind(status.as_str())
    .fetch_one(storage.get_pool())
    .await
    .unwrap()
}

/// Inserts a reservation row directly, bypassing slot validation.
pub async fn create_test_reservation(
    storage: Arc<Storage>,
    device: &Device,
    user_id: i32,
    state: ReservationState,
    start_at: OffsetDateTime,
    end_at: OffsetDateTime,
    expires_at: Option<OffsetDateTime>,
) -> Reservation {
    sqlx::query_as::<_, Reservation>(
        r#"
        INSERT INTO reservations (device_id, user_id, business_id, state, start_at, end_at, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(device.id)
    .bind(user_id)
    .bind(device.business_id)
    .bind(state.as_str())
    .bind(start_at)
    .bind(end_at)
    .bind(expires_at)
    .bind(start_at - time::Duration::days(1))
    .fetch_one(storage.get_pool())
    .await
    .unwrap()
}

/// Gateway double keeping every request it was asked to send.
#[derive(Default)]
pub struct RecordingSmsGateway {
    sent: Mutex<Vec<SmsRequest>>,
    failing: Mutex<bool>,
}

impl RecordingSmsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn sent(&self) -> Vec<SmsRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsGateway for RecordingSmsGateway {
    async fn send(&self, request: SmsRequest) -> Result<SmsReceipt, SmsError> {
        if *self.failing.lock().unwrap() {
            return Err(SmsError::Rejected(String::from("gateway unavailable")));
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(request);

        Ok(SmsReceipt {
            reference_id: format!("ref-{}", sent.len()),
        })
    }
}
