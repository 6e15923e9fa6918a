#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use time::OffsetDateTime;
use tower::ServiceExt;
use uniwash_api::models::MachineStatus;
use uniwash_server::app::{AppContext, create_app};
use uniwash_server::configs::{Settings, Storage};
use uniwash_server::models::{Business, Device, Post, PostStatus, User};
use uniwash_server::services::Actor;
use uniwash_server::tests::*;

pub struct MockApp {
    pub storage: Arc<Storage>,
    pub clock: Arc<ManualClock>,
    pub gateway: Arc<RecordingSmsGateway>,
    pub context: AppContext,
    pub router: Router,
    pub owner: User,
    pub customer: User,
    pub business: Business,
    pub post: Post,
    pub device: Device,
}

impl MockApp {
    pub async fn new(now: OffsetDateTime) -> Self {
        Self::with_settings(test_settings(true), now).await
    }

    pub async fn with_settings(settings: Settings, now: OffsetDateTime) -> Self {
        let storage = create_test_storage().await;
        let clock = Arc::new(ManualClock::new(now));
        let gateway = Arc::new(RecordingSmsGateway::new());

        let context =
            AppContext::from_parts(&settings, storage.clone(), gateway.clone(), clock.clone())
                .unwrap();
        let router = create_app(&context);

        let owner = create_test_user(storage.clone(), "Reza", "Moradi", "09121000000").await;
        let customer = create_test_user(storage.clone(), "Sara", "Ahmadi", "09122000000").await;
        let business = create_test_business(storage.clone(), owner.id, "Dorm Laundry").await;
        let post = create_test_post(storage.clone(), business.id, "Block A", PostStatus::Published).await;
        let device = create_test_device(
            storage.clone(),
            business.id,
            post.id,
            "W-01",
            "09120000000",
            MachineStatus::On,
        )
        .await;

        Self {
            storage,
            clock,
            gateway,
            context,
            router,
            owner,
            customer,
            business,
            post,
            device,
        }
    }

    pub fn token_for(&self, user: &User) -> String {
        self.context.token_service.generate_token(user).unwrap().token
    }

    pub fn customer_actor(&self) -> Actor {
        Actor::EndUser {
            user_id: self.customer.id,
        }
    }

    pub fn owner_actor(&self) -> Actor {
        Actor::BusinessAgent {
            user_id: self.owner.id,
            business_id: self.business.id,
            role: uniwash_server::models::BusinessRole::Owner,
        }
    }

    /// Sends a request through the router, returning status and JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };

        (status, value)
    }
}
