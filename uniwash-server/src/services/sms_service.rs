use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uniwash_api::models::Command;

use crate::configs::{Settings, Sms};

/// Template carrying a device control literal.
pub const COMMAND_TEMPLATE_ID: u32 = 8698;
/// "You may turn the machine on now" reminder.
pub const TURN_ON_REMINDER_TEMPLATE_ID: u32 = 16620;
/// "Turn the machine off soon" reminder.
pub const TURN_OFF_REMINDER_TEMPLATE_ID: u32 = 16621;

/// Token the machine controller understands for each command.
pub fn command_literal(command: Command) -> &'static str {
    match command {
        Command::On => "7",
        Command::Off => "2",
        Command::MoreWater => "3",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsMethod {
    Sms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsRequest {
    pub provider: String,
    pub template_id: u32,
    pub method: SmsMethod,
    pub params: Vec<String>,
    pub mobile: String,
}

impl SmsRequest {
    pub fn new(provider: &str, template_id: u32, params: Vec<String>, mobile: &str) -> Self {
        Self {
            provider: provider.to_string(),
            template_id,
            method: SmsMethod::Sms,
            params,
            mobile: mobile.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsReceipt {
    pub reference_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("gateway rejected the message: {0}")]
    Rejected(String),

    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway did not answer in time")]
    Timeout,
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, request: SmsRequest) -> Result<SmsReceipt, SmsError>;
}

#[async_trait]
impl<G: SmsGateway + ?Sized> SmsGateway for Arc<G> {
    async fn send(&self, request: SmsRequest) -> Result<SmsReceipt, SmsError> {
        (**self).send(request).await
    }
}

/// Talks to the SMS provider's JSON endpoint.
#[derive(Clone)]
pub struct HttpSmsGateway {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HttpSmsGateway {
    pub fn new(sms: &Sms) -> Result<Self, SmsError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(sms.timeout_secs.max(1)))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: sms.base_url.trim_end_matches('/').to_string(),
            api_key: sms.api_key.clone(),
        })
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    #[instrument(
        skip(self, request),
        fields(template_id = request.template_id, mobile = %request.mobile),
        level = "debug"
    )]
    async fn send(&self, request: SmsRequest) -> Result<SmsReceipt, SmsError> {
        let response = self
            .http
            .post(format!("{}/send", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected(format!("{status}: {body}")));
        }

        let receipt: SmsReceipt = response.json().await?;
        if receipt.reference_id.is_empty() {
            return Err(SmsError::Rejected(String::from("empty reference id")));
        }

        tracing::debug!(reference_id = %receipt.reference_id, "sms accepted");

        Ok(receipt)
    }
}

/// Sends every message to one fixed number instead of the real recipient.
pub struct RetargetingSmsGateway<G> {
    inner: G,
    mobile: String,
}

impl<G> RetargetingSmsGateway<G> {
    pub fn new(inner: G, mobile: impl Into<String>) -> Self {
        Self {
            inner,
            mobile: mobile.into(),
        }
    }
}

#[async_trait]
impl<G: SmsGateway> SmsGateway for RetargetingSmsGateway<G> {
    async fn send(&self, mut request: SmsRequest) -> Result<SmsReceipt, SmsError> {
        tracing::debug!(original = %request.mobile, target = %self.mobile, "retargeting sms");
        request.mobile = self.mobile.clone();

        self.inner.send(request).await
    }
}

/// Sends through `gateway`, giving up with [`SmsError::Timeout`] after `deadline`.
pub async fn send_with_deadline(
    gateway: &dyn SmsGateway,
    request: SmsRequest,
    deadline: Duration,
) -> Result<SmsReceipt, SmsError> {
    tokio::time::timeout(deadline, gateway.send(request))
        .await
        .map_err(|_| SmsError::Timeout)?
}

/// Builds the process-wide gateway. Outside production every message is
/// redirected to the developer mobile.
pub fn build_gateway(settings: &Settings) -> Result<Arc<dyn SmsGateway>, SmsError> {
    let http = HttpSmsGateway::new(&settings.sms)?;

    if settings.production {
        return Ok(Arc::new(http));
    }

    tracing::info!(
        mobile = %settings.sms.developer_mobile,
        "non-production mode: sms messages are retargeted"
    );

    Ok(Arc::new(RetargetingSmsGateway::new(
        http,
        settings.sms.developer_mobile.clone(),
    )))
}
