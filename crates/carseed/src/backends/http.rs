//! 📡 The HTTP sink, the business end of the pipeline.
//!
//! 🎬 COLD OPEN. INT. RECEIVER, SOME TIME LATER
//!
//! A JSON array of fifty cars arrives with an `x-api-key` header and a hopeful
//! `Content-Type`. The receiver squints at it. It says 202. Everyone goes home.
//! Or it says 500, and the cars go back to the lot to wait for the next bus.
//!
//! This module only does the POST and reads the verdict. Which verdict counts as
//! "accepted" is config (`accepted_status`, 202 unless you say otherwise).

use std::time::Duration;

use anyhow::{Context, ensure};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info, trace};

use crate::backends::Sink;
use crate::errors::DeliveryError;

/// 📡 Where the cars go and how we knock on the door.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpSinkConfig {
    /// 📡 Full receiver URL, bulk route included.
    #[serde(default = "default_url")]
    pub url: String,
    /// 🔒 Sent as `x-api-key` on every request.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// ✅ The one status code that means "got it". Everything else gets retried.
    #[serde(default = "default_accepted_status")]
    pub accepted_status: u16,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:3000/cars/bulk".to_string()
}

fn default_api_key() -> String {
    "default-ingestion-api-key".to_string()
}

fn default_accepted_status() -> u16 {
    202
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: default_api_key(),
            accepted_status: default_accepted_status(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl HttpSinkConfig {
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            StatusCode::from_u16(self.accepted_status).is_ok(),
            "💀 sink_config.http.accepted_status {} is not an HTTP status code. Not even a teapot.",
            self.accepted_status
        );
        Ok(())
    }
}

/// 📡 POSTs JSON arrays to the receiver. Holds one `reqwest::Client`, reused across requests.
#[derive(Debug)]
pub struct HttpSink {
    client: reqwest::Client,
    config: HttpSinkConfig,
    accepted: StatusCode,
}

impl HttpSink {
    /// 🚀 Build the client with the configured timeouts. No connectivity ping: the receiver
    /// being down at startup is just a retry waiting to happen, not a reason to quit.
    pub fn new(config: HttpSinkConfig) -> anyhow::Result<Self> {
        let accepted = StatusCode::from_u16(config.accepted_status).with_context(|| {
            format!(
                "💀 accepted_status {} is not a status code we can compare against",
                config.accepted_status
            )
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("💀 The HTTP client refused to be born. The TLS stack wept. Probably a missing cert store or a cursed system OpenSSL.")?;

        info!("📡 Receiver endpoint: {}", config.url);
        Ok(Self {
            client,
            config,
            accepted,
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn send(&self, payload: String) -> Result<(), DeliveryError> {
        debug!(
            "📡 POSTing {} bytes to {}, the cars have left the lot",
            payload.len(),
            self.config.url
        );

        let response = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.config.api_key)
            .body(payload)
            .send()
            .await
            .map_err(|err| {
                // -- 🏗️ builder errors never touched the network, everything else did
                if err.is_builder() {
                    DeliveryError::RequestConstruction {
                        reason: err.to_string(),
                    }
                } else {
                    DeliveryError::NoResponse {
                        endpoint: self.config.url.clone(),
                        source: Box::new(err),
                    }
                }
            })?;

        let status = response.status();
        if status != self.accepted {
            // -- 💀 we got an answer, just not the one we wanted. grab the body for the postmortem.
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        trace!("✅ Receiver said {}, batch accepted", status);
        Ok(())
    }
}
