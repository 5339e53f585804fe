//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 The dispatcher decides *when* and *what*. Sinks decide *how*: an HTTP POST
//! to the receiver, or a Vec in RAM for dry runs. They do not buffer. They do not
//! retry. They send one payload and report how it went. Like a postal worker who
//! delivers the mail without reading it.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::DeliveryError;

pub mod http;
pub mod in_mem;

pub use http::{HttpSink, HttpSinkConfig};
pub use in_mem::{InMemorySink, InMemorySinkConfig};

/// 🕳️ A sink that sends pre-rendered payloads. Pure I/O, zero logic.
///
/// # Contract 📜
/// - `send` gets a complete JSON array and tries to deliver it once.
/// - `Ok(())` means the receiver *accepted* the batch. Anything else is a [`DeliveryError`],
///   and the dispatcher puts the batch back.
/// - `&self`, not `&mut self`: flushes run in detached tasks that share the sink.
#[async_trait]
pub trait Sink: std::fmt::Debug + Send + Sync {
    /// 📡 Deliver one payload. No retries here, retries are the dispatcher's problem.
    async fn send(&self, payload: String) -> Result<(), DeliveryError>;
}

/// 🎛️ Which sink to build, tagged by backend name (`[sink_config.http]` / `[sink_config.in_memory]`).
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub enum SinkConfig {
    Http(HttpSinkConfig),
    InMemory(InMemorySinkConfig),
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Http(HttpSinkConfig::default())
    }
}

impl SinkConfig {
    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        match self {
            SinkConfig::Http(config) => config.validate(),
            SinkConfig::InMemory(_) => Ok(()),
        }
    }
}

/// 🎭 The many faces of a Sink. A polymorphic casting call for data destinations.
///
/// The enum dispatches `send` to the inner concrete type, keeping the supervisor
/// blissfully ignorant of where the cars actually land.
#[derive(Debug)]
pub enum SinkBackend {
    Http(HttpSink),
    InMemory(InMemorySink),
}

impl SinkBackend {
    /// 🏗️ Build whichever sink the config asked for.
    pub fn from_config(config: &SinkConfig) -> anyhow::Result<Self> {
        Ok(match config {
            SinkConfig::Http(http) => SinkBackend::Http(HttpSink::new(http.clone())?),
            SinkConfig::InMemory(_) => SinkBackend::InMemory(InMemorySink::new()),
        })
    }
}

#[async_trait]
impl Sink for SinkBackend {
    async fn send(&self, payload: String) -> Result<(), DeliveryError> {
        match self {
            SinkBackend::Http(sink) => sink.send(payload).await,
            SinkBackend::InMemory(sink) => sink.send(payload).await,
        }
    }
}
