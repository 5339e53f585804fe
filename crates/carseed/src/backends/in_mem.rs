//! # Previously, on carseed...
//!
//! 🎬 The receiver was down. The demo was in ten minutes. Someone had to accept
//! the cars. Someone had to say 202 without even looking. That someone was this module.
//!
//! `InMemorySink` accepts every payload and keeps it behind an `Arc<Mutex<...>>`
//! so callers can inspect what arrived. Dry runs, demos, trust issues: all covered.
//!
//! ⚠️ Nothing here leaves the process. If you point production at this, the cars
//! will pile up in RAM and be forgotten on exit. 🦆

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::backends::Sink;
use crate::errors::DeliveryError;

/// 🎛️ Nothing to configure. It's a Vec. It accepts everything.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct InMemorySinkConfig {}

/// 📦 A sink that never forgets and never says no.
///
/// Clone-able so tests can keep a handle after giving the sink to the dispatcher.
/// The `Arc` means every clone sees the same Vec.
#[derive(Debug, Default, Clone)]
pub struct InMemorySink {
    received: Arc<Mutex<Vec<String>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📋 Every payload delivered so far, in arrival order.
    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn send(&self, payload: String) -> Result<(), DeliveryError> {
        debug!("🧠 InMemorySink stashing {} bytes", payload.len());
        self.received.lock().await.push(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_clones_share_the_vault() -> anyhow::Result<()> {
        let sink = InMemorySink::new();
        let peek = sink.clone();

        sink.send("[1]".to_string()).await?;
        sink.send("[2]".to_string()).await?;

        assert_eq!(peek.received().await, vec!["[1]".to_string(), "[2]".to_string()]);
        Ok(())
    }
}
