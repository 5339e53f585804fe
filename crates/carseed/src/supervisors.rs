//! 🎬 *[camera pans across a lot full of freshly generated sedans]*
//! 🎬 "In a world where receivers go down at 3am..."
//! 🎬 "One supervisor dared to wire it all together."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor builds the sink and the dispatcher, starts the flush timer and the
//! source worker, waits for the shutdown signal, then tears everything down in the order
//! that loses nothing: producer first, timer second, drain last.
//!
//! ⚠️ Workers are the supervisor's private little minions. They stay `pub(crate)`.

pub(crate) mod workers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app_config::AppConfig;
use crate::backends::{Sink, SinkBackend};
use crate::dispatcher::Dispatcher;
use crate::generator::CarGenerator;
use crate::stats::StatisticsSnapshot;
use workers::{SourceWorker, Worker};

/// 📦 The Supervisor: because even async tasks need someone hovering over them.
pub(crate) struct Supervisor {
    app_config: AppConfig,
}

impl Supervisor {
    pub(crate) fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    /// 🧵 Run until `shutdown_signal` resolves, then drain and report.
    pub(crate) async fn run<F>(self, shutdown_signal: F) -> Result<StatisticsSnapshot>
    where
        F: Future<Output = ()>,
    {
        let sink = SinkBackend::from_config(&self.app_config.sink_config)
            .context("💀 Couldn't build the sink. The cars have nowhere to go.")?;
        self.run_with_sink(sink, shutdown_signal).await
    }

    async fn run_with_sink<S, F>(self, sink: S, shutdown_signal: F) -> Result<StatisticsSnapshot>
    where
        S: Sink + 'static,
        F: Future<Output = ()>,
    {
        let dispatcher = Dispatcher::new(self.app_config.dispatch.clone(), sink);
        dispatcher.start();

        let token = CancellationToken::new();
        let source = SourceWorker::new(
            CarGenerator::from_config(&self.app_config.source_config),
            Arc::clone(&dispatcher),
            Duration::from_millis(self.app_config.source_config.generation_interval_ms),
            token.clone(),
        )
        .start();

        shutdown_signal.await;
        info!("🛑 Shutdown requested. Stopping the car factory, then draining the buffer.");

        // -- 🧵 producer first: nothing new should land in the buffer while we drain it
        token.cancel();
        source
            .await
            .context("💀 SourceWorker panicked or was aborted on the way out")?
            .context("💀 SourceWorker failed")?;

        let remaining = dispatcher.shutdown().await;
        if remaining > 0 {
            warn!("⚠️ Exiting with {} undelivered cars in the buffer", remaining);
        }

        let statistics = dispatcher.statistics();
        info!("📊 Final statistics: {}", statistics);
        Ok(statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::{DispatchConfig, SourceConfig};
    use crate::backends::{HttpSinkConfig, InMemorySink, SinkConfig};
    use crate::common::Car;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_config_for(url: String) -> AppConfig {
        AppConfig {
            source_config: SourceConfig {
                generation_interval_ms: 5,
                seed: Some(42),
            },
            sink_config: SinkConfig::Http(HttpSinkConfig {
                url,
                api_key: "e2e".to_string(),
                ..HttpSinkConfig::default()
            }),
            dispatch: DispatchConfig {
                batch_size: 10,
                batch_interval_ms: 50,
                drain_backoff_ms: 10,
                ..DispatchConfig::default()
            },
        }
    }

    async fn received_batches(server: &MockServer) -> Vec<Vec<Car>> {
        server
            .received_requests()
            .await
            .expect("💀 request recording is on by default")
            .iter()
            .map(|request| {
                serde_json::from_slice(&request.body).expect("💀 body should be a JSON array of cars")
            })
            .collect()
    }

    #[tokio::test]
    async fn the_one_where_every_generated_car_reaches_the_receiver() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cars/bulk"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let statistics = Supervisor::new(app_config_for(format!("{}/cars/bulk", server.uri())))
            .run(tokio::time::sleep(Duration::from_millis(300)))
            .await?;

        let batches = received_batches(&server).await;
        let shipped: usize = batches.iter().map(Vec::len).sum();
        assert!(shipped > 0, "💀 300ms of production and nothing shipped?");
        assert!(batches.iter().all(|batch| batch.len() <= 10));
        assert_eq!(statistics.delivered, shipped as u64);
        assert_eq!(statistics.failed, 0);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_receiver_hiccups_once_and_nobody_gets_left_behind() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let statistics = Supervisor::new(app_config_for(format!("{}/cars/bulk", server.uri())))
            .run(tokio::time::sleep(Duration::from_millis(300)))
            .await?;

        let batches = received_batches(&server).await;
        let (rejected, accepted) = batches
            .split_first()
            .expect("💀 at least the rejected batch should have arrived");
        let accepted: Vec<&Car> = accepted.iter().flatten().collect();

        assert_eq!(statistics.failed, rejected.len() as u64);
        assert_eq!(statistics.delivered, accepted.len() as u64);
        for car in rejected {
            assert!(accepted.contains(&car), "💀 {car:?} was rejected once and never retried");
        }
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_dead_receiver_is_a_statistic_not_an_error() -> Result<()> {
        // 🧪 port 1: nobody home, connection refused on every attempt
        let mut app_config = app_config_for("http://127.0.0.1:1/cars/bulk".to_string());
        app_config.dispatch.max_drain_attempts = 2;

        let statistics = Supervisor::new(app_config)
            .run(tokio::time::sleep(Duration::from_millis(100)))
            .await?;

        assert_eq!(statistics.delivered, 0);
        assert!(statistics.failed > 0, "💀 nothing was even attempted?");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_in_memory_sink_keeps_everything() -> Result<()> {
        let sink = InMemorySink::new();
        let statistics = Supervisor::new(AppConfig {
            source_config: SourceConfig {
                generation_interval_ms: 5,
                seed: Some(3),
            },
            ..AppConfig::default()
        })
        .run_with_sink(sink.clone(), tokio::time::sleep(Duration::from_millis(100)))
        .await?;

        let kept: usize = sink
            .received()
            .await
            .iter()
            .map(|payload| serde_json::from_str::<Vec<Car>>(payload).map(|cars| cars.len()))
            .sum::<Result<usize, _>>()?;
        assert!(kept > 0);
        assert_eq!(statistics.delivered, kept as u64);
        Ok(())
    }
}
