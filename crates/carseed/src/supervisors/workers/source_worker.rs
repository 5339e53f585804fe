//! 🚗 The SourceWorker, the assembly line at the front of the pipeline.
//!
//! One car per tick, straight into `Dispatcher::accept`. `accept` can't fail and
//! can't block, so this loop never notices whether the receiver is up, down, or on fire.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::Worker;
use crate::backends::Sink;
use crate::common::Car;
use crate::dispatcher::Dispatcher;
use crate::generator::CarGenerator;

pub(crate) struct SourceWorker<S> {
    generator: CarGenerator,
    dispatcher: Arc<Dispatcher<Car, S>>,
    period: Duration,
    token: CancellationToken,
}

impl<S> SourceWorker<S> {
    pub(crate) fn new(
        generator: CarGenerator,
        dispatcher: Arc<Dispatcher<Car, S>>,
        period: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            generator,
            dispatcher,
            period,
            token,
        }
    }
}

impl<S: Sink + 'static> Worker for SourceWorker<S> {
    fn start(mut self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            debug!("🚗 SourceWorker started: one car every {:?}", self.period);
            let mut ticks = interval(self.period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut produced = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => {
                        debug!("🏁 SourceWorker: cancelled after producing {} cars.", produced);
                        return Ok(());
                    }
                    _ = ticks.tick() => {
                        let car = self.generator.next_car();
                        trace!("🚗 {:?}", car);
                        self.dispatcher.accept(car);
                        produced += 1;
                    }
                }
            }
        })
    }
}
