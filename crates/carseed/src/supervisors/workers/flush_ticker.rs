//! ⏱️ The FlushTicker: a metronome with exactly one opinion: "ship it."
//!
//! It holds only a `Weak` to the dispatcher, so a ticker can't keep its own
//! dispatcher alive. Once the token is cancelled and the handle awaited, no further
//! tick will ever reach `flush_on_timer`.

use std::sync::Weak;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::Worker;
use crate::backends::Sink;
use crate::dispatcher::Dispatcher;

pub(crate) struct FlushTicker<R, S> {
    dispatcher: Weak<Dispatcher<R, S>>,
    period: Duration,
    token: CancellationToken,
}

impl<R, S> FlushTicker<R, S> {
    pub(crate) fn new(
        dispatcher: Weak<Dispatcher<R, S>>,
        period: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            dispatcher,
            period,
            token,
        }
    }
}

impl<R, S> Worker for FlushTicker<R, S>
where
    R: Serialize + Send + 'static,
    S: Sink + 'static,
{
    fn start(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            // -- ⏱️ first tick one full period from now, not immediately
            let mut ticks = interval_at(Instant::now() + self.period, self.period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => {
                        debug!("⏱️ FlushTicker: cancelled. Hanging up the metronome.");
                        return Ok(());
                    }
                    _ = ticks.tick() => {
                        let Some(dispatcher) = self.dispatcher.upgrade() else {
                            debug!("⏱️ FlushTicker: dispatcher is gone, nothing left to nudge.");
                            return Ok(());
                        };
                        trace!("⏱️ tick");
                        dispatcher.flush_on_timer();
                    }
                }
            }
        })
    }
}
