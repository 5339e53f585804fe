//! 🎬 *[the buffer fills. fifty cars. a timer ticks somewhere.]*
//! *[one flag stands between the producer and a second concurrent POST.]*
//! *["Not today," says the AtomicBool.]*
//!
//! 🪣 The Dispatcher. The only part of carseed with real state and real failure handling.
//!
//! 🧠 Knowledge graph:
//! - `accept` appends and, when the buffer hits `batch_size` with nothing in flight,
//!   spawns a detached flush. It never awaits anything. The producer keeps producing.
//! - `flush` is the single state transition. It takes the in-flight flag with a
//!   compare-exchange (try-lock, never a wait), detaches up to `batch_size` records
//!   from the head, serializes them as a JSON array and hands them to the [`Sink`].
//!   Accepted → counted and gone. Anything else → back to the tail, counted as failed.
//! - A periodic [`FlushTicker`] calls `flush_on_timer` every `batch_interval_ms` so a
//!   slow trickle of cars still ships.
//! - `shutdown` stops the ticker for good, then drains until the buffer is empty or the
//!   attempt budget runs out. A flush that is already in flight gets waited on, not
//!   counted as a failure.
//!
//! ⚠️ Ordering across retries is not guaranteed. Requeued batches go to the tail.
//! Nothing is deduplicated. The buffer has no ceiling: if the receiver stays down,
//! memory grows. That's the trade: RAM for cars. 🦆

mod buffer;

use std::fmt;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::app_config::DispatchConfig;
use crate::backends::Sink;
use crate::errors::{DeliveryError, FailureKind};
use crate::stats::{Statistics, StatisticsSnapshot};
use crate::supervisors::workers::{FlushTicker, Worker};
use buffer::BatchBuffer;

/// 🏁 What a single call to [`Dispatcher::flush`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// 🔒 Another flush holds the flag. Nothing happened.
    AlreadyInFlight,
    /// 💤 Buffer was empty. Nothing happened.
    Empty,
    /// ✅ This many records were accepted by the sink.
    Delivered(usize),
    /// 🔁 This many records went back to the buffer.
    Requeued { records: usize, kind: FailureKind },
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Size,
    Timer,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Size => f.write_str("size"),
            Trigger::Timer => f.write_str("timer"),
        }
    }
}

#[derive(Debug)]
enum TickerState {
    Idle,
    Running {
        token: CancellationToken,
        handle: JoinHandle<anyhow::Result<()>>,
    },
    Stopped,
}

/// 🚩 The in-flight flag, plus what the drain needs to know about whoever holds it:
/// how many records are out on the wire, and a way to hear when they land.
#[derive(Debug, Default)]
struct InFlight {
    flag: AtomicBool,
    records: AtomicUsize,
    settled: Notify,
}

impl InFlight {
    fn try_acquire(&self) -> Option<InFlightGuard<'_>> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(self))
    }

    fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn records(&self) -> usize {
        if self.is_set() {
            self.records.load(Ordering::Acquire)
        } else {
            0
        }
    }

    /// ⏳ Resolves once the current holder lets go. Right away if nobody holds the flag.
    async fn settled(&self) {
        // -- 🔔 register before checking the flag, or a release in between goes unheard
        let mut notified = pin!(self.settled.notified());
        notified.as_mut().enable();
        if self.is_set() {
            notified.await;
        }
    }
}

/// 🚩 Holds the in-flight flag for exactly as long as it lives.
///
/// Dropping it clears the flag and wakes anyone waiting on [`InFlight::settled`], so a
/// cancelled or panicking flush can't wedge the dispatcher.
struct InFlightGuard<'a>(&'a InFlight);

impl InFlightGuard<'_> {
    fn carrying(&self, records: usize) {
        self.0.records.store(records, Ordering::Release);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.records.store(0, Ordering::Release);
        self.0.flag.store(false, Ordering::Release);
        self.0.settled.notify_waiters();
    }
}

// -- 📊 batches add up to batch_size at a time, so "landed exactly on a multiple" would miss most milestones
fn crosses_milestone(before: u64, added: u64, every: u64) -> bool {
    (before + added) / every > before / every
}

/// 🪣 Buffers records and ships them to a [`Sink`] by size or by time, whichever comes first.
#[derive(Debug)]
pub struct Dispatcher<R, S> {
    buffer: BatchBuffer<R>,
    in_flight: InFlight,
    sink: S,
    stats: Statistics,
    config: DispatchConfig,
    ticker: Mutex<TickerState>,
}

impl<R, S> Dispatcher<R, S>
where
    R: Serialize + Send + 'static,
    S: Sink + 'static,
{
    /// 🏗️ Buffer, flag and statistics are born here and live as long as the dispatcher.
    ///
    /// The timer does not start until [`Dispatcher::start`]. A zero `batch_size` or
    /// `stats_log_every` is bumped to 1: a batch of nothing would never leave the buffer.
    pub fn new(mut config: DispatchConfig, sink: S) -> Arc<Self> {
        if config.batch_size == 0 {
            warn!("⚠️ batch_size 0 would never detach a single car. Using 1.");
            config.batch_size = 1;
        }
        config.stats_log_every = config.stats_log_every.max(1);
        info!(
            "🪣 Batch size: {}, Batch interval: {}ms",
            config.batch_size, config.batch_interval_ms
        );
        Arc::new(Self {
            buffer: BatchBuffer::new(),
            in_flight: InFlight::default(),
            sink,
            stats: Statistics::new(),
            config,
            ticker: Mutex::new(TickerState::Idle),
        })
    }

    /// 🚀 Start the periodic flush timer. Only the first call does anything, and never after shutdown.
    pub fn start(self: &Arc<Self>) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        match *ticker {
            TickerState::Idle => {
                let token = CancellationToken::new();
                let handle = FlushTicker::new(
                    Arc::downgrade(self),
                    Duration::from_millis(self.config.batch_interval_ms),
                    token.clone(),
                )
                .start();
                *ticker = TickerState::Running { token, handle };
                debug!("⏱️ Flush timer started");
            }
            TickerState::Running { .. } => debug!("⏱️ Flush timer already running"),
            TickerState::Stopped => debug!("⏱️ Dispatcher is shut down, not starting a timer"),
        }
    }

    /// 📥 Take a record. Never fails, never blocks on I/O.
    ///
    /// Reaching `batch_size` spawns a flush on the current tokio runtime. Outside of one the
    /// record just waits in the buffer for the timer or the drain.
    pub fn accept(self: &Arc<Self>, record: R) {
        let buffered = self.buffer.push(record);
        if buffered >= self.config.batch_size && !self.in_flight.is_set() {
            self.spawn_flush(Trigger::Size);
        }
    }

    /// ⏱️ Timer entry point. Same guarded flush, fired and forgotten.
    pub fn flush_on_timer(self: &Arc<Self>) {
        if self.in_flight.is_set() || self.buffer.is_empty() {
            trace!("⏱️ Tick skipped: flush in flight or nothing buffered");
            return;
        }
        self.spawn_flush(Trigger::Timer);
    }

    fn spawn_flush(self: &Arc<Self>, trigger: Trigger) {
        let Ok(runtime) = Handle::try_current() else {
            debug!("🧵 No tokio runtime here, {} flush left for the next tick or the drain", trigger);
            return;
        };
        let dispatcher = Arc::clone(self);
        runtime.spawn(async move {
            let outcome = dispatcher.flush().await;
            trace!("🏁 {} flush finished: {:?}", trigger, outcome);
        });
    }

    /// 🚚 One delivery attempt for up to `batch_size` records from the head of the buffer.
    ///
    /// Returns right away if another flush is in flight or there is nothing to send.
    pub async fn flush(&self) -> FlushOutcome {
        // -- 🔒 declared before the batch so it drops after it: records are home before the flag clears
        let Some(in_flight) = self.in_flight.try_acquire() else {
            return FlushOutcome::AlreadyInFlight;
        };
        let Some(batch) = self.buffer.detach(self.config.batch_size) else {
            return FlushOutcome::Empty;
        };

        let records = batch.len();
        in_flight.carrying(records);
        let payload = serde_json::to_string(batch.records());
        let result = match payload {
            Ok(payload) => self.sink.send(payload).await,
            Err(err) => Err(DeliveryError::RequestConstruction {
                reason: err.to_string(),
            }),
        };

        match result {
            Ok(()) => {
                batch.delivered();
                in_flight.carrying(0);
                let before = self.stats.record_delivered(records);
                debug!("✅ Successfully sent batch of {} records to receiver", records);
                self.log_statistics_on_milestone(before, records as u64);
                FlushOutcome::Delivered(records)
            }
            Err(err) => {
                batch.requeue();
                in_flight.carrying(0);
                self.stats.record_failed(records);
                let kind = err.kind();
                log_delivery_failure(&err, records);
                FlushOutcome::Requeued { records, kind }
            }
        }
    }

    fn log_statistics_on_milestone(&self, before: u64, added: u64) {
        if crosses_milestone(before, added, self.config.stats_log_every) {
            info!("📊 Statistics: {}", self.stats.snapshot());
        }
    }

    /// 🛑 Stop the timer for good, then drain what's left.
    ///
    /// Keeps flushing while batches get delivered. A flush that is already in flight is
    /// waited on for up to `settle_timeout_ms`; that wait is free. Failed deliveries, and
    /// in-flight flushes that never settle, count against `max_drain_attempts` with
    /// `drain_backoff_ms` between them. Returns how many records are still undelivered,
    /// buffered or on the wire (0 = fully drained). Safe to call more than once.
    pub async fn shutdown(&self) -> usize {
        let ticker = {
            let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *ticker, TickerState::Stopped)
        };
        if let TickerState::Running { token, handle } = ticker {
            token.cancel();
            match handle.await {
                Ok(Ok(())) => debug!("⏱️ Flush timer stopped"),
                Ok(Err(err)) => warn!("⚠️ Flush timer exited with an error: {:#}", err),
                Err(err) => warn!("⚠️ Flush timer task did not join cleanly: {}", err),
            }
        }

        self.drain().await
    }

    async fn drain(&self) -> usize {
        let pending = self.buffer.len();
        if pending > 0 {
            info!("🧹 Flushing {} remaining records...", pending);
        }

        let backoff = Duration::from_millis(self.config.drain_backoff_ms);
        let settle_timeout = Duration::from_millis(self.config.settle_timeout_ms);
        let mut unsuccessful = 0u32;
        loop {
            match self.flush().await {
                FlushOutcome::Empty => return 0,
                FlushOutcome::Delivered(_) => continue,
                FlushOutcome::AlreadyInFlight => {
                    // -- ⏳ someone else's batch is on the wire. a slow receiver isn't a failed one.
                    if tokio::time::timeout(settle_timeout, self.in_flight.settled())
                        .await
                        .is_ok()
                    {
                        continue;
                    }
                    warn!(
                        "⚠️ In-flight batch of {} records still unsettled after {:?}",
                        self.in_flight.records(),
                        settle_timeout
                    );
                }
                FlushOutcome::Requeued { .. } => {}
            }

            unsuccessful += 1;
            if unsuccessful >= self.config.max_drain_attempts {
                let remaining = self.undelivered_len();
                warn!(
                    "⚠️ Gave up draining after {} unsuccessful attempts, {} records still undelivered. They will not survive the exit.",
                    unsuccessful, remaining
                );
                return remaining;
            }
            tokio::time::sleep(backoff).await;
        }
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// 📡 Records detached by the flush currently on the wire. 0 when nothing is in flight.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.records()
    }

    /// 🧮 Buffered plus in flight: everything not yet accepted by the sink.
    pub fn undelivered_len(&self) -> usize {
        self.buffer.len() + self.in_flight.records()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_set()
    }
}

impl<R: Clone, S> Dispatcher<R, S> {
    /// 📋 Copy of the buffer, head first.
    pub fn buffered(&self) -> Vec<R> {
        self.buffer.snapshot()
    }
}

fn log_delivery_failure(err: &DeliveryError, records: usize) {
    match err {
        DeliveryError::Status { status, body } => error!(
            "💀 Receiver responded with error: {} - {}. Batch of {} records will be retried.",
            status, body, records
        ),
        DeliveryError::NoResponse { endpoint, source } => error!(
            "💀 No response from receiver endpoint: {} ({}). Batch of {} records will be retried.",
            endpoint, source, records
        ),
        DeliveryError::RequestConstruction { reason } => error!(
            "💀 Error setting up request: {}. Batch of {} records will be retried.",
            reason, records
        ),
    }
}
