//! 🧵 Workers: the background loops that actually do things while the Supervisor
//! takes all the credit in the sprint retro.
//!
//! - [`SourceWorker`] rolls a car every `generation_interval_ms` and hands it to the dispatcher.
//! - [`FlushTicker`] nudges the dispatcher every `batch_interval_ms`.
//!
//! Both stop when their `CancellationToken` fires. Neither ever awaits a delivery.

use anyhow::Result;
use tokio::task::JoinHandle;

mod flush_ticker;
mod source_worker;

pub(crate) use flush_ticker::FlushTicker;
pub(crate) use source_worker::SourceWorker;

/// 🏗️ A background worker, that does work. duh.
pub(crate) trait Worker {
    /// 🚀 Spawn the loop. The handle resolves once the worker has stopped.
    fn start(self) -> JoinHandle<Result<()>>;
}
