//! # sink
//!
//! Each sink drains its own unbounded queue on a blocking thread, so file
//! writes never run on the async workers. It sees every item once, in the
//! order it was published. A slow sink grows its queue; it never slows down
//! tick processing and never skips an item.

pub mod csv_recorder;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use csv_recorder::{EventRecorder, TickRecorder};

/// Something that consumes a stream of `T`.
pub trait Sink<T>: Send + 'static {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    fn deliver(&mut self, item: &T) -> anyhow::Result<()>;
}

/// Drive `sink` from `rx` until every sender is gone.
pub fn spawn_sink<T, S>(mut rx: mpsc::UnboundedReceiver<T>, mut sink: S) -> JoinHandle<()>
where
    T: Send + 'static,
    S: Sink<T>,
{
    tokio::task::spawn_blocking(move || {
        info!(sink = sink.name(), "Sink started");

        while let Some(item) = rx.blocking_recv() {
            if let Err(e) = sink.deliver(&item) {
                error!(sink = sink.name(), error = %e, "Sink delivery failed");
            }
        }

        info!(sink = sink.name(), "Sink stopped");
    })
}
