//! Async actor owning a [`ChangeAccumulator`]
//!
//! The actor task is the accumulator's only owner, so observations from any
//! number of producers are serialized through its command channel in arrival
//! order. It also drives the idle-timeout flush: while a time window is open
//! it sleeps until the window's deadline and then asks the accumulator to
//! re-check its thresholds. Because the deadline is re-read from the
//! accumulator on every loop turn, a timer outliving its window simply
//! finds nothing to flush.

use super::{AccumulatorConfig, ChangeAccumulator, NarrationSink, TokioClock};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

enum Command {
    Observe(String),
    Flush(oneshot::Sender<bool>),
    Stop(oneshot::Sender<()>),
}

/// Handle to a running accumulator actor.
///
/// Dropping the handle stops the actor, which flushes anything pending.
#[derive(Debug)]
pub struct AccumulatorHandle {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl AccumulatorHandle {
    /// Spawn an actor on tokio's clock
    pub fn spawn(config: AccumulatorConfig, sink: impl NarrationSink + 'static) -> Self {
        let accumulator = ChangeAccumulator::with_clock(config, sink, Arc::new(TokioClock));
        Self::from_accumulator(accumulator)
    }

    /// Spawn an actor around an existing accumulator.
    ///
    /// The idle timer sleeps on tokio's clock, so the accumulator should use
    /// [`TokioClock`] for timeouts to line up under a paused test clock.
    pub fn from_accumulator(accumulator: ChangeAccumulator) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(accumulator, rx));
        Self { tx, task }
    }

    /// Queue a screen observation. Returns false once the actor has stopped.
    pub fn observe(&self, screen_text: impl Into<String>) -> bool {
        self.tx.send(Command::Observe(screen_text.into())).is_ok()
    }

    /// Flush pending content now; true if anything was delivered
    pub async fn force_flush(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Flush(reply)).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Flush pending content and wait for the actor to finish
    pub async fn stop(self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Stop(reply)).is_ok() {
            let _ = rx.await;
        }
        if let Err(e) = self.task.await {
            tracing::error!("Accumulator task failed: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

async fn run(mut accumulator: ChangeAccumulator, mut rx: mpsc::UnboundedReceiver<Command>) {
    loop {
        let deadline = accumulator.deadline().map(Instant::from_std);

        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Observe(text)) => {
                    accumulator.observe(&text);
                }
                Some(Command::Flush(reply)) => {
                    let _ = reply.send(accumulator.force_flush());
                }
                Some(Command::Stop(reply)) => {
                    accumulator.stop();
                    let _ = reply.send(());
                    break;
                }
                None => {
                    tracing::debug!("Accumulator handle dropped, stopping");
                    accumulator.stop();
                    break;
                }
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                accumulator.poll();
            }
        }
    }
}
