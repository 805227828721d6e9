//! Per-session narration pipeline
//!
//! A [`NarrationSession`] ties one subscribed session on a
//! [`TransportClient`] to its own [`VirtualTerminal`] and accumulator actor:
//!
//! ```text
//! snapshot frame ──► BufferSnapshot::to_text ──┐
//!                                               ├──► AccumulatorHandle ──► sink
//! output frame ───► VirtualTerminal::text ─────┘
//! ```
//!
//! Events are pumped through a single task, so observations reach the
//! accumulator in arrival order.

use crate::accumulator::task::AccumulatorHandle;
use crate::accumulator::{AccumulatorConfig, NarrationSink};
use crate::emulator::VirtualTerminal;
use crate::streaming::{SessionEvent, TransportClient};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Input {
    Event(SessionEvent),
    Flush(oneshot::Sender<bool>),
    Stop,
}

/// One monitored session
#[derive(Debug)]
pub struct NarrationSession {
    session_id: String,
    tx: mpsc::UnboundedSender<Input>,
    pump: JoinHandle<()>,
}

impl NarrationSession {
    /// Subscribe to `session_id` on `client` and start narrating it
    pub fn attach(
        client: &TransportClient,
        session_id: impl Into<String>,
        config: AccumulatorConfig,
        sink: impl NarrationSink + 'static,
    ) -> Self {
        let session_id = session_id.into();
        let accumulator = AccumulatorHandle::spawn(config, sink);
        let (tx, rx) = mpsc::unbounded_channel();

        let events = tx.clone();
        client.subscribe_events(session_id.clone(), move |event| {
            let _ = events.send(Input::Event(event));
        });

        let pump = tokio::spawn(pump(session_id.clone(), rx, accumulator));
        Self {
            session_id,
            tx,
            pump,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Flush pending narration now, after everything already received
    pub async fn force_flush(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Input::Flush(reply)).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Unsubscribe, flush what is pending and tear the pipeline down
    pub async fn detach(self, client: &TransportClient) {
        client.unsubscribe(&self.session_id);
        let _ = self.tx.send(Input::Stop);
        if let Err(e) = self.pump.await {
            tracing::error!(session = %self.session_id, "Session pump failed: {}", e);
        }
    }
}

async fn pump(
    session_id: String,
    mut rx: mpsc::UnboundedReceiver<Input>,
    accumulator: AccumulatorHandle,
) {
    let mut terminal = VirtualTerminal::default();

    while let Some(input) = rx.recv().await {
        match input {
            Input::Event(SessionEvent::Snapshot(snapshot)) => {
                if snapshot.bell {
                    tracing::debug!(session = %session_id, "Bell");
                }
                accumulator.observe(snapshot.to_text());
            }
            Input::Event(SessionEvent::Output(data)) => {
                terminal.process(data.as_bytes());
                accumulator.observe(terminal.text());
            }
            Input::Event(SessionEvent::Resize { cols, rows }) => {
                tracing::debug!(session = %session_id, cols, rows, "Resizing emulator");
                terminal.resize(cols as usize, rows as usize);
            }
            Input::Flush(reply) => {
                let _ = reply.send(accumulator.force_flush().await);
            }
            Input::Stop => break,
        }
    }

    accumulator.stop().await;
    tracing::info!(session = %session_id, "Session detached");
}
