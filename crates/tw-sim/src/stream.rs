//! Stream Hub: push-only, single-subscriber-per-simulation event delivery.
//! `status`/`complete`/`error` are delivered strictly — never dropped —
//! while `live_data` uses overwrite-newest semantics so a slow subscriber
//! can never back-pressure the simulation loop.
//!
//! Split into a bounded control channel for events that must all arrive,
//! plus a `watch` channel (bounded to its latest value by construction)
//! for the high-frequency payload that's fine to coalesce.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::snapshot::LiveSnapshot;

/// A strictly-delivered control event. Generic over `C`, the caller's
/// completion payload (the orchestrator's `final_metrics` response shape),
/// so this module stays ignorant of HTTP/JSON concerns.
#[derive(Clone, Debug)]
pub enum StreamEvent<C> {
    /// Human-readable progress line (the periodic log cadence, and
    /// provider-fallback notices).
    Status(String),
    /// Final response; terminates the stream.
    Complete(C),
    /// Fatal error message; terminates the stream.
    Error(String),
}

/// One event observed by a subscriber: either a strictly-delivered control
/// event or the latest live snapshot, biased toward control events so
/// `status` always precedes the first `live_data`.
#[derive(Clone, Debug)]
pub enum StreamMessage<C> {
    Control(StreamEvent<C>),
    Live(Arc<LiveSnapshot>),
}

/// Producer handle, owned by the simulation loop's driving task.
pub struct StreamHub<C> {
    control_tx: mpsc::UnboundedSender<StreamEvent<C>>,
    live_tx: watch::Sender<Option<Arc<LiveSnapshot>>>,
    cancel: CancellationToken,
}

/// Consumer handle, owned by the HTTP layer's SSE response task.
pub struct StreamSubscriber<C> {
    control_rx: mpsc::UnboundedReceiver<StreamEvent<C>>,
    live_rx: watch::Receiver<Option<Arc<LiveSnapshot>>>,
    cancel: CancellationToken,
}

/// Create a linked producer/subscriber pair for a single simulation run.
pub fn channel<C>() -> (StreamHub<C>, StreamSubscriber<C>) {
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (live_tx, live_rx) = watch::channel(None);
    let cancel = CancellationToken::new();

    (
        StreamHub { control_tx, live_tx, cancel: cancel.clone() },
        StreamSubscriber { control_rx, live_rx, cancel },
    )
}

impl<C> StreamHub<C> {
    /// Push a strictly-delivered status line. No-op if the subscriber has
    /// already disconnected.
    pub fn status(&self, message: impl Into<String>) {
        let _ = self.control_tx.send(StreamEvent::Status(message.into()));
    }

    /// Publish a live snapshot; overwrites whatever the subscriber hasn't
    /// yet consumed rather than queuing, keeping only the latest snapshot.
    pub fn publish_live(&self, snapshot: LiveSnapshot) {
        let _ = self.live_tx.send(Some(Arc::new(snapshot)));
    }

    /// Terminate the stream successfully. Consumes `self` — no further
    /// events can be sent afterward, so exactly one terminal event is
    /// ever delivered.
    pub fn complete(self, payload: C) {
        let _ = self.control_tx.send(StreamEvent::Complete(payload));
    }

    /// Terminate the stream with a fatal error.
    pub fn error(self, message: impl Into<String>) {
        let _ = self.control_tx.send(StreamEvent::Error(message.into()));
    }

    /// `true` once the subscriber has disconnected or explicitly cancelled;
    /// the simulation loop polls this once per tick.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<C> StreamSubscriber<C> {
    /// Await the next message, biased so a pending control event is always
    /// observed before a live-data update — this is what guarantees
    /// `status` precedes the first `live_data`.
    ///
    /// Returns `None` once the hub has dropped and no control event
    /// remains, i.e. the run ended without an explicit terminal event
    /// (should not happen in practice, but is not a panic).
    pub async fn recv(&mut self) -> Option<StreamMessage<C>> {
        tokio::select! {
            biased;

            msg = self.control_rx.recv() => msg.map(StreamMessage::Control),

            Ok(()) = self.live_rx.changed() => {
                let snapshot = self.live_rx.borrow_and_update().clone();
                snapshot.map(StreamMessage::Live)
            }
        }
    }

    /// Signal cancellation. The simulation loop observes this via
    /// `StreamHub::is_cancelled` at the next tick boundary and stops.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<C> Drop for StreamSubscriber<C> {
    /// A disconnected subscriber (client closed the SSE connection, task
    /// dropped) cancels the run implicitly — the orchestrator never blocks
    /// waiting on a consumer that is gone.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CongestionSegmentLevel, LiveSnapshot};

    fn sample_snapshot(t: u64) -> LiveSnapshot {
        LiveSnapshot {
            timestamp_s: t,
            vehicles: Vec::new(),
            congestion_segments: Vec::new(),
            total_vehicles: 0,
            average_speed: 0.0,
        }
    }

    #[tokio::test]
    async fn status_precedes_live_data() {
        let (hub, mut sub) = channel::<String>();
        hub.status("starting");
        hub.publish_live(sample_snapshot(0));

        match sub.recv().await {
            Some(StreamMessage::Control(StreamEvent::Status(s))) => assert_eq!(s, "starting"),
            other => panic!("expected status first, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn live_data_overwrites_rather_than_queues() {
        let (hub, mut sub) = channel::<String>();
        hub.publish_live(sample_snapshot(0));
        hub.publish_live(sample_snapshot(10));

        match sub.recv().await {
            Some(StreamMessage::Live(snap)) => assert_eq!(snap.timestamp_s, 10),
            other => panic!("expected the latest snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_terminates_the_stream() {
        let (hub, mut sub) = channel::<String>();
        hub.complete("done".to_string());

        match sub.recv().await {
            Some(StreamMessage::Control(StreamEvent::Complete(payload))) => assert_eq!(payload, "done"),
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropping_subscriber_signals_cancellation() {
        let (hub, sub) = channel::<String>();
        assert!(!hub.is_cancelled());
        drop(sub);
        assert!(hub.is_cancelled());
    }
}
