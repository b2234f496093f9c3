//! Frame relay hub.
//!
//! One producer publishes opaque binary frames; any number of consumers
//! receive them. The hub keeps only the most recent frame so a newly
//! connected consumer can render a picture immediately.
//!
//! Frame delivery is at-most-once. Each consumer owns a one-slot frame
//! queue: when the slot is still occupied the consumer is not ready and the
//! frame is skipped for it. A consumer whose queue is closed is dropped from
//! the fan-out set.
//!
//! The offline signal travels beside the frame queue and always arrives. A
//! frame still queued when it is raised is discarded, so the last thing a
//! consumer sees of a departed producer is the signal.

use crate::observability::metrics;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Text sentinel sent to consumers when the producer goes away.
pub const OFFLINE_SENTINEL: &str = "relay_offline";

const CONSUMER_QUEUE_CAPACITY: usize = 1;

/// Message delivered to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    Frame(Bytes),
    /// The producer disconnected; the retained frame was cleared.
    Offline,
}

/// Registration of the active producer.
#[derive(Debug)]
pub struct ProducerHandle {
    pub id: Uuid,
    /// Cancelled when a newer producer supersedes this one or the hub shuts
    /// down.
    pub cancel: CancellationToken,
}

/// Registration of one consumer.
#[derive(Debug)]
pub struct ConsumerHandle {
    pub id: Uuid,
    /// Retained frame at subscription time, to send before anything else.
    pub initial_frame: Option<Bytes>,
    frames: mpsc::Receiver<Bytes>,
    offline: Arc<Notify>,
}

impl ConsumerHandle {
    /// Next message for this consumer.
    ///
    /// A pending offline signal takes priority and discards any queued
    /// frame. Returns `None` once the hub has dropped the consumer.
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<RelayMessage> {
        tokio::select! {
            biased;
            () = self.offline.notified() => {
                while self.frames.try_recv().is_ok() {}
                Some(RelayMessage::Offline)
            }
            frame = self.frames.recv() => frame.map(RelayMessage::Frame),
        }
    }
}

#[derive(Debug)]
struct ConsumerSlot {
    frames: mpsc::Sender<Bytes>,
    offline: Arc<Notify>,
}

/// Point-in-time relay status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub viewers: usize,
    pub relay_connected: bool,
    pub has_frame: bool,
}

#[derive(Debug)]
struct ActiveProducer {
    id: Uuid,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct RelayState {
    latest_frame: Option<Bytes>,
    consumers: HashMap<Uuid, ConsumerSlot>,
    producer: Option<ActiveProducer>,
}

impl RelayState {
    /// Offer a frame to every ready consumer, dropping closed ones.
    ///
    /// Returns the number of consumers that accepted it.
    fn fan_out(&mut self, frame: &Bytes) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, slot) in &self.consumers {
            match slot.frames.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        self.remove_consumers(&closed);
        delivered
    }

    /// Raise the offline signal for every live consumer.
    ///
    /// Returns the number of consumers signalled.
    fn signal_offline(&mut self) -> usize {
        let closed: Vec<Uuid> = self
            .consumers
            .iter()
            .filter(|(_, slot)| slot.frames.is_closed())
            .map(|(id, _)| *id)
            .collect();
        self.remove_consumers(&closed);

        for slot in self.consumers.values() {
            slot.offline.notify_one();
        }
        self.consumers.len()
    }

    fn remove_consumers(&mut self, ids: &[Uuid]) {
        if ids.is_empty() {
            return;
        }
        for id in ids {
            self.consumers.remove(id);
        }
        metrics::set_relay_viewers(self.consumers.len());
    }
}

/// Owned relay state shared by the producer and consumer endpoints.
#[derive(Debug)]
pub struct RelayHub {
    state: Mutex<RelayState>,
    shutdown: CancellationToken,
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a producer, superseding (and cancelling) any previous one.
    pub async fn attach_producer(&self) -> ProducerHandle {
        let id = Uuid::new_v4();
        let cancel = self.shutdown.child_token();

        let previous = {
            let mut state = self.state.lock().await;
            state.producer.replace(ActiveProducer {
                id,
                cancel: cancel.clone(),
            })
        };

        if let Some(previous) = previous {
            tracing::info!(
                target: "facility.relay",
                producer_id = %previous.id,
                superseded_by = %id,
                "Relay producer superseded"
            );
            previous.cancel.cancel();
        }

        metrics::set_relay_producer_connected(true);
        tracing::info!(target: "facility.relay", producer_id = %id, "Relay producer attached");

        ProducerHandle { id, cancel }
    }

    /// Retain `frame` and forward it to every ready consumer.
    ///
    /// Ignored (returns `false`) unless `producer_id` is the active producer.
    pub async fn publish_frame(&self, producer_id: Uuid, frame: Bytes) -> bool {
        let mut state = self.state.lock().await;

        if state.producer.as_ref().map(|p| p.id) != Some(producer_id) {
            return false;
        }

        state.latest_frame = Some(frame.clone());
        let delivered = state.fan_out(&frame);
        drop(state);

        metrics::record_relay_frame();
        tracing::trace!(target: "facility.relay", delivered, "Frame relayed");
        true
    }

    /// Unregister a producer after its connection ended.
    ///
    /// When it is still the active producer the retained frame is cleared
    /// and consumers are told the relay is offline. A superseded producer's
    /// departure changes nothing.
    pub async fn detach_producer(&self, producer_id: Uuid) -> bool {
        let mut state = self.state.lock().await;

        if state.producer.as_ref().map(|p| p.id) != Some(producer_id) {
            return false;
        }

        state.producer = None;
        state.latest_frame = None;
        let notified = state.signal_offline();
        drop(state);

        metrics::set_relay_producer_connected(false);
        tracing::info!(
            target: "facility.relay",
            producer_id = %producer_id,
            notified,
            "Relay producer detached"
        );
        true
    }

    /// Register a consumer.
    pub async fn subscribe(&self) -> ConsumerHandle {
        let id = Uuid::new_v4();
        let (tx, frames) = mpsc::channel(CONSUMER_QUEUE_CAPACITY);
        let offline = Arc::new(Notify::new());

        let (initial_frame, viewers) = {
            let mut state = self.state.lock().await;
            state.consumers.insert(
                id,
                ConsumerSlot {
                    frames: tx,
                    offline: Arc::clone(&offline),
                },
            );
            (state.latest_frame.clone(), state.consumers.len())
        };

        metrics::set_relay_viewers(viewers);
        tracing::debug!(
            target: "facility.relay",
            consumer_id = %id,
            viewers,
            "Relay viewer connected"
        );

        ConsumerHandle {
            id,
            initial_frame,
            frames,
            offline,
        }
    }

    /// Remove a consumer from the fan-out set.
    pub async fn unsubscribe(&self, consumer_id: Uuid) {
        let viewers = {
            let mut state = self.state.lock().await;
            state.consumers.remove(&consumer_id);
            state.consumers.len()
        };

        metrics::set_relay_viewers(viewers);
        tracing::debug!(
            target: "facility.relay",
            consumer_id = %consumer_id,
            viewers,
            "Relay viewer disconnected"
        );
    }

    pub async fn stats(&self) -> RelayStats {
        let state = self.state.lock().await;
        RelayStats {
            viewers: state.consumers.len(),
            relay_connected: state.producer.is_some(),
            has_frame: state.latest_frame.is_some(),
        }
    }

    /// Token cancelled when the hub shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel the active producer and signal every connection to close.
    pub fn shutdown(&self) {
        tracing::info!(target: "facility.relay", "Relay hub shutting down");
        self.shutdown.cancel();
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}
