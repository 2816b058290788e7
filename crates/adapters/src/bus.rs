// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message-bus adapter.
//!
//! The broker client itself lives outside this repository; deployments
//! plug their transport in behind [`BusAdapter`]. Inbound traffic arrives
//! as [`BusMessage`]s on an mpsc channel owned by the transport, so the
//! controller's bus worker stays a plain receiver loop.

use async_trait::async_trait;
use thiserror::Error;

/// One inbound message from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub body: Vec<u8>,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { topic: topic.into(), body: body.into() }
    }
}

/// Errors from bus operations
#[derive(Debug, Error)]
pub enum BusError {
    #[error("publish failed: {0}")]
    PublishFailed(String),
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),
}

/// Adapter over the pub/sub transport.
///
/// Implementations must be safe for concurrent publish; the router and the
/// autonomy tick loop both hold clones.
#[async_trait]
pub trait BusAdapter: Clone + Send + Sync + 'static {
    async fn publish(&self, topic: &str, body: &str) -> Result<(), BusError>;
    async fn subscribe(&self, topic: &str) -> Result<(), BusError>;
    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError>;
}

/// Transport that accepts everything and delivers nothing.
///
/// Lets the daemon boot and the autonomy loop run without a broker; every
/// frame is traced so a local session can still be observed end to end.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBusAdapter;

impl NoopBusAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BusAdapter for NoopBusAdapter {
    async fn publish(&self, topic: &str, body: &str) -> Result<(), BusError> {
        tracing::debug!(%topic, %body, "-> (noop bus)");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        tracing::debug!(%topic, "subscribe (noop bus)");
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
        tracing::debug!(%topic, "unsubscribe (noop bus)");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{BusAdapter, BusError, BusMessage};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeBusState {
        publishes: Vec<(String, String)>,
        subscriptions: Vec<String>,
    }

    /// Fake bus for testing: records outbound traffic and the live
    /// subscription set, and can inject inbound messages.
    #[derive(Clone)]
    pub struct FakeBusAdapter {
        state: Arc<Mutex<FakeBusState>>,
        inbound: mpsc::Sender<BusMessage>,
    }

    impl FakeBusAdapter {
        /// Create the fake plus the inbound receiver the controller consumes.
        pub fn channel() -> (Self, mpsc::Receiver<BusMessage>) {
            let (inbound, rx) = mpsc::channel(64);
            (Self { state: Arc::new(Mutex::new(FakeBusState::default())), inbound }, rx)
        }

        /// Deliver an inbound message as the broker would.
        pub async fn inject(&self, topic: &str, body: &str) {
            let _ = self.inbound.send(BusMessage::new(topic, body.as_bytes())).await;
        }

        /// All recorded publishes, in order.
        pub fn publishes(&self) -> Vec<(String, String)> {
            self.state.lock().publishes.clone()
        }

        /// Bodies published to one topic, in order.
        pub fn published_to(&self, topic: &str) -> Vec<String> {
            self.state
                .lock()
                .publishes
                .iter()
                .filter(|(t, _)| t == topic)
                .map(|(_, body)| body.clone())
                .collect()
        }

        /// The current subscription set, insertion-ordered.
        pub fn subscriptions(&self) -> Vec<String> {
            self.state.lock().subscriptions.clone()
        }

        /// Drop every recorded publish (subscriptions stay).
        pub fn clear_publishes(&self) {
            self.state.lock().publishes.clear();
        }
    }

    #[async_trait]
    impl BusAdapter for FakeBusAdapter {
        async fn publish(&self, topic: &str, body: &str) -> Result<(), BusError> {
            self.state.lock().publishes.push((topic.to_string(), body.to_string()));
            Ok(())
        }

        async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
            let mut state = self.state.lock();
            if !state.subscriptions.iter().any(|t| t == topic) {
                state.subscriptions.push(topic.to_string());
            }
            Ok(())
        }

        async fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
            self.state.lock().subscriptions.retain(|t| t != topic);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBusAdapter;

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
