// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller shell: wires the router and the autonomy loop together.

use crate::outbound::Outbound;
use crate::router::{RestorePolicy, Router};
use crate::scheduler::{Autonomy, AutonomyConfig, AutonomySwitch};
use hp_adapters::{BusAdapter, BusMessage};
use hp_core::{Clock, Topology};
use hp_storage::StateStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Engine-level configuration.
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    pub autonomy: AutonomyConfig,
    pub restore: RestorePolicy,
}

/// The master controller: one router, one autonomy loop, one topology.
pub struct Controller<B, S, C> {
    router: Router<B, S>,
    autonomy: Autonomy<B, C>,
}

impl<B: BusAdapter, S: StateStore, C: Clock> Controller<B, S, C> {
    pub fn new(bus: B, store: S, clock: C, config: ControllerConfig) -> Self {
        let topology = Arc::new(Mutex::new(Topology::standard()));
        let outbound = Outbound::new(bus.clone());

        let autonomy =
            Autonomy::new(outbound.clone(), topology.clone(), clock, config.autonomy);
        let router =
            Router::new(bus, outbound, topology, store, autonomy.switch(), config.restore);

        Self { router, autonomy }
    }

    /// Handle for toggling the scheduler from outside.
    pub fn switch(&self) -> AutonomySwitch {
        self.autonomy.switch()
    }

    /// Run until cancelled or the inbound channel closes.
    ///
    /// The bus worker (this task) applies inbound messages one at a time;
    /// the autonomy loop ticks on its own task. A failure handling one
    /// message never takes down either.
    pub async fn run(self, mut inbound: mpsc::Receiver<BusMessage>, cancel: CancellationToken) {
        let Controller { router, autonomy } = self;

        router.connect().await;
        let tick = tokio::spawn(autonomy.run(cancel.clone()));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = inbound.recv() => match msg {
                    Some(msg) => router.on_message(msg).await,
                    None => {
                        tracing::info!("inbound channel closed, shutting down");
                        cancel.cancel();
                        break;
                    }
                },
            }
        }

        let _ = tick.await;
        tracing::info!("controller stopped");
    }
}
