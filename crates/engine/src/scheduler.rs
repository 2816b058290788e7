// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Autonomy scheduler.
//!
//! A cooperative tick loop: each tick may run the interval checks (which
//! enqueue jobs) and then advances the head job by at most one action:
//! promote, publish, kill, or confirm-and-step. Receipts land in the
//! topology on the bus worker; this loop only ever reads them.

use crate::outbound::Outbound;
use crate::placement;
use crate::queue::JobQueue;
use hp_adapters::BusAdapter;
use hp_core::payload::Payload;
use hp_core::{Clock, EntityKind, Job, JobState, Step, Topology};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Unique id of the inspection logic controller.
pub const PLANT_INFORMATION_ID: &str = "floor_1/plant_information_node/plant_information";
/// Unique id of the plant mover.
pub const PLANT_MOVER_ID: &str = "floor_1/plant_mover_node/plant_mover";

/// Inspection sweeps the camera over these positions.
const INSPECTION_POSITIONS: [u32; 4] = [5, 6, 7, 8];
/// Camera settle time after each inspection position confirms.
const INSPECTION_SETTLE: Duration = Duration::from_secs(10);
/// Migration program, highest position first so target slots free up
/// before the plants below them move.
const MOVE_PROGRAM: [(u32, u32); 4] = [(8, 12), (7, 11), (6, 10), (5, 9)];
/// Mechanical moves are slow; both programs get a generous deadline.
const PROGRAM_DEADLINE: Duration = Duration::from_secs(240);

/// Shared on/off handle; the router flips it on GUI toggle commands.
#[derive(Clone)]
pub struct AutonomySwitch {
    enabled: Arc<AtomicBool>,
}

impl AutonomySwitch {
    pub fn new(enabled: bool) -> Self {
        Self { enabled: Arc::new(AtomicBool::new(enabled)) }
    }

    pub fn set(&self, on: bool) {
        self.enabled.store(on, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

/// Scheduler timing and the lighting day window.
#[derive(Debug, Clone)]
pub struct AutonomyConfig {
    /// Tick interval.
    pub wait: Duration,
    /// How often the interval checks run.
    pub interval_check: Duration,
    /// Lights are on when `day_start_hour < hour < day_end_hour`,
    /// both comparisons strict.
    pub day_start_hour: u32,
    pub day_end_hour: u32,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(1),
            interval_check: Duration::from_secs(60),
            day_start_hour: 7,
            day_end_hour: 21,
        }
    }
}

/// The autonomy run loop. Defaults to enabled.
pub struct Autonomy<B, C> {
    outbound: Outbound<B>,
    topology: Arc<Mutex<Topology>>,
    clock: C,
    config: AutonomyConfig,
    switch: AutonomySwitch,
    queue: JobQueue,
    last_interval_check: Option<Instant>,
    // once-per-session latches
    inspection_queued: bool,
    movement_queued: bool,
}

impl<B: BusAdapter, C: Clock> Autonomy<B, C> {
    pub fn new(
        outbound: Outbound<B>,
        topology: Arc<Mutex<Topology>>,
        clock: C,
        config: AutonomyConfig,
    ) -> Self {
        Self {
            outbound,
            topology,
            clock,
            config,
            switch: AutonomySwitch::new(true),
            queue: JobQueue::new(),
            last_interval_check: None,
            inspection_queued: false,
            movement_queued: false,
        }
    }

    /// Handle the router uses to toggle the scheduler.
    pub fn switch(&self) -> AutonomySwitch {
        self.switch.clone()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Run until cancelled, one tick per `config.wait`.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(wait = ?self.config.wait, "autonomy started");
        loop {
            self.tick().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.wait) => {}
            }
        }
        tracing::info!("autonomy stopped");
    }

    /// One scheduler pass. Does nothing while disabled.
    pub async fn tick(&mut self) {
        if !self.switch.is_enabled() {
            return;
        }

        let now = self.clock.now();
        if self.interval_check_due(now) {
            self.last_interval_check = Some(now);
            self.run_interval_checks();
        }

        self.advance_head().await;
    }

    fn interval_check_due(&self, now: Instant) -> bool {
        match self.last_interval_check {
            None => true,
            Some(last) => now >= last + self.config.interval_check,
        }
    }

    fn run_interval_checks(&mut self) {
        self.lighting_check();
        self.inspection_check();
        self.movement_check();
        self.water_check();
    }

    /// Day/night lighting: every LED is driven toward the window state.
    fn lighting_check(&mut self) {
        let hour = self.clock.local_hour();
        let day = self.config.day_start_hour < hour && hour < self.config.day_end_hour;
        let desired = i64::from(day);

        let commands: Vec<(String, Payload)> = {
            let topology = self.topology.lock();
            topology
                .actuators()
                .filter(|e| e.matches_kind(EntityKind::Led))
                .map(|e| e.build_command(value_kwargs(desired)))
                .collect()
        };

        for (topic, data) in commands {
            let step = Step::new(topic, data, &self.clock);
            self.add_job(vec![step]);
        }
    }

    /// Sweep the plant-information camera once per session.
    fn inspection_check(&mut self) {
        if self.inspection_queued {
            return;
        }

        let commands: Option<Vec<(String, Payload)>> = {
            let topology = self.topology.lock();
            topology.find_by_unique_id(PLANT_INFORMATION_ID).map(|e| {
                INSPECTION_POSITIONS
                    .iter()
                    .map(|pos| {
                        let mut kwargs = Payload::new();
                        kwargs.insert("command".to_string(), json!("inspect"));
                        kwargs.insert("to".to_string(), json!(pos));
                        e.build_command(kwargs)
                    })
                    .collect()
            })
        };

        let Some(commands) = commands else { return };
        let steps = commands
            .into_iter()
            .map(|(topic, data)| {
                Step::new(topic, data, &self.clock)
                    .with_deadline(PROGRAM_DEADLINE)
                    .with_wait(INSPECTION_SETTLE)
            })
            .collect();

        self.inspection_queued = true;
        tracing::info!("queueing plant inspection");
        self.add_job(steps);
    }

    /// Migrate plants to the next stage once per session.
    ///
    /// When the plant-information node has reported placement data, the
    /// program only runs if something is actually flagged ready to move;
    /// without data it runs unconditionally.
    fn movement_check(&mut self) {
        if self.movement_queued {
            return;
        }

        let commands: Option<Vec<(String, Payload)>> = {
            let topology = self.topology.lock();
            let Some(mover) = topology.find_by_unique_id(PLANT_MOVER_ID) else {
                return;
            };

            let places = topology
                .find_by_unique_id(PLANT_INFORMATION_ID)
                .and_then(|info| info.data.get("places"))
                .and_then(Value::as_object);
            if places.is_some_and(|p| !placement::has_ready_to_move(p)) {
                tracing::debug!("nothing ready to move yet");
                None
            } else {
                Some(
                    MOVE_PROGRAM
                        .iter()
                        .map(|(from, to)| {
                            let mut kwargs = Payload::new();
                            kwargs.insert("command".to_string(), json!("goto"));
                            kwargs.insert("from".to_string(), json!(from));
                            kwargs.insert("to".to_string(), json!(to));
                            mover.build_command(kwargs)
                        })
                        .collect(),
                )
            }
        };

        let Some(commands) = commands else { return };
        let steps = commands
            .into_iter()
            .map(|(topic, data)| {
                Step::new(topic, data, &self.clock).with_deadline(PROGRAM_DEADLINE)
            })
            .collect();

        self.movement_queued = true;
        tracing::info!("queueing plant movement");
        self.add_job(steps);
    }

    fn water_check(&mut self) {
        // reserved: sensor-driven water rules are not wired into the
        // scheduler yet
    }

    /// Enqueue a job after dropping redundant and duplicate steps.
    ///
    /// A step is redundant when its target entity already reports the
    /// requested value (a null observation never counts), and a duplicate
    /// when a still-queued job carries the same canonical key.
    pub fn add_job(&mut self, steps: Vec<Step>) {
        let steps: Vec<Step> = {
            let topology = self.topology.lock();
            steps
                .into_iter()
                .filter(|step| {
                    if is_redundant(&topology, step) {
                        tracing::trace!(topic = %step.topic, "step dropped: value already set");
                        return false;
                    }
                    if self.queue.contains_queued_key(&step.canonical_key()) {
                        tracing::trace!(topic = %step.topic, "step dropped: already queued");
                        return false;
                    }
                    true
                })
                .collect()
        };

        if steps.is_empty() {
            return;
        }

        let mut job = Job::new(steps, &self.clock);
        job.set_state(JobState::Queued);
        tracing::debug!(job = %job.id, steps = job.steps().len(), "job queued");
        self.queue.push(job);
    }

    /// Advance the head job by at most one action.
    async fn advance_head(&mut self) {
        let Some(job) = self.queue.head_mut() else { return };

        match job.state {
            JobState::Done | JobState::Killed => {
                tracing::debug!(job = %job.id, state = %job.state, "job removed");
                self.queue.pop_head();
            }
            JobState::Unchecked | JobState::Queued => {
                job.set_state(JobState::Pending);
            }
            JobState::Pending => {
                if job.done_with_steps() {
                    tracing::info!(job = %job.id, "job done");
                    job.set_state(JobState::Done);
                    return;
                }

                let job_id = job.id.clone();
                let now = self.clock.now();
                let Some(step) = job.current_step_mut() else { return };

                if !step.has_sent() {
                    let topic = step.topic.clone();
                    let data = step.data.clone();
                    step.mark_sent(&self.clock);
                    tracing::debug!(job = %job_id, %topic, "step published");
                    self.outbound.publish(&topic, data).await;
                    return;
                }

                if step.deadline_exceeded(now) {
                    tracing::warn!(
                        job = %job_id,
                        topic = %step.topic,
                        "step deadline exceeded, killing job"
                    );
                    job.set_state(JobState::Killed);
                    return;
                }

                let confirmed = {
                    let topology = self.topology.lock();
                    step_confirmed(&topology, step)
                };
                if confirmed {
                    let settle = step.wait;
                    if !settle.is_zero() {
                        tokio::time::sleep(settle).await;
                    }
                    job.advance();
                    tracing::debug!(job = %job_id, at_step = job.at_step, "step confirmed");
                }
            }
        }
    }
}

fn value_kwargs(value: i64) -> Payload {
    let mut kwargs = Payload::new();
    kwargs.insert("value".to_string(), json!(value));
    kwargs
}

/// Would enqueueing this step change anything the entity already reports?
fn is_redundant(topology: &Topology, step: &Step) -> bool {
    let Some(requested) = step.requested_value() else { return false };
    let Ok(Some(entity)) = topology.find_by_topic(&step.topic) else { return false };
    entity.value.as_ref() == Some(requested)
}

/// The awaited-value predicate: has the device confirmed this step?
fn step_confirmed(topology: &Topology, step: &Step) -> bool {
    let Ok(Some(entity)) = topology.find_by_topic(&step.topic) else { return false };

    match entity.kind {
        EntityKind::PlantMover => both_eq(step.data.get("to"), entity.data.get("stage")),
        EntityKind::PlantInformation => both_eq(step.data.get("to"), entity.data.get("to")),
        _ => both_eq(step.requested_value(), entity.value.as_ref()),
    }
}

fn both_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
