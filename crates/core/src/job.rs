// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step and job state machines for the autonomy scheduler.

use crate::clock::Clock;
use crate::payload::{self, Payload};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Default per-step deadline.
pub const DEFAULT_STEP_DEADLINE: Duration = Duration::from_secs(60);

/// One pending publish on the bus plus the timing needed to confirm it.
///
/// `wait` is how long to settle after the step confirms (say turning off
/// water: how long do the containers take to empty?). `deadline` is relative
/// to creation; a step that outlives it kills its job.
#[derive(Debug, Clone)]
pub struct Step {
    pub topic: String,
    pub data: Payload,
    pub wait: Duration,
    pub deadline: Duration,
    created_at: Instant,
    time_sent: Option<Instant>,
}

impl Step {
    pub fn new(topic: impl Into<String>, data: Payload, clock: &impl Clock) -> Self {
        Self {
            topic: topic.into(),
            data,
            wait: Duration::ZERO,
            deadline: DEFAULT_STEP_DEADLINE,
            created_at: clock.now(),
            time_sent: None,
        }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Record that the step's command went out on the bus.
    pub fn mark_sent(&mut self, clock: &impl Clock) {
        self.time_sent = Some(clock.now());
    }

    pub fn has_sent(&self) -> bool {
        self.time_sent.is_some()
    }

    pub fn time_sent(&self) -> Option<Instant> {
        self.time_sent
    }

    /// True at and after `created_at + deadline`.
    pub fn deadline_exceeded(&self, now: Instant) -> bool {
        now >= self.created_at + self.deadline
    }

    /// Stable `(topic, data)` encoding used for deduplication.
    pub fn canonical_key(&self) -> String {
        payload::canonical_key(&self.topic, &self.data)
    }

    /// The `value` this step asks the device to take, if it names one.
    pub fn requested_value(&self) -> Option<&Value> {
        payload::value_of(&self.data)
    }
}

/// Job lifecycle. Terminal states only trigger removal from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Unchecked,
    Queued,
    Pending,
    Done,
    Killed,
}

crate::simple_display! {
    JobState {
        Unchecked => "unchecked",
        Queued => "queued",
        Pending => "pending",
        Done => "done",
        Killed => "killed",
    }
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Killed)
    }
}

/// Informational priority; the queue itself is strictly FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPriority {
    #[default]
    Default,
    Medium,
    High,
}

/// An ordered bundle of steps treated as a unit by the scheduler.
#[derive(Debug, Clone)]
pub struct Job {
    /// Random id for log correlation.
    pub id: String,
    pub state: JobState,
    pub priority: JobPriority,
    pub at_step: usize,
    steps: Vec<Step>,
    created_at: Instant,
}

impl Job {
    pub fn new(steps: Vec<Step>, clock: &impl Clock) -> Self {
        Self {
            id: format!("job-{}", nanoid::nanoid!(8)),
            state: JobState::Unchecked,
            priority: JobPriority::Default,
            at_step: 0,
            steps,
            created_at: clock.now(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.at_step)
    }

    pub fn current_step_mut(&mut self) -> Option<&mut Step> {
        self.steps.get_mut(self.at_step)
    }

    /// Move the cursor past the current step.
    pub fn advance(&mut self) {
        self.at_step += 1;
    }

    /// All steps completed; the job is ready to be marked done.
    pub fn done_with_steps(&self) -> bool {
        self.at_step == self.steps.len()
    }

    pub fn has_state(&self, state: JobState) -> bool {
        self.state == state
    }

    pub fn set_state(&mut self, state: JobState) {
        self.state = state;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
