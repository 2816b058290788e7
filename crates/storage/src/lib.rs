// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hp-storage: Last-known-state persistence for the master controller

mod state;

pub use state::{DocumentStore, StateMap, StateStore, StorageError};

#[cfg(any(test, feature = "test-support"))]
pub use state::MemoryStateStore;
