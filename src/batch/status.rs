// src/batch/status.rs
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Lifecycle of one year-partition within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PartitionState {
    Pending,
    Running,
    Done,
    Failed,
}

impl PartitionState {
    fn can_move_to(self, next: PartitionState) -> bool {
        use PartitionState::*;
        matches!(
            (self, next),
            (Pending, Running) | (Running, Done) | (Running, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PartitionState::Done | PartitionState::Failed)
    }
}

impl fmt::Display for PartitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Shared record of partition states. The only mutable state workers share.
#[derive(Debug, Default)]
pub struct StatusBoard {
    states: Mutex<BTreeMap<i32, PartitionState>>,
}

impl StatusBoard {
    /// Register every year as `Pending`.
    pub fn new(years: &[i32]) -> Self {
        let states = years.iter().map(|&y| (y, PartitionState::Pending)).collect();
        Self {
            states: Mutex::new(states),
        }
    }

    fn states(&self) -> MutexGuard<'_, BTreeMap<i32, PartitionState>> {
        self.states.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Apply a transition; an illegal one is logged and ignored.
    pub fn transition(&self, year: i32, next: PartitionState) -> bool {
        let mut states = self.states();
        let Some(current) = states.get_mut(&year) else {
            warn!(year, %next, "transition for unscheduled partition");
            return false;
        };
        if !current.can_move_to(next) {
            warn!(year, from = %current, to = %next, "illegal partition transition");
            return false;
        }
        info!(year, from = %current, to = %next, "partition state");
        *current = next;
        true
    }

    pub fn get(&self, year: i32) -> Option<PartitionState> {
        self.states().get(&year).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<i32, PartitionState> {
        self.states().clone()
    }
}
