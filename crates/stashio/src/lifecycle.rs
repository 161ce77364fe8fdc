//! # Worker Lifecycle
//!
//! The state machine a worker version moves through and the pool of client
//! contexts claimed at activation.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::WorkerError;

/// Lifecycle phase of a worker version.
///
/// Transitions only move forward; a superseding version runs the cycle
/// again from `Installing` and takes over once it activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Installing,
    Installed,
    Activating,
    Active,
}

impl WorkerState {
    pub fn display(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        }
    }

    fn rank(self) -> u8 {
        match self {
            WorkerState::Installing => 0,
            WorkerState::Installed => 1,
            WorkerState::Activating => 2,
            WorkerState::Active => 3,
        }
    }

    /// Move to `next`, rejecting backward or skipped transitions.
    pub(crate) fn advance(&mut self, next: WorkerState) -> Result<(), WorkerError> {
        if next.rank() != self.rank() + 1 {
            return Err(WorkerError::LifecycleError(format!(
                "cannot move from {} to {}",
                self.display(),
                next.display()
            )));
        }

        debug!(from = self.display(), to = next.display(), "Lifecycle transition");
        *self = next;
        Ok(())
    }
}

/// Identifier of a client context served by the worker.
pub type ClientId = u64;

/// Open client contexts and the worker version controlling each.
///
/// Claiming repoints every client at the claiming version without a
/// reload, which is how a freshly activated worker takes over pages opened
/// under its predecessor.
#[derive(Debug, Default)]
pub struct ClientPool {
    controlled: RwLock<HashMap<ClientId, Option<String>>>,
}

impl ClientPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client context; it starts uncontrolled.
    pub fn register(&self, id: ClientId) {
        self.controlled.write().insert(id, None);
    }

    /// Claim every registered client for `version`. Returns the number of
    /// clients claimed.
    pub fn claim(&self, version: &str) -> usize {
        let mut controlled = self.controlled.write();
        for controller in controlled.values_mut() {
            *controller = Some(version.to_owned());
        }

        let count = controlled.len();
        debug!(version = %version, clients = count, "Claimed clients");
        count
    }

    /// The version controlling a client, if any.
    pub fn controller(&self, id: ClientId) -> Option<String> {
        self.controlled.read().get(&id).cloned().flatten()
    }

    pub fn len(&self) -> usize {
        self.controlled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.controlled.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_advance_in_order() {
        let mut state = WorkerState::default();
        assert_eq!(state, WorkerState::Installing);

        state.advance(WorkerState::Installed).unwrap();
        state.advance(WorkerState::Activating).unwrap();
        state.advance(WorkerState::Active).unwrap();
        assert_eq!(state, WorkerState::Active);
    }

    #[test]
    fn test_no_backward_or_skipped_transitions() {
        let mut state = WorkerState::Installing;
        assert!(state.advance(WorkerState::Activating).is_err());
        assert!(state.advance(WorkerState::Active).is_err());

        state.advance(WorkerState::Installed).unwrap();
        assert!(state.advance(WorkerState::Installing).is_err());

        let mut active = WorkerState::Active;
        assert!(active.advance(WorkerState::Installing).is_err());
        assert_eq!(active, WorkerState::Active);
    }

    #[test]
    fn test_claim_takes_over_all_clients() {
        let pool = ClientPool::new();
        pool.register(1);
        pool.register(2);
        pool.register(3);

        assert_eq!(pool.controller(1), None);

        let claimed = pool.claim("v2");
        assert_eq!(claimed, 3);
        assert_eq!(pool.controller(1), Some("v2".to_owned()));
        assert_eq!(pool.controller(2), Some("v2".to_owned()));
        assert_eq!(pool.controller(3), Some("v2".to_owned()));

        // A newer version re-claims without re-registration
        pool.claim("v3");
        assert_eq!(pool.controller(2), Some("v3".to_owned()));
    }

    #[test]
    fn test_unknown_client_has_no_controller() {
        let pool = ClientPool::new();
        pool.claim("v1");
        assert_eq!(pool.controller(42), None);
        assert!(pool.is_empty());
    }
}
