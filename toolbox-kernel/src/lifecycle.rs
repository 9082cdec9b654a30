//! Initialisation state machine for the orchestrator.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// States the orchestrator moves through during startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    /// Constructed; no providers loaded.
    #[default]
    Uninitialized,
    /// Providers are registering tools.
    Initializing,
    /// Registry populated and frozen.
    Ready,
}

impl OrchestratorState {
    /// Returns `true` once initialisation completed.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Events that trigger lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Start loading providers.
    Begin,
    /// All providers registered successfully.
    Complete,
    /// A provider failed; return to the initial state.
    Fail,
}

/// Lifecycle state manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifecycle {
    state: OrchestratorState,
}

impl Lifecycle {
    /// Constructs a lifecycle in [`OrchestratorState::Uninitialized`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: OrchestratorState::Uninitialized,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Applies a lifecycle event, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the supplied event is not
    /// allowed from the current state.
    pub fn transition(&mut self, event: LifecycleEvent) -> LifecycleResult<OrchestratorState> {
        let next = match (self.state, event) {
            (OrchestratorState::Uninitialized, LifecycleEvent::Begin) => {
                OrchestratorState::Initializing
            }
            (OrchestratorState::Initializing, LifecycleEvent::Complete) => OrchestratorState::Ready,
            (OrchestratorState::Initializing, LifecycleEvent::Fail) => {
                OrchestratorState::Uninitialized
            }
            (from, event) => return Err(LifecycleError::InvalidTransition { from, event }),
        };

        debug!(from = ?self.state, to = ?next, ?event, "orchestrator lifecycle transition");
        self.state = next;
        Ok(next)
    }
}

/// Errors emitted by the lifecycle controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Transition was not permitted from the current state.
    #[error("invalid lifecycle transition from {from:?} via {event:?}")]
    InvalidTransition {
        /// State prior to the attempted transition.
        from: OrchestratorState,
        /// Event that triggered the failure.
        event: LifecycleEvent,
    },
}

/// Result alias used for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
