//! Coordination of concurrent token refreshes.
//!
//! `Idle -> Refreshing { waiters } -> Idle`. The first request to see an
//! expired token becomes the leader and performs the refresh; requests that
//! fail while it runs park a one-shot receiver in the waiter list and get the
//! leader's outcome broadcast to them.

use std::mem;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

/// Result of one refresh cycle as seen by every participant. Errors are
/// carried as messages because the originating error is not `Clone`.
pub type RefreshOutcome = Result<(), String>;

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Serializes refresh attempts into at most one in flight.
pub struct RefreshGate {
    state: Mutex<RefreshState>,
}

/// Role handed out by [`RefreshGate::enter`].
pub enum Ticket<'a> {
    /// Perform the refresh, then [`LeaderGuard::finish`].
    Leader(LeaderGuard<'a>),
    /// Wait for the leader's outcome.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Join the current refresh cycle, starting one if idle.
    pub fn enter(&self) -> Ticket<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            RefreshState::Idle => {
                *state = RefreshState::Refreshing {
                    waiters: Vec::new(),
                };
                Ticket::Leader(LeaderGuard {
                    gate: self,
                    finished: false,
                })
            }
            RefreshState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Ticket::Follower(rx)
            }
        }
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            RefreshState::Refreshing { .. }
        )
    }

    /// Return to idle and deliver `outcome` to every waiter, in arrival order.
    fn complete(&self, outcome: &RefreshOutcome) -> usize {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            mem::replace(&mut *state, RefreshState::Idle)
        };
        let RefreshState::Refreshing { waiters } = previous else {
            return 0;
        };
        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose request was dropped is simply gone
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Held by the leader for the duration of a refresh.
///
/// Dropping it without calling [`finish`](Self::finish) (the leader's future
/// was cancelled) releases the waiters with a failure so none hang.
pub struct LeaderGuard<'a> {
    gate: &'a RefreshGate,
    finished: bool,
}

impl LeaderGuard<'_> {
    /// Broadcast the outcome and reopen the gate.
    pub fn finish(mut self, outcome: &RefreshOutcome) {
        self.finished = true;
        let released = self.gate.complete(outcome);
        debug!(released, ok = outcome.is_ok(), "Refresh cycle finished");
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.gate
                .complete(&Err("session refresh was cancelled".to_string()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_entrant_leads_others_follow() {
        let gate = RefreshGate::new();
        let Ticket::Leader(guard) = gate.enter() else {
            panic!("first entrant must lead");
        };
        assert!(gate.is_refreshing());

        let mut receivers = Vec::new();
        for _ in 0..3 {
            match gate.enter() {
                Ticket::Follower(rx) => receivers.push(rx),
                Ticket::Leader(_) => panic!("only one leader per cycle"),
            }
        }

        guard.finish(&Ok(()));
        assert!(!gate.is_refreshing());
        for mut rx in receivers {
            assert_eq!(rx.try_recv().unwrap(), Ok(()));
        }
    }

    #[test]
    fn test_failure_is_broadcast() {
        let gate = RefreshGate::new();
        let Ticket::Leader(guard) = gate.enter() else {
            panic!("first entrant must lead");
        };
        let Ticket::Follower(mut rx) = gate.enter() else {
            panic!("second entrant must follow");
        };
        guard.finish(&Err("invalid refresh token".to_string()));
        assert_eq!(rx.try_recv().unwrap(), Err("invalid refresh token".to_string()));
    }

    #[test]
    fn test_dropped_leader_releases_waiters() {
        let gate = RefreshGate::new();
        let ticket = gate.enter();
        let Ticket::Follower(mut rx) = gate.enter() else {
            panic!("second entrant must follow");
        };
        drop(ticket);
        assert!(rx.try_recv().unwrap().is_err());
        assert!(!gate.is_refreshing());
    }

    #[test]
    fn test_new_cycle_after_finish() {
        let gate = RefreshGate::new();
        if let Ticket::Leader(guard) = gate.enter() {
            guard.finish(&Ok(()));
        }
        assert!(matches!(gate.enter(), Ticket::Leader(_)));
    }
}
