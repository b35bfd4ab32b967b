//! Optimistic state transactions.
//!
//! A [`Speculation`] applies a change to observable state immediately and
//! remembers how to undo it. Unless it is committed, the undo runs when the
//! speculation is dropped: on an error return, on a panic, or when the
//! surrounding future is cancelled.

use std::future::Future;

use tokio::sync::watch;

/// A state change that is reverted unless committed.
pub struct Speculation<'a, S, U> {
    state: &'a watch::Sender<S>,
    undo: Option<U>,
    rollback: fn(&mut S, U),
}

impl<'a, S, U> Speculation<'a, S, U> {
    /// Apply `apply` to the state now. Its return value is handed to
    /// `rollback` if the speculation is abandoned.
    pub fn begin(
        state: &'a watch::Sender<S>,
        apply: impl FnOnce(&mut S) -> U,
        rollback: fn(&mut S, U),
    ) -> Self {
        let mut undo = None;
        state.send_modify(|s| undo = Some(apply(s)));
        Self {
            state,
            undo,
            rollback,
        }
    }

    /// Keep the change.
    pub fn commit(mut self) {
        self.undo = None;
    }
}

impl<S, U> Drop for Speculation<'_, S, U> {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            let rollback = self.rollback;
            self.state.send_modify(|s| rollback(s, undo));
        }
    }
}

/// Apply a change, run `effect`, and keep the change only if it succeeds.
///
/// # Errors
///
/// Returns the error of `effect`, after the change has been rolled back.
pub async fn speculate<S, U, T, E>(
    state: &watch::Sender<S>,
    apply: impl FnOnce(&mut S) -> U,
    rollback: fn(&mut S, U),
    effect: impl Future<Output = Result<T, E>>,
) -> Result<T, E> {
    let speculation = Speculation::begin(state, apply, rollback);
    let result = effect.await;
    if result.is_ok() {
        speculation.commit();
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    struct Counter {
        value: i32,
    }

    fn bump(counter: &mut Counter) -> i32 {
        counter.value += 1;
        1
    }

    fn unbump(counter: &mut Counter, by: i32) {
        counter.value -= by;
    }

    #[tokio::test]
    async fn test_success_keeps_change() {
        let (state, _) = watch::channel(Counter::default());
        let result: Result<&str, ()> = speculate(&state, bump, unbump, async { Ok("done") }).await;
        assert_eq!(result, Ok("done"));
        assert_eq!(state.borrow().value, 1);
    }

    #[tokio::test]
    async fn test_failure_restores_state() {
        let (state, _) = watch::channel(Counter { value: 5 });
        let result: Result<(), &str> = speculate(&state, bump, unbump, async {
            Err("network down")
        })
        .await;
        assert_eq!(result, Err("network down"));
        assert_eq!(state.borrow().value, 5);
    }

    #[tokio::test]
    async fn test_change_is_visible_while_pending() {
        let (state, mut rx) = watch::channel(Counter::default());
        let speculation = Speculation::begin(&state, bump, unbump);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().value, 1);
        drop(speculation);
        assert_eq!(rx.borrow_and_update().value, 0);
    }

    #[tokio::test]
    async fn test_cancelled_effect_rolls_back() {
        let (state, _) = watch::channel(Counter::default());
        let pending = speculate::<_, _, (), ()>(&state, bump, unbump, std::future::pending());
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert_eq!(state.borrow().value, 0);
    }
}
