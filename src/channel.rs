//! Single-slot, last-write-wins channel
//!
//! [`SlotChannel`] hands the freshest value of `T` from one producer to any
//! number of receivers. The slot holds at most one pending value; a `send`
//! replaces whatever is pending, so slow receivers only ever observe the
//! latest state rather than a backlog of transitions.
//!
//! Waiting is predicate-guarded: after every wakeup a receiver re-checks the
//! slot under the lock, so spurious wakeups and competing receivers are
//! handled by re-waiting. A timeout is reported as
//! [`ChannelError::TimedOut`] and never yields a fabricated value.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

use crate::error::ChannelError;

/// Stand-in for "never" when a timeout does not fit in an `Instant`
/// (about 30 years, the same horizon tokio uses for an unbounded sleep).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Returns `start + timeout`, clamped to a far-future instant when the sum
/// would overflow.
#[must_use]
pub fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// Single-element, overwrite-on-send channel.
///
/// The slot is guarded by a mutex that is never held across an `.await`;
/// [`Notify`] plays the role of the condition variable.
pub struct SlotChannel<T> {
    /// Pending value, if any
    slot: Mutex<Option<T>>,
    /// Wakes receivers parked on an empty slot
    notify: Notify,
}

impl<T> SlotChannel<T> {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Places `value` in the slot and wakes waiting receivers.
    ///
    /// Any value that was sent earlier and not yet received is dropped.
    pub fn send(&self, value: T) {
        let replaced = self.lock().replace(value).is_some();
        if replaced {
            trace!("slot overwritten before it was received");
        }
        // Every parked receiver races for the lock; the losers see an empty
        // slot and park again.
        self.notify.notify_waiters();
    }

    /// Waits up to `timeout` for a value and takes it out of the slot.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::TimedOut`] if no value was available before
    /// the timeout elapsed.
    pub async fn receive(&self, timeout: Duration) -> Result<T, ChannelError> {
        self.receive_until(deadline_after(Instant::now(), timeout))
            .await
    }

    /// Waits until `deadline` for a value and takes it out of the slot.
    ///
    /// A deadline already in the past still checks the slot once.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::TimedOut`] if no value was available before
    /// the deadline.
    pub async fn receive_until(&self, deadline: Instant) -> Result<T, ChannelError> {
        let started = Instant::now();
        loop {
            // Register interest before checking the slot so a send landing
            // between the check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_receive() {
                return Ok(value);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_receive().ok_or(ChannelError::TimedOut {
                    waited: started.elapsed(),
                });
            }
        }
    }

    /// Takes the pending value without waiting.
    #[must_use]
    pub fn try_receive(&self) -> Option<T> {
        self.lock().take()
    }

    /// Returns whether a value is waiting to be received.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.lock().is_some()
    }

    // The slot is only ever touched through `Option::replace`/`take`, which
    // cannot panic, so a poisoned lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for SlotChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SlotChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotChannel")
            .field("pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}
