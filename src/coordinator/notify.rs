//! Single-slot "new data available" mailbox
//!
//! At most one notification is pending at a time. Posting while one is
//! pending drops the new one, so consumers that do not drain promptly miss
//! edges rather than queueing them. All handles share the same slot: the
//! first consumer to take a notification clears it for everyone.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct Mailbox {
    pending: Mutex<bool>,
    ready: Condvar,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking post. Returns `false` when a notification was already
    /// pending and this one was dropped.
    pub fn post(&self) -> bool {
        let mut pending = self.pending.lock();
        if *pending {
            return false;
        }
        *pending = true;
        self.ready.notify_all();
        true
    }

    fn take(&self) -> bool {
        std::mem::replace(&mut *self.pending.lock(), false)
    }

    fn is_pending(&self) -> bool {
        *self.pending.lock()
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        while !*pending {
            if self.ready.wait_until(&mut pending, deadline).timed_out() {
                break;
            }
        }
        std::mem::replace(&mut *pending, false)
    }
}

/// Consumer side of a [`Mailbox`]
#[derive(Debug, Clone)]
pub struct NotificationHandle {
    mailbox: Arc<Mailbox>,
}

impl NotificationHandle {
    pub(crate) fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }

    /// Consume the pending notification, if any
    pub fn try_take(&self) -> bool {
        self.mailbox.take()
    }

    /// Block up to `timeout` for a notification and consume it
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.mailbox.wait_timeout(timeout)
    }

    /// Peek without consuming
    pub fn is_pending(&self) -> bool {
        self.mailbox.is_pending()
    }
}
