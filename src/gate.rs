//! The hard block: a gate that can be closed against every passer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock, RwLockReadGuard};

/// A binary open/closed gate.
///
/// Passers take a shared hold while they go through; closing the gate takes
/// the exclusive hold and parks it until the gate is reopened. Closing waits
/// for passers already inside to leave, and new passers queue behind a pending
/// close.
#[derive(Debug)]
pub(crate) struct Gate {
    lock: Arc<RwLock<()>>,
    /// Serializes open/close transitions and owns the parked exclusive hold.
    hold: Mutex<Option<OwnedRwLockWriteGuard<()>>>,
    closed: AtomicBool,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            lock: Arc::new(RwLock::new(())),
            hold: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Close the gate. Returns `false` if it was already closed.
    pub async fn close(&self) -> bool {
        let mut hold = self.hold.lock().await;
        if hold.is_some() {
            return false;
        }
        *hold = Some(self.lock.clone().write_owned().await);
        self.closed.store(true, Ordering::Release);
        true
    }

    /// Open the gate. Returns `false` if it was already open.
    pub async fn open(&self) -> bool {
        let mut hold = self.hold.lock().await;
        match hold.take() {
            Some(guard) => {
                self.closed.store(false, Ordering::Release);
                drop(guard);
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait until the gate is open and hold it open while the guard lives.
    pub async fn enter(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }
}
