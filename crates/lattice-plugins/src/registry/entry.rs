//! Per-name registry slots and the waiting rules around them.
//!
//! Each registered name owns an [`Entry`]: its descriptor plus a mutex
//! guarding the lifecycle state and the live instance. Plugin code never
//! runs while the slot lock is held. A caller marks the slot with an
//! [`Activity`], takes the instance out, releases the lock, calls the
//! plugin, then puts the instance back and wakes any waiters.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::debug;

use super::{ConcurrencyPolicy, REGISTRY_TARGET};
use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;
use crate::lifecycle::PluginState;
use crate::plugin::Plugin;

/// What the thread currently owning a slot is doing with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ActivityKind {
    Initializing,
    Executing,
    ShuttingDown,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Activity {
    kind: ActivityKind,
    thread: ThreadId,
}

impl Activity {
    pub(super) fn current(kind: ActivityKind) -> Self {
        Self {
            kind,
            thread: thread::current().id(),
        }
    }
}

pub(super) struct Slot {
    pub(super) state: PluginState,
    pub(super) instance: Option<Box<dyn Plugin>>,
    pub(super) activity: Option<Activity>,
}

pub(super) struct Entry {
    descriptor: PluginDescriptor,
    slot: Mutex<Slot>,
    idle: Condvar,
}

impl Entry {
    pub(super) fn new(descriptor: PluginDescriptor) -> Self {
        debug_assert!(PluginState::Discovered.can_transition_to(PluginState::Registered));
        Self {
            descriptor,
            slot: Mutex::new(Slot {
                state: PluginState::Registered,
                instance: None,
                activity: None,
            }),
            idle: Condvar::new(),
        }
    }

    pub(super) const fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub(super) fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Locks the slot. A poisoned slot is still consistent because plugin
    /// code never runs under the lock.
    pub(super) fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until no other thread is working on the slot.
    ///
    /// Fails with [`PluginError::Busy`] when the calling thread itself owns
    /// the slot, or when the policy rejects waiting on an execution.
    pub(super) fn wait_idle<'a>(
        &'a self,
        mut slot: MutexGuard<'a, Slot>,
        policy: ConcurrencyPolicy,
    ) -> Result<MutexGuard<'a, Slot>, PluginError> {
        let me = thread::current().id();
        while let Some(activity) = slot.activity {
            if activity.thread == me {
                return Err(PluginError::busy(self.name()));
            }
            if policy == ConcurrencyPolicy::Reject && activity.kind == ActivityKind::Executing {
                return Err(PluginError::busy(self.name()));
            }
            debug!(
                target: REGISTRY_TARGET,
                plugin = self.name(),
                activity = ?activity.kind,
                "waiting for plugin to become idle"
            );
            slot = self.idle.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
        Ok(slot)
    }

    /// Moves the slot to `next`.
    pub(super) fn transition(&self, slot: &mut Slot, next: PluginState) {
        debug_assert!(
            slot.state.can_transition_to(next),
            "illegal transition {} -> {next} for plugin '{}'",
            slot.state,
            self.name()
        );
        debug!(
            target: REGISTRY_TARGET,
            plugin = self.name(),
            from = slot.state.as_str(),
            to = next.as_str(),
            "plugin state transition"
        );
        slot.state = next;
    }

    /// Clears the activity marker and wakes every waiter.
    pub(super) fn finish(&self, slot: &mut Slot) {
        slot.activity = None;
        self.idle.notify_all();
    }
}
