//! Per-Process Child Registry
//!
//! A parent's view of the children it has spawned. Each record is created by
//! the parent before the child can run and is the rendezvous point for two
//! handshakes:
//!
//! 1. **Load**: the child publishes whether its program image loaded; the
//!    parent's `exec` blocks on it.
//! 2. **Exit**: the child publishes its exit status; the parent's `wait`
//!    blocks on it.
//!
//! The child never owns a record. It reaches its own record only through a
//! pid-indexed lookup in the parent's registry, and every transition happens
//! under the per-record lock, with a semaphore providing the wakeup and the
//! happens-before edge.

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::process::Pid;
use crate::sched::Scheduler;
use crate::sync::Semaphore;

/// Whether a child's program image has finished loading, and how.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoadOutcome {
    /// The child has not reported yet.
    Pending,
    /// The image is mapped and the child is executing user code.
    Succeeded,
    /// The load failed; the child never reaches user code.
    Failed,
}

/// Mutable state of one child record, guarded by the record's lock.
struct ChildState {
    load: LoadOutcome,
    /// Set once a `wait` has claimed this child; a second `wait` fails.
    waited: bool,
    exited: bool,
    /// Valid only once `exited` is set.
    exit_status: i32,
}

/// A parent's record of one spawned child.
pub struct ChildRecord {
    pid: Pid,
    state: Mutex<ChildState>,
    loaded: Semaphore,
    exit: Semaphore,
}

impl ChildRecord {
    fn new(pid: Pid) -> Arc<Self> {
        Arc::new(Self {
            pid,
            state: Mutex::new(ChildState {
                load: LoadOutcome::Pending,
                waited: false,
                exited: false,
                exit_status: 0,
            }),
            loaded: Semaphore::new(0),
            exit: Semaphore::new(0),
        })
    }

    /// Pid of the child this record tracks.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Child side of the load handshake: publish the outcome and wake the
    /// parent. Called exactly once per record.
    pub(crate) fn set_load_outcome(&self, success: bool) {
        let mut state = self.state.lock();
        state.load = if success {
            LoadOutcome::Succeeded
        } else {
            LoadOutcome::Failed
        };
        drop(state);
        self.loaded.up();
    }

    /// Parent side of the load handshake: block until the outcome is known.
    pub(crate) fn wait_load(&self, sched: &dyn Scheduler) -> LoadOutcome {
        self.loaded.down(sched);
        self.state.lock().load
    }

    /// Claim this record for a `wait`. Returns `false` if it was already
    /// claimed (wait is single-use per child).
    pub(crate) fn claim_wait(&self) -> bool {
        let mut state = self.state.lock();
        if state.waited {
            false
        } else {
            state.waited = true;
            true
        }
    }

    /// Child side of the exit handshake: store the status and wake a waiter.
    pub(crate) fn record_exit(&self, status: i32) {
        let mut state = self.state.lock();
        state.exited = true;
        state.exit_status = status;
        drop(state);
        self.exit.up();
    }

    /// Parent side of the exit handshake: block until the child has exited,
    /// then read its status.
    pub(crate) fn wait_exit(&self, sched: &dyn Scheduler) -> i32 {
        self.exit.down(sched);
        self.state.lock().exit_status
    }

    /// Whether the child has exited (no blocking).
    pub fn has_exited(&self) -> bool {
        self.state.lock().exited
    }
}

/// The set of child records owned by one parent process.
///
/// Linear pid lookup, like the descriptor table - the per-process child count
/// is small.
pub struct ChildRegistry {
    records: Mutex<Vec<Arc<ChildRecord>>>,
}

impl ChildRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Register a new child with a pending load outcome.
    ///
    /// Must happen before the child is given control, so the record exists
    /// by the time the child reports its load outcome.
    pub(crate) fn register(&self, pid: Pid) -> Arc<ChildRecord> {
        let record = ChildRecord::new(pid);
        self.records.lock().push(Arc::clone(&record));
        record
    }

    /// Look up the record for a child pid.
    pub fn get(&self, pid: Pid) -> Option<Arc<ChildRecord>> {
        self.records
            .lock()
            .iter()
            .find(|r| r.pid == pid)
            .cloned()
    }

    /// Remove and destroy the record for a child pid, if present.
    pub(crate) fn remove(&self, pid: Pid) {
        self.records.lock().retain(|r| r.pid != pid);
    }

    /// Publish a child's exit status into its record.
    ///
    /// A missing record (the status was already collected, or the exec that
    /// created it failed) makes this a no-op; the status is discarded.
    pub(crate) fn record_exit(&self, pid: Pid, status: i32) {
        if let Some(record) = self.get(pid) {
            record.record_exit(status);
        }
    }

    /// Destroy every remaining record, regardless of state.
    ///
    /// Called at parent termination; children that were never waited on
    /// simply lose their audience.
    pub(crate) fn clear(&self) {
        self.records.lock().clear();
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Default for ChildRegistry {
    fn default() -> Self {
        Self::new()
    }
}
