//! Kernel Context
//!
//! Ties the boundary layer to its collaborators and owns the system-wide
//! state: the pid-keyed process table, the pid allocator and the global
//! filesystem mutex. The embedding kernel constructs one [`Kernel`] at boot
//! and hands it to the trap glue.
//!
//! # The filesystem mutex
//! The filesystem collaborator is not assumed reentrant, so the trait object
//! lives *inside* a `spin::Mutex`. Reaching the filesystem at all requires
//! holding the lock, which makes every primitive call mutually exclusive
//! across all processes by construction.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

use crate::console::Console;
use crate::fs::FileSystem;
use crate::mm::AddressSpace;
use crate::process::{Pid, Process};
use crate::sched::{ProcessLifecycle, Scheduler};

/// The boundary layer's system-wide context.
pub struct Kernel {
    filesys: Mutex<Box<dyn FileSystem>>,
    console: Box<dyn Console>,
    lifecycle: Box<dyn ProcessLifecycle>,
    scheduler: Box<dyn Scheduler>,
    processes: Mutex<BTreeMap<Pid, Arc<Process>>>,
    next_pid: AtomicU64,
}

impl Kernel {
    /// Construct the kernel context from its collaborators.
    pub fn new(
        filesys: Box<dyn FileSystem>,
        console: Box<dyn Console>,
        lifecycle: Box<dyn ProcessLifecycle>,
        scheduler: Box<dyn Scheduler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            filesys: Mutex::new(filesys),
            console,
            lifecycle,
            scheduler,
            processes: Mutex::new(BTreeMap::new()),
            next_pid: AtomicU64::new(1),
        })
    }

    /// The filesystem, behind the global filesystem mutex.
    ///
    /// Callers lock, make one primitive call (or one tightly coupled batch,
    /// like close-all-at-exit) and release; the guard must not be held
    /// across unrelated blocking.
    pub fn filesys(&self) -> &Mutex<Box<dyn FileSystem>> {
        &self.filesys
    }

    /// The console collaborator.
    pub fn console(&self) -> &dyn Console {
        &*self.console
    }

    /// The process-lifecycle collaborator.
    pub fn lifecycle(&self) -> &dyn ProcessLifecycle {
        &*self.lifecycle
    }

    /// The scheduler yield hook.
    pub fn scheduler(&self) -> &dyn Scheduler {
        &*self.scheduler
    }

    /// Allocate a fresh pid.
    pub(crate) fn allocate_pid(&self) -> Pid {
        Pid::from_raw(self.next_pid.fetch_add(1, Ordering::Relaxed))
    }

    /// Create the initial process, which has no parent.
    ///
    /// The embedding kernel calls this once at boot for its first user
    /// program, then starts it through its own loader.
    pub fn spawn_root(&self, name: &str, aspace: Box<dyn AddressSpace>) -> Arc<Process> {
        let pid = self.allocate_pid();
        let root = Process::new(pid, name, alloc::sync::Weak::new());
        root.set_address_space(aspace);
        self.insert_process(Arc::clone(&root));
        root
    }

    /// Look up a live process by pid.
    pub fn find_process(&self, pid: Pid) -> Option<Arc<Process>> {
        self.processes.lock().get(&pid).cloned()
    }

    /// Number of live processes.
    pub fn process_count(&self) -> usize {
        self.processes.lock().len()
    }

    pub(crate) fn insert_process(&self, process: Arc<Process>) {
        self.processes.lock().insert(process.pid(), process);
    }

    pub(crate) fn remove_process(&self, pid: Pid) {
        self.processes.lock().remove(&pid);
    }

    /// Child side of the exec handshake.
    ///
    /// The loader thread calls this exactly once per child, after attempting
    /// the load and before running any user code. Publishes the outcome into
    /// the parent's child record and wakes the parent's blocked `exec`. If
    /// the record or the parent is gone the outcome is discarded.
    pub fn on_child_loaded(&self, pid: Pid, success: bool) {
        let Some(child) = self.find_process(pid) else {
            log::warn!("on_child_loaded: no process with pid {}", pid);
            return;
        };
        match child.parent() {
            Some(parent) => match parent.children().get(pid) {
                Some(record) => record.set_load_outcome(success),
                None => log::warn!("on_child_loaded: pid {} has no child record", pid),
            },
            None => log::debug!("on_child_loaded: parent of pid {} is gone", pid),
        }
    }
}
