//! Process Context and Lifecycle Coordination
//!
//! A [`Process`] is the per-process state the boundary layer tracks: the
//! descriptor table, the child registry, the address space handle and the
//! link to the parent. The free functions here implement the exec/wait/exit
//! coordination on top of the [`ChildRegistry`] handshakes.
//!
//! # Ownership
//! Processes are shared via `Arc`: the kernel's process table holds one
//! reference while the process is alive, and the trap glue holds another for
//! the duration of a dispatch. The two resource tables are private to the
//! process; a child only ever touches its parent's state through the
//! pid-indexed child-record protocol.

pub mod children;
pub mod fd_table;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::{Arc, Weak};
use core::fmt;
use core::ptr::NonNull;
use spin::Mutex;

use crate::kernel::Kernel;
use crate::mm::AddressSpace;

pub use children::{ChildRecord, ChildRegistry, LoadOutcome};
pub use fd_table::{FdTable, STDIN_FD, STDOUT_FD};

/// Exit status recorded for a process the kernel kills (validation failure,
/// unhandled fault, failed load).
pub const KILLED_STATUS: i32 = -1;

/// A process identifier.
///
/// Newtype over the raw id so descriptors, pids and plain integers cannot be
/// mixed up. Pids are not reused while any child record referencing them is
/// live.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(u64);

impl Pid {
    /// Wrap a raw pid value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw pid value.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-process context owned by the boundary layer.
pub struct Process {
    pid: Pid,
    name: String,
    parent: Weak<Process>,
    address_space: Mutex<Option<Box<dyn AddressSpace>>>,
    files: Mutex<FdTable>,
    children: ChildRegistry,
}

impl Process {
    /// Create a process context. `parent` is empty for the root process.
    pub(crate) fn new(pid: Pid, name: &str, parent: Weak<Process>) -> Arc<Self> {
        Arc::new(Self {
            pid,
            name: name.to_string(),
            parent,
            address_space: Mutex::new(None),
            files: Mutex::new(FdTable::new()),
            children: ChildRegistry::new(),
        })
    }

    /// This process's pid.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// The process name (first token of its command line).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parent, if it is still alive.
    pub fn parent(&self) -> Option<Arc<Process>> {
        self.parent.upgrade()
    }

    /// Install the address space once the loader has built it.
    pub fn set_address_space(&self, aspace: Box<dyn AddressSpace>) {
        *self.address_space.lock() = Some(aspace);
    }

    /// Resolve a user virtual address through this process's page table.
    ///
    /// `None` if the page is unmapped or no address space is installed yet.
    pub fn translate(&self, addr: usize) -> Option<NonNull<u8>> {
        self.address_space
            .lock()
            .as_ref()
            .and_then(|aspace| aspace.translate(addr))
    }

    /// The process's descriptor table.
    pub fn files(&self) -> &Mutex<FdTable> {
        &self.files
    }

    /// The process's child registry.
    pub fn children(&self) -> &ChildRegistry {
        &self.children
    }
}

/// Spawn a child running `cmdline` and block until its load outcome is known.
///
/// The child record is registered *before* the lifecycle collaborator gets to
/// run the child, so the load handshake cannot miss. On a failed load the
/// record and the child's process-table entry are torn down and `None` is
/// returned; the caller never observes a usable pid for it.
pub fn execute(kernel: &Arc<Kernel>, parent: &Arc<Process>, cmdline: &str) -> Option<Pid> {
    let name = cmdline.split_whitespace().next().unwrap_or(cmdline);
    let pid = kernel.allocate_pid();
    let child = Process::new(pid, name, Arc::downgrade(parent));

    let record = parent.children().register(pid);
    kernel.insert_process(Arc::clone(&child));
    kernel
        .lifecycle()
        .start(Arc::clone(kernel), Arc::clone(&child), cmdline);

    match record.wait_load(kernel.scheduler()) {
        LoadOutcome::Succeeded => Some(pid),
        LoadOutcome::Failed | LoadOutcome::Pending => {
            log::debug!("exec: load of '{}' failed (pid {})", cmdline, pid);
            parent.children().remove(pid);
            kernel.remove_process(pid);
            None
        }
    }
}

/// Block until child `pid` exits and collect its status.
///
/// Fails immediately, without blocking, if `pid` is not a child of `parent`
/// or its status was already collected (wait is single-use per child). On
/// success the record is destroyed; a second wait on the same pid fails.
pub fn wait(kernel: &Kernel, parent: &Arc<Process>, pid: Pid) -> Option<i32> {
    let record = parent.children().get(pid)?;
    if !record.claim_wait() {
        return None;
    }
    let status = record.wait_exit(kernel.scheduler());
    parent.children().remove(pid);
    Some(status)
}

/// Terminate `process`, releasing everything it owns.
///
/// This is the universal exit path - the exit syscall, validation kills and
/// load failures all end here. It publishes the status into the parent's
/// child record (if the parent is still alive), prints the termination
/// notice, closes all descriptors, discards all child records and drops the
/// process from the kernel's table.
pub fn exit(kernel: &Kernel, process: &Arc<Process>, status: i32) {
    if let Some(parent) = process.parent() {
        parent.children().record_exit(process.pid(), status);
    }

    let notice = alloc::format!("{}: exit({})\n", process.name(), status);
    kernel.console().write_bytes(notice.as_bytes());

    process.files().lock().close_all(kernel);
    process.children().clear();
    kernel.remove_process(process.pid());

    log::debug!("process {} ({}) exited: {}", process.pid(), process.name(), status);
}
