//! Scheduling and Process-Lifecycle Collaborator Interfaces
//!
//! The thread scheduler and the program loader are external to this layer.
//! The boundary code needs exactly two things from them: a way to give up the
//! CPU while waiting on a child, and a way to start a child running.

use alloc::sync::Arc;

use crate::kernel::Kernel;
use crate::process::Process;

/// Yield hook used by blocking waits (exec load, wait exit).
///
/// The kernel threads here are preemptive, so a pure spin would be correct
/// but wasteful; waiters call `yield_now` between polls.
pub trait Scheduler: Send + Sync {
    /// Give up the CPU to another runnable thread.
    fn yield_now(&self);
}

/// The process-creation collaborator: owns kernel-thread creation and the
/// program loader.
pub trait ProcessLifecycle: Send + Sync {
    /// Spawn a kernel thread that loads `cmdline`'s program image into
    /// `child`'s address space and runs it.
    ///
    /// The caller has already registered `child` in its parent's child
    /// registry, so the thread may run immediately. The thread must:
    /// 1. attempt the load and call [`Kernel::on_child_loaded`] exactly once
    ///    with the outcome, before executing any user code;
    /// 2. on load failure, terminate the child through
    ///    [`crate::process::exit`] with status -1.
    fn start(&self, kernel: Arc<Kernel>, child: Arc<Process>, cmdline: &str);
}
