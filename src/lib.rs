//! Trapgate - User/Kernel Syscall Boundary Layer
//!
//! The software trap handler of a teaching operating system: user processes
//! request privileged services (process control, file I/O) by trapping into
//! the kernel, and this crate validates, dispatches and books those requests.
//!
//! # What lives here
//! - Pointer validation for every user-supplied address
//! - Per-process descriptor table (fd -> open file)
//! - Per-process child registry (exec/wait/exit rendezvous)
//! - The syscall dispatcher itself
//! - The global filesystem mutex
//!
//! # What does not
//! The scheduler, the filesystem, the MMU and the program loader are external
//! collaborators. This crate defines their interfaces (`Scheduler`,
//! `FileSystem`, `AddressSpace`, `ProcessLifecycle`, `Console`) and is handed
//! implementations when the [`Kernel`] is constructed. The trap entry stub
//! (register save/restore, mode switch) is the embedding kernel's job; it
//! calls [`syscall::dispatch`] with the trapped frame.
//!
//! # Security Model
//! - Every word read off the user stack is validated before use
//! - Every pointer argument is validated before it reaches a handler
//! - Buffer arguments are validated page-by-page across their whole range
//! - A validation failure kills the offending process, never the kernel

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod console;
pub mod fs;
pub mod kernel;
pub mod mm;
pub mod process;
pub mod sched;
pub mod sync;
pub mod syscall;

#[cfg(test)]
mod testkit;

pub use console::Console;
pub use fs::{FileHandle, FileSystem};
pub use kernel::Kernel;
pub use mm::AddressSpace;
pub use process::{Pid, Process};
pub use sched::{ProcessLifecycle, Scheduler};
pub use syscall::{SyscallOutcome, TrapFrame};
