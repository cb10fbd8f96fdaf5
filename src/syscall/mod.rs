//! System Call Interface
//!
//! The trap entry stub of the embedding kernel suspends the user process,
//! snapshots its registers and calls [`dispatch`] with a [`TrapFrame`]. The
//! dispatcher validates every word it touches, routes to a handler and
//! writes the result back into the frame.
//!
//! # ABI
//! The syscall number and its arguments are consecutive machine words
//! starting at the trapped user stack pointer. The return value (when the
//! syscall has one) is written to the frame's return-value slot; syscalls
//! without one leave it untouched.
//!
//! # Security Model
//! - Whitelist approach: an unknown syscall number kills the caller
//! - Every stack word and pointer argument is validated before use
//! - Validation failure terminates the offending process, never the kernel
//!
//! # Syscalls
//! - 0: halt() - power the machine off
//! - 1: exit(status) - terminate the calling process
//! - 2: exec(cmdline) - spawn a child, blocking until its load outcome
//! - 3: wait(pid) - collect a child's exit status
//! - 4: create(path, size) / 5: remove(path) - filesystem metadata
//! - 6: open(path) - descriptor allocation
//! - 7: filesize(fd), 8: read(fd, buf, n), 9: write(fd, buf, n),
//!   10: seek(fd, pos), 11: tell(fd), 12: close(fd) - file I/O

mod handler;
mod validate;

pub use handler::dispatch;
pub use validate::{check_buffer, copy_in, copy_in_cstr, copy_out, read_word, Fault};

/// System call numbers. Fixed ABI; the values are consumed bit-for-bit from
/// the user-side syscall stubs.
pub mod numbers {
    pub const SYS_HALT: usize = 0;
    pub const SYS_EXIT: usize = 1;
    pub const SYS_EXEC: usize = 2;
    pub const SYS_WAIT: usize = 3;
    pub const SYS_CREATE: usize = 4;
    pub const SYS_REMOVE: usize = 5;
    pub const SYS_OPEN: usize = 6;
    pub const SYS_FILESIZE: usize = 7;
    pub const SYS_READ: usize = 8;
    pub const SYS_WRITE: usize = 9;
    pub const SYS_SEEK: usize = 10;
    pub const SYS_TELL: usize = 11;
    pub const SYS_CLOSE: usize = 12;
}

/// The error sentinel returned to user code for recoverable failures.
/// Distinct from every valid success value (pids, descriptors, byte counts
/// and positions are all non-negative).
pub const ERROR: isize = -1;

/// Size of one machine word; the unit of the syscall argument layout.
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// The register snapshot the trap entry hands to the dispatcher.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TrapFrame {
    /// The trapped user stack pointer; the syscall number and arguments are
    /// read from the user stack starting here.
    pub user_sp: usize,
    /// The return-value register slot, written back to the user on resume.
    pub return_value: usize,
}

/// What the trap glue must do after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Resume the user process with the (possibly updated) frame.
    Resume,
    /// The process terminated (exit syscall or a validation kill) with this
    /// status; its resources are already released. Do not resume it.
    Exit(i32),
    /// Power the machine off. Never resume.
    Halt,
}
