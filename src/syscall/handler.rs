//! System Call Handler
//!
//! Dispatches system calls and implements the individual handlers.
//!
//! # Security Considerations
//! - The trapped stack pointer is validated before anything is read off it
//! - Each argument word is validated individually before interpretation
//! - Pointer arguments are resolved through validated page-chunked copies
//! - Unknown syscall numbers kill the caller
//! - Anything that touches the filesystem holds the global filesystem mutex
//!   for the duration of the primitive call

use alloc::sync::Arc;
use alloc::vec;

use crate::kernel::Kernel;
use crate::process::{self, Pid, Process, KILLED_STATUS, STDIN_FD, STDOUT_FD};
use crate::syscall::numbers::*;
use crate::syscall::validate::{self, Fault};
use crate::syscall::{SyscallOutcome, TrapFrame, ERROR, WORD_SIZE};

/// Dispatch the syscall described by `frame` on behalf of `process`.
///
/// Reads the syscall number and arguments off the trapped user stack, routes
/// to the matching handler and stores its result (if the syscall produces
/// one) into the frame's return-value slot.
///
/// Any validation failure along the way - including an invalid stack
/// pointer, a bad argument word or an unmapped buffer byte - terminates the
/// calling process with the kill status, exactly as if it had called
/// exit(-1). The kernel itself never faults on user input.
pub fn dispatch(kernel: &Arc<Kernel>, process: &Arc<Process>, frame: &mut TrapFrame) -> SyscallOutcome {
    match dispatch_checked(kernel, process, frame) {
        Ok(outcome) => outcome,
        Err(Fault) => {
            log::debug!("killing {} (pid {}): bad syscall input", process.name(), process.pid());
            process::exit(kernel, process, KILLED_STATUS);
            SyscallOutcome::Exit(KILLED_STATUS)
        }
    }
}

fn dispatch_checked(
    kernel: &Arc<Kernel>,
    proc: &Arc<Process>,
    frame: &mut TrapFrame,
) -> Result<SyscallOutcome, Fault> {
    let sp = frame.user_sp;
    let number = validate::read_word(proc, sp)?;
    let arg = |n: usize| validate::read_word(proc, sp + (n + 1) * WORD_SIZE);

    let result: isize = match number {
        SYS_HALT => return Ok(SyscallOutcome::Halt),

        SYS_EXIT => {
            let status = arg(0)? as i32;
            process::exit(kernel, proc, status);
            return Ok(SyscallOutcome::Exit(status));
        }

        SYS_EXEC => {
            let cmdline = validate::copy_in_cstr(proc, arg(0)?)?;
            sys_exec(kernel, proc, &cmdline)
        }

        SYS_WAIT => sys_wait(kernel, proc, Pid::from_raw(arg(0)? as u64)),

        SYS_CREATE => {
            let path = validate::copy_in_cstr(proc, arg(0)?)?;
            let size = arg(1)?;
            kernel.filesys().lock().create(&path, size) as isize
        }

        SYS_REMOVE => {
            let path = validate::copy_in_cstr(proc, arg(0)?)?;
            kernel.filesys().lock().remove(&path) as isize
        }

        SYS_OPEN => {
            let path = validate::copy_in_cstr(proc, arg(0)?)?;
            sys_open(kernel, proc, &path)
        }

        SYS_FILESIZE => sys_filesize(kernel, proc, arg(0)? as i32),

        SYS_READ => {
            let (fd, buf, len) = (arg(0)? as i32, arg(1)?, arg(2)?);
            validate::check_buffer(proc, buf, len)?;
            sys_read(kernel, proc, fd, buf, len)?
        }

        SYS_WRITE => {
            let (fd, buf, len) = (arg(0)? as i32, arg(1)?, arg(2)?);
            validate::check_buffer(proc, buf, len)?;
            sys_write(kernel, proc, fd, buf, len)?
        }

        SYS_SEEK => {
            sys_seek(kernel, proc, arg(0)? as i32, arg(1)?);
            return Ok(SyscallOutcome::Resume);
        }

        SYS_TELL => sys_tell(kernel, proc, arg(0)? as i32),

        SYS_CLOSE => {
            proc.files().lock().close(kernel, arg(0)? as i32);
            return Ok(SyscallOutcome::Resume);
        }

        _ => {
            log::warn!("unknown syscall number {} from pid {}", number, proc.pid());
            return Err(Fault);
        }
    };

    frame.return_value = result as usize;
    Ok(SyscallOutcome::Resume)
}

/// Spawn a child and report its pid, or the error sentinel if creation or
/// load failed. Blocks until the load outcome is known.
fn sys_exec(kernel: &Arc<Kernel>, proc: &Arc<Process>, cmdline: &str) -> isize {
    match process::execute(kernel, proc, cmdline) {
        Some(pid) => pid.as_raw() as isize,
        None => ERROR,
    }
}

/// Collect a child's exit status; the sentinel for a non-child or an
/// already-waited pid.
fn sys_wait(kernel: &Arc<Kernel>, proc: &Arc<Process>, pid: Pid) -> isize {
    match process::wait(kernel, proc, pid) {
        Some(status) => status as isize,
        None => ERROR,
    }
}

/// Open a file, allocating the next descriptor.
fn sys_open(kernel: &Kernel, proc: &Process, path: &str) -> isize {
    match proc.files().lock().open(kernel, path) {
        Some(fd) => fd as isize,
        None => ERROR,
    }
}

/// Length of an open file; the sentinel for an unknown descriptor.
fn sys_filesize(kernel: &Kernel, proc: &Process, fd: i32) -> isize {
    match proc.files().lock().lookup(fd) {
        Some(handle) => kernel.filesys().lock().length(handle) as isize,
        None => ERROR,
    }
}

/// Read into a user buffer: from the console for descriptor 0, from an open
/// file otherwise. The buffer range was validated by the dispatcher; data is
/// staged through a kernel buffer and copied out page by page.
fn sys_read(
    kernel: &Kernel,
    proc: &Process,
    fd: i32,
    buf: usize,
    len: usize,
) -> Result<isize, Fault> {
    if fd == STDIN_FD {
        let mut data = vec![0u8; len];
        for byte in data.iter_mut() {
            *byte = kernel.console().read_byte();
        }
        validate::copy_out(proc, buf, &data)?;
        return Ok(len as isize);
    }

    let Some(handle) = proc.files().lock().lookup(fd) else {
        return Ok(ERROR);
    };
    let mut data = vec![0u8; len];
    let read = kernel.filesys().lock().read(handle, &mut data);
    validate::copy_out(proc, buf, &data[..read])?;
    Ok(read as isize)
}

/// Write from a user buffer: to the console for descriptor 1, to an open
/// file otherwise.
fn sys_write(
    kernel: &Kernel,
    proc: &Process,
    fd: i32,
    buf: usize,
    len: usize,
) -> Result<isize, Fault> {
    let data = validate::copy_in(proc, buf, len)?;
    if fd == STDOUT_FD {
        kernel.console().write_bytes(&data);
        return Ok(len as isize);
    }

    let Some(handle) = proc.files().lock().lookup(fd) else {
        return Ok(ERROR);
    };
    let written = kernel.filesys().lock().write(handle, &data);
    Ok(written as isize)
}

/// Move an open file's position. Silent no-op on an unknown descriptor.
fn sys_seek(kernel: &Kernel, proc: &Process, fd: i32, pos: usize) {
    if let Some(handle) = proc.files().lock().lookup(fd) {
        kernel.filesys().lock().seek(handle, pos);
    }
}

/// Current position of an open file; the sentinel for an unknown descriptor.
fn sys_tell(kernel: &Kernel, proc: &Process, fd: i32) -> isize {
    match proc.files().lock().lookup(fd) {
        Some(handle) => kernel.filesys().lock().tell(handle) as isize,
        None => ERROR,
    }
}
