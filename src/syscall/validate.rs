//! System Call Input Validation
//!
//! Every address a user process hands across the trap boundary goes through
//! here before the kernel dereferences anything.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: a bad address kills the calling process, never the kernel
//! - Cheap checks first: region bounds and overflow are tested before any
//!   page-table lookup, and the lookup itself never faults
//! - Whole ranges, not first bytes: a buffer is walked page by page, because
//!   a range can start in a mapped page and cross into an unmapped one
//!
//! User memory is never accessed in place by handlers; it is copied into (or
//! out of) kernel buffers here, through per-page translations, so a handler
//! can never be handed an unvalidated pointer.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::mm::{is_user_addr, PAGE_MASK, PAGE_SIZE, USER_CEILING, USER_FLOOR};
use crate::process::Process;
use crate::syscall::WORD_SIZE;

/// Longest C string accepted from user space (paths and command lines).
pub const CSTR_MAX: usize = PAGE_SIZE;

/// A fatal validation failure.
///
/// Propagated with `?` up to the dispatcher, which terminates the calling
/// process exactly as if it had invoked exit with the kill status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault;

/// Check that `[addr, addr + len)` lies entirely inside the user region.
///
/// This is the cheap half of buffer validation: bounds and overflow only, no
/// page-table lookups.
fn check_range(addr: usize, len: usize) -> Result<(), Fault> {
    if len == 0 {
        return Ok(());
    }
    let end = addr.checked_add(len).ok_or(Fault)?;
    if addr < USER_FLOOR || end > USER_CEILING {
        return Err(Fault);
    }
    Ok(())
}

/// Validate a single user address: region bounds plus a present mapping.
pub fn check_addr(process: &Process, addr: usize) -> Result<(), Fault> {
    if !is_user_addr(addr) {
        return Err(Fault);
    }
    process.translate(addr).map(|_| ()).ok_or(Fault)
}

/// Validate every page touched by `[addr, addr + len)`.
///
/// A single unmapped page anywhere in the range invalidates the whole
/// buffer, even if `addr` itself is mapped.
pub fn check_buffer(process: &Process, addr: usize, len: usize) -> Result<(), Fault> {
    check_range(addr, len)?;
    if len == 0 {
        return Ok(());
    }
    let mut page = addr & !PAGE_MASK;
    let last_page = (addr + len - 1) & !PAGE_MASK;
    loop {
        // The first probe uses `addr` itself; page bases below USER_FLOOR
        // are fine as long as the actual range starts above it.
        let probe = core::cmp::max(page, addr);
        process.translate(probe).ok_or(Fault)?;
        if page == last_page {
            return Ok(());
        }
        page += PAGE_SIZE;
    }
}

/// Copy `len` bytes from user space into a kernel buffer.
///
/// The range is validated as it is walked; any unmapped page faults the
/// caller and nothing is returned.
pub fn copy_in(process: &Process, addr: usize, len: usize) -> Result<Vec<u8>, Fault> {
    check_range(addr, len)?;
    let mut buf = vec![0u8; len];
    let mut done = 0;
    while done < len {
        let cur = addr + done;
        let src = process.translate(cur).ok_or(Fault)?;
        let chunk = core::cmp::min(len - done, PAGE_SIZE - (cur & PAGE_MASK));
        // SAFETY: `src` was just translated, and per the AddressSpace
        // contract it is valid for `chunk` bytes (to the end of the page).
        // The destination is a kernel-owned Vec of at least `len` bytes.
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr(), buf.as_mut_ptr().add(done), chunk);
        }
        done += chunk;
    }
    Ok(buf)
}

/// Copy a kernel buffer out to user space at `addr`.
pub fn copy_out(process: &Process, addr: usize, data: &[u8]) -> Result<(), Fault> {
    check_range(addr, data.len())?;
    let mut done = 0;
    while done < data.len() {
        let cur = addr + done;
        let dst = process.translate(cur).ok_or(Fault)?;
        let chunk = core::cmp::min(data.len() - done, PAGE_SIZE - (cur & PAGE_MASK));
        // SAFETY: `dst` was just translated and is valid for `chunk` bytes;
        // the source is a kernel slice of at least `done + chunk` bytes.
        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr().add(done), dst.as_ptr(), chunk);
        }
        done += chunk;
    }
    Ok(())
}

/// Read one machine word from user space.
///
/// Used for the syscall number and every argument word on the trapped user
/// stack. A word may straddle a page boundary; both pages are validated.
pub fn read_word(process: &Process, addr: usize) -> Result<usize, Fault> {
    let bytes = copy_in(process, addr, WORD_SIZE)?;
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(&bytes);
    Ok(usize::from_ne_bytes(word))
}

/// Copy a NUL-terminated string from user space.
///
/// Walks the string one page at a time, validating each page before reading
/// it. Faults the caller if the string leaves the user region, exceeds
/// [`CSTR_MAX`] without a terminator, or is not valid UTF-8 (kernel-side
/// paths and command lines are `str`).
pub fn copy_in_cstr(process: &Process, addr: usize) -> Result<String, Fault> {
    let mut out = Vec::new();
    let mut cur = addr;
    loop {
        if !is_user_addr(cur) {
            return Err(Fault);
        }
        let src = process.translate(cur).ok_or(Fault)?;
        let page_rest = PAGE_SIZE - (cur & PAGE_MASK);
        for i in 0..page_rest {
            // SAFETY: `src` is valid through the end of the page, and
            // `i < page_rest` keeps the read inside it.
            let byte = unsafe { src.as_ptr().add(i).read() };
            if byte == 0 {
                return String::from_utf8(out).map_err(|_| Fault);
            }
            if out.len() == CSTR_MAX {
                return Err(Fault);
            }
            out.push(byte);
        }
        cur += page_rest;
    }
}
