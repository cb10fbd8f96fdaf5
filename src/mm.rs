//! User Address Space Model
//!
//! Defines the user/kernel split and the page-table lookup interface the
//! pointer validator relies on. Actual page-table management belongs to the
//! embedding kernel; this crate only needs to know which addresses a user
//! process may hand across the boundary and how to resolve them.
//!
//! # Address layout
//! - `[0, USER_FLOOR)` - null guard region, never valid for user pointers
//! - `[USER_FLOOR, USER_CEILING)` - user code/data
//! - `[USER_CEILING, ...)` - reserved for the kernel

use core::ptr::NonNull;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// First address reserved for the kernel. User pointers must lie below it.
pub const USER_CEILING: usize = 0xC000_0000;

/// Lowest address a user program may touch. Guards against null and
/// obviously-wrong small pointers.
pub const USER_FLOOR: usize = 0x0804_8000;

/// Check that an address falls inside the user region.
///
/// This is the cheap half of validation; it involves no page-table walk and
/// must be performed before any translation or dereference.
#[inline]
pub const fn is_user_addr(addr: usize) -> bool {
    addr >= USER_FLOOR && addr < USER_CEILING
}

/// A process's view of virtual memory, as supplied by the embedding kernel.
///
/// Implementations wrap whatever page-table structure the MMU layer keeps for
/// the process.
pub trait AddressSpace: Send + Sync {
    /// Resolve a user virtual address to a kernel-accessible pointer.
    ///
    /// Returns `None` if the containing page is not mapped to a present
    /// frame. Implementations must never fault: an unmapped address is an
    /// answer, not an error.
    ///
    /// Mappings are page-granular: a returned pointer is valid from `addr`
    /// up to the end of the containing page, and no further.
    fn translate(&self, addr: usize) -> Option<NonNull<u8>>;
}
