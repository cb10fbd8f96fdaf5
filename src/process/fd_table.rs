//! Per-Process Descriptor Table
//!
//! Maps small integer file descriptors to open file handles. Descriptors 0
//! and 1 are reserved for the console streams and never appear in the table;
//! file descriptors are allocated from a per-process monotonic counter
//! starting at 2, so a descriptor value is never reused while it is open.
//!
//! Lookup is a linear scan - per-process descriptor counts are small.

use alloc::vec::Vec;

use crate::fs::FileHandle;
use crate::kernel::Kernel;

/// Descriptor reserved for console input.
pub const STDIN_FD: i32 = 0;
/// Descriptor reserved for console output.
pub const STDOUT_FD: i32 = 1;

/// First descriptor value handed out for an opened file.
const FIRST_FILE_FD: i32 = 2;

/// One open file owned by the process.
struct OpenFile {
    fd: i32,
    handle: FileHandle,
}

/// The per-process descriptor table.
///
/// Private to the owning process; no locking against other processes is
/// needed (the `Process` wraps it in a mutex only to satisfy shared
/// ownership of the process object itself).
pub struct FdTable {
    next_fd: i32,
    files: Vec<OpenFile>,
}

impl FdTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            next_fd: FIRST_FILE_FD,
            files: Vec::new(),
        }
    }

    /// Open `path`, allocating the next unused descriptor.
    ///
    /// Returns `None` without allocating a descriptor if the filesystem
    /// cannot open the file. The filesystem call runs under the global
    /// filesystem mutex.
    pub fn open(&mut self, kernel: &Kernel, path: &str) -> Option<i32> {
        let handle = kernel.filesys().lock().open(path)?;
        let fd = self.next_fd;
        self.next_fd += 1;
        self.files.push(OpenFile { fd, handle });
        Some(fd)
    }

    /// Look up the file handle for a descriptor.
    pub fn lookup(&self, fd: i32) -> Option<FileHandle> {
        self.files.iter().find(|f| f.fd == fd).map(|f| f.handle)
    }

    /// Close a descriptor, releasing the underlying file object.
    ///
    /// Closing a descriptor that is not open is a no-op, not an error.
    pub fn close(&mut self, kernel: &Kernel, fd: i32) {
        if let Some(pos) = self.files.iter().position(|f| f.fd == fd) {
            let open = self.files.swap_remove(pos);
            kernel.filesys().lock().close(open.handle);
        }
    }

    /// Close every remaining descriptor.
    ///
    /// Called exactly once, at process termination; afterwards no file
    /// object owned by this process remains open. All handles are released
    /// under a single filesystem-mutex acquisition.
    pub fn close_all(&mut self, kernel: &Kernel) {
        let mut filesys = kernel.filesys().lock();
        for open in self.files.drain(..) {
            filesys.close(open.handle);
        }
    }

    /// Number of descriptors currently open.
    pub fn open_count(&self) -> usize {
        self.files.len()
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}
