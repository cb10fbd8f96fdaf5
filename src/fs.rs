//! Filesystem Collaborator Interface
//!
//! The on-disk filesystem is external to this layer; the boundary code only
//! consumes a small primitive set over opaque file handles. The filesystem is
//! **not** assumed reentrant: the trait object is stored inside the
//! [`Kernel`](crate::kernel::Kernel)'s global mutex, so every primitive call
//! below is serialized system-wide.

/// An opaque reference to an open file object, issued by the filesystem.
///
/// Handles are kernel-internal; user processes only ever see the small
/// per-process descriptors the [`FdTable`](crate::process::fd_table::FdTable)
/// maps onto these.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct FileHandle(u64);

impl FileHandle {
    /// Wrap a raw handle value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw handle value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// The primitive set consumed from the filesystem collaborator.
///
/// Failures are reported as `false`/`None`/short counts; implementations
/// must not panic on bad paths or stale handles.
pub trait FileSystem: Send {
    /// Create a file of the given initial size. Returns success.
    fn create(&mut self, path: &str, initial_size: usize) -> bool;

    /// Remove a file. Returns success.
    fn remove(&mut self, path: &str) -> bool;

    /// Open a file, returning a fresh handle, or `None` if it does not exist.
    fn open(&mut self, path: &str) -> Option<FileHandle>;

    /// Close a handle, releasing the underlying file object.
    fn close(&mut self, handle: FileHandle);

    /// Read from the handle's current position. Returns bytes read.
    fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> usize;

    /// Write at the handle's current position. Returns bytes written.
    fn write(&mut self, handle: FileHandle, buf: &[u8]) -> usize;

    /// Move the handle's position to `pos` (bytes from the start).
    fn seek(&mut self, handle: FileHandle, pos: usize);

    /// Current position of the handle.
    fn tell(&mut self, handle: FileHandle) -> usize;

    /// Length of the open file in bytes.
    fn length(&mut self, handle: FileHandle) -> usize;
}
