//! Console Collaborator Interface
//!
//! Descriptors 0 and 1 are wired straight to the console, bypassing the
//! descriptor table. The read side is a blocking byte source (the embedding
//! kernel typically busy-polls its UART); the write side takes whole blocks
//! so a user `write` to stdout is emitted in one piece.

pub trait Console: Send + Sync {
    /// Read one byte, blocking until input is available.
    fn read_byte(&self) -> u8;

    /// Write a block of bytes to the console.
    fn write_bytes(&self, bytes: &[u8]);
}
