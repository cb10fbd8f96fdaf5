//! Synchronization primitives for the parent/child rendezvous.
//!
//! Mutual exclusion comes from `spin::Mutex`; this module adds the counting
//! semaphore used to block until a condition set by another thread holds.

mod semaphore;

pub use semaphore::Semaphore;
