//! Lock aliases.
//!
//! `Sync*` locks are the blocking `parking_lot` locks. They are only held for
//! short, non-async critical sections.

/// A blocking mutex.
pub type SyncMutex<T> = parking_lot::Mutex<T>;
/// A blocking reader-writer lock.
pub type SyncRwLock<T> = parking_lot::RwLock<T>;
