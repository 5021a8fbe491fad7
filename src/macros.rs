//! Lock helpers shared by setup paths.
//! Nothing here is ever used on the sampling hot path.

/// Take a read lock, recovering the guard if a writer panicked.
#[cfg(not(feature = "parking_lot"))]
macro_rules! read_lock {
    ($lock:expr) => {
        $lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    };
}

/// Take a read lock.
#[cfg(feature = "parking_lot")]
macro_rules! read_lock {
    ($lock:expr) => {
        $lock.read()
    };
}

/// Take a write lock, recovering the guard if a writer panicked.
#[cfg(not(feature = "parking_lot"))]
macro_rules! write_lock {
    ($lock:expr) => {
        $lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    };
}

/// Take a write lock.
#[cfg(feature = "parking_lot")]
macro_rules! write_lock {
    ($lock:expr) => {
        $lock.write()
    };
}
