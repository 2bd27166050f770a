//! Per-screenshot mutual exclusion.
//!
//! Every operation that reads or rewrites a name's artifacts holds that name's
//! lock, so concurrent comparisons or approvals of the same screenshot run one
//! after another. Different names never block each other.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};

struct LockTable {
    held: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

static LOCKS: Lazy<LockTable> = Lazy::new(|| LockTable {
    held: Mutex::new(HashSet::new()),
    released: Condvar::new(),
});

/// Held while a name's artifacts are being touched; releases on drop
#[derive(Debug)]
pub struct NameGuard {
    key: PathBuf,
}

/// Block until the artifact set rooted at `baseline_path` is free, then take it
pub fn acquire(baseline_path: &Path) -> NameGuard {
    let key = std::path::absolute(baseline_path).unwrap_or_else(|_| baseline_path.to_path_buf());

    // A panic while holding the table mutex cannot corrupt the set itself
    let mut held = LOCKS.held.lock().unwrap_or_else(|e| e.into_inner());
    while held.contains(&key) {
        held = LOCKS.released.wait(held).unwrap_or_else(|e| e.into_inner());
    }
    held.insert(key.clone());
    NameGuard { key }
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        let mut held = LOCKS.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.key);
        LOCKS.released.notify_all();
    }
}
