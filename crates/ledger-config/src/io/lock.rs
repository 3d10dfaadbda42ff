//! Cross-process lock file guarding the read-modify-write cycle.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use super::save::sibling_path;
use crate::error::{ConfigError, Result};

/// Timing knobs for [`StoreLock::acquire`].
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Give up after waiting this long.
    pub timeout: Duration,
    /// A lock file older than this is assumed abandoned and removed.
    pub stale_after: Duration,
    pub poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            stale_after: Duration::from_secs(30),
            poll_interval: Duration::from_millis(20),
        }
    }
}

/// Held lock; the lock file is removed on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Lock path for a store file (`kb.yaml` -> `kb.yaml.lock`).
    pub fn lock_path(store_path: &Path) -> PathBuf {
        sibling_path(store_path, ".lock")
    }

    pub fn acquire(store_path: &Path, options: LockOptions) -> Result<Self> {
        let path = Self::lock_path(store_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    // Owner info is for humans inspecting a stuck lock.
                    let _ = writeln!(file, "pid={}", std::process::id());
                    debug!(lock = %path.display(), "acquired store lock");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&path, options.stale_after) && break_stale(&path, options)? {
                        continue;
                    }
                    let waited = started.elapsed();
                    if waited >= options.timeout {
                        return Err(ConfigError::LockTimeout {
                            lock_path: path,
                            waited,
                        });
                    }
                    thread::sleep(options.poll_interval);
                }
                Err(e) => {
                    return Err(ConfigError::Io {
                        operation: "create lock",
                        path,
                        source: e,
                    });
                }
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

/// Remove `lock` if it is still stale, returning whether it was removed.
///
/// Breakers serialize on a `.break` guard file and re-check staleness while
/// holding it, so a lock created after another breaker removed the stale one
/// is never deleted.
fn break_stale(lock: &Path, options: LockOptions) -> Result<bool> {
    let guard = sibling_path(lock, ".break");
    match OpenOptions::new().write(true).create_new(true).open(&guard) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            // A breaker that died mid-break leaves its guard behind.
            if is_stale(&guard, options.stale_after) {
                warn!(guard = %guard.display(), "removing abandoned lock-break guard");
                remove_if_present(&guard)?;
            }
            return Ok(false);
        }
        Err(e) => {
            return Err(ConfigError::Io {
                operation: "create lock-break guard",
                path: guard,
                source: e,
            });
        }
    }

    let result = if is_stale(lock, options.stale_after) {
        warn!(lock = %lock.display(), "breaking stale store lock");
        remove_if_present(lock).map(|()| true)
    } else {
        Ok(false)
    };
    if let Err(e) = fs::remove_file(&guard) {
        warn!(guard = %guard.display(), error = %e, "failed to remove lock-break guard");
    }
    result
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::Io {
            operation: "remove stale lock",
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > stale_after)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    use super::*;
    use tempfile::tempdir;

    fn quick() -> LockOptions {
        LockOptions {
            timeout: Duration::from_millis(60),
            stale_after: Duration::from_secs(30),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn second_acquire_times_out_until_release() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("kb.yaml");

        let held = StoreLock::acquire(&store, quick()).unwrap();
        assert!(StoreLock::lock_path(&store).exists());
        let err = StoreLock::acquire(&store, quick()).unwrap_err();
        assert!(matches!(err, ConfigError::LockTimeout { .. }));

        drop(held);
        assert!(!StoreLock::lock_path(&store).exists());
        StoreLock::acquire(&store, quick()).unwrap();
    }

    #[test]
    fn stale_lock_is_broken() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("kb.yaml");
        fs::write(StoreLock::lock_path(&store), "pid=0\n").unwrap();

        let options = LockOptions {
            stale_after: Duration::ZERO,
            ..quick()
        };
        thread::sleep(Duration::from_millis(10));
        StoreLock::acquire(&store, options).unwrap();
        assert!(!sibling_path(&StoreLock::lock_path(&store), ".break").exists());
    }

    #[test]
    fn racing_breakers_never_share_the_lock() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("kb.yaml");
        fs::write(StoreLock::lock_path(&store), "pid=0\n").unwrap();
        let options = LockOptions {
            timeout: Duration::from_secs(5),
            stale_after: Duration::from_millis(200),
            poll_interval: Duration::from_millis(1),
        };
        thread::sleep(Duration::from_millis(250));

        let holders = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let start = Arc::new(Barrier::new(6));
        let workers: Vec<_> = (0..6)
            .map(|_| {
                let (store, holders, peak, start) =
                    (store.clone(), holders.clone(), peak.clone(), start.clone());
                thread::spawn(move || {
                    start.wait();
                    let lock = StoreLock::acquire(&store, options).unwrap();
                    let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    holders.fetch_sub(1, Ordering::SeqCst);
                    drop(lock);
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(!StoreLock::lock_path(&store).exists());
    }
}
