use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};

/// Exclusive writer lock on an index location.
///
/// Every acquisition opens its own file description, so the lock excludes
/// other threads of this process as well as other processes. Released on drop.
#[derive(Debug)]
pub struct FileLock {
    pub file: File,
    pub path: PathBuf,
}

impl FileLock {
    /// Acquires the lock, polling with a doubling backoff. `None` waits
    /// forever; an elapsed deadline fails with `IndexWriteLocked`.
    pub fn acquire(path: &Path, timeout: Option<Duration>, config: &Config) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut wait = config.lock_poll_interval;
        let mut attempts = 0u64;

        loop {
            if try_lock_exclusive(&file)? {
                debug!(path = %path.display(), attempts, "writer lock acquired");
                return Ok(FileLock { file, path: path.to_path_buf() });
            }
            attempts += 1;
            if attempts == 2 {
                warn!(path = %path.display(), "writer lock is contended, waiting");
            }

            let now = Instant::now();
            if let Some(deadline) = deadline {
                if now >= deadline {
                    return Err(Error::new(
                        ErrorKind::IndexWriteLocked,
                        format!("index {} is locked for writing", path.display()),
                    ));
                }
                thread::sleep(wait.min(deadline - now));
            } else {
                thread::sleep(wait);
            }
            wait = (wait * 2).min(config.lock_max_backoff);
        }
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> Result<bool> {
    use std::os::unix::io::AsRawFd;
    use libc::{flock, LOCK_EX, LOCK_NB, EWOULDBLOCK};

    let fd = file.as_raw_fd();
    let rc = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }

    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == EWOULDBLOCK => Ok(false),
        Some(code) if code == libc::EINTR => Ok(false),
        _ => Err(err.into()),
    }
}

#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> Result<bool> {
    Err(Error::new(ErrorKind::Io, "writer locking is only supported on unix"))
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }
        debug!(path = %self.path.display(), "writer lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_acquisition_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("writer.lock");
        let config = Config::default();

        let held = FileLock::acquire(&path, None, &config).unwrap();
        let err = FileLock::acquire(&path, Some(Duration::from_millis(50)), &config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexWriteLocked);

        let zero = FileLock::acquire(&path, Some(Duration::ZERO), &config).unwrap_err();
        assert_eq!(zero.kind, ErrorKind::IndexWriteLocked);

        drop(held);
        assert!(FileLock::acquire(&path, Some(Duration::ZERO), &config).is_ok());
    }

    #[test]
    fn blocking_acquisition_serializes_threads() {
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("writer.lock"));
        let inside = Arc::new(AtomicUsize::new(0));
        let config = Config::default();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = Arc::clone(&path);
                let inside = Arc::clone(&inside);
                let config = config.clone();
                thread::spawn(move || {
                    let _lock = FileLock::acquire(&path, None, &config).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
