//! Named-thread task pool with cooperative cancellation.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::error::{RaceError, Result};

/// Shared cancellation flag observed by every task at its suspension points.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake any task sleeping on the token.
    pub fn cancel(&self) {
        let (flag, wake) = &*self.inner;
        let mut guard = flag.lock().expect("cancel token mutex poisoned");
        *guard = true;
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().expect("cancel token mutex poisoned")
    }

    /// Sleep for `duration` unless cancelled first.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let (flag, wake) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut guard = flag.lock().expect("cancel token mutex poisoned");
        loop {
            if *guard {
                return Err(RaceError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            // Spurious wakeups fall through to the deadline check.
            guard = wake
                .wait_timeout(guard, deadline - now)
                .expect("condvar wait failed")
                .0;
        }
    }
}

/// Launches one thread per task and cancels them together.
pub struct TaskPool {
    cancel: CancelToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskPool {
    pub fn new() -> Self {
        Self {
            cancel: CancelToken::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Start `task` on a new named thread.
    pub fn run<F>(&self, name: impl Into<String>, task: F) -> Result<()>
    where
        F: FnOnce(CancelToken) -> Result<()> + Send + 'static,
    {
        let name = name.into();
        let token = self.cancel.clone();
        let task_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || match task(token) {
                Ok(()) => debug!(task = %task_name, "task finished"),
                Err(err) if err.is_cancelled() => debug!(task = %task_name, "task cancelled"),
                Err(err) => error!(task = %task_name, error = %err, "task failed"),
            })
            .map_err(|source| RaceError::Spawn { name, source })?;
        self.handles
            .lock()
            .expect("task pool mutex poisoned")
            .push(handle);
        Ok(())
    }

    /// Number of launched tasks that have not been joined.
    pub fn len(&self) -> usize {
        self.handles.lock().expect("task pool mutex poisoned").len()
    }

    /// Join every task, cancelling them first when `cancel_in_flight` is set.
    ///
    /// Returns the number of tasks that panicked.
    pub fn shutdown(&self, cancel_in_flight: bool) -> usize {
        if cancel_in_flight {
            self.cancel.cancel();
        }
        let handles: Vec<_> = self
            .handles
            .lock()
            .expect("task pool mutex poisoned")
            .drain(..)
            .collect();
        let mut panicked = 0;
        for handle in handles {
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            if handle.join().is_err() {
                warn!(task = %name, "task panicked");
                panicked += 1;
            }
        }
        panicked
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn sleep_returns_early_on_cancel() {
        let token = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let sleeper = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let result = sleeper.sleep(Duration::from_secs(30));
            tx.send((result.is_err(), start.elapsed())).expect("send result");
        });

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let (cancelled, elapsed) = rx
            .recv_timeout(Duration::from_secs(1))
            .expect("sleeper did not wake");
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
        handle.join().expect("sleeper thread panicked");
    }

    #[test]
    fn sleep_completes_without_cancel() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(5)).is_ok());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn shutdown_cancels_and_joins_all_tasks() {
        let pool = TaskPool::new();
        let exited = Arc::new(AtomicUsize::new(0));
        for i in 0..4 {
            let exited = Arc::clone(&exited);
            pool.run(format!("worker-{i}"), move |token| {
                let result = token.sleep(Duration::from_secs(60));
                exited.fetch_add(1, Ordering::SeqCst);
                result
            })
            .expect("spawn worker");
        }
        assert_eq!(pool.len(), 4);

        let panicked = pool.shutdown(true);
        assert_eq!(panicked, 0);
        assert_eq!(exited.load(Ordering::SeqCst), 4);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn shutdown_without_cancel_waits_for_completion() {
        let pool = TaskPool::new();
        let (tx, rx) = mpsc::channel();
        pool.run("short", move |_| {
            tx.send(7).expect("send");
            Ok(())
        })
        .expect("spawn");
        assert_eq!(pool.shutdown(false), 0);
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).expect("recv"), 7);
    }

    #[test]
    fn shutdown_counts_panicked_tasks() {
        let pool = TaskPool::new();
        pool.run("boom", |_| panic!("boom")).expect("spawn");
        assert_eq!(pool.shutdown(false), 1);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let pool = TaskPool::new();
        assert_eq!(pool.shutdown(true), 0);
        assert_eq!(pool.shutdown(true), 0);
    }
}
