//! Interval job scheduling
//!
//! Every polling job in the relayer is a fixed-interval tick with
//! skip-if-running semantics: a tick that fires while the previous pass is
//! still executing is dropped, never queued. The guard is a per-job atomic
//! flag; passes themselves run as plain sequential awaits.

use eyre::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Per-job single-flight guard.
pub struct JobGuard {
    running: AtomicBool,
}

/// RAII token proving the guard is held; releases on drop.
pub struct JobRun<'a> {
    guard: &'a JobGuard,
}

impl JobGuard {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Acquire the guard, or None if a pass is already in flight.
    pub fn try_acquire(&self) -> Option<JobRun<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(JobRun { guard: self })
        } else {
            None
        }
    }
}

impl Default for JobGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for JobRun<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

/// Run `pass` on a fixed interval until a shutdown signal arrives.
///
/// A failed pass is logged and the loop keeps ticking; the pass itself is
/// expected to contain failures to single chains/records.
pub async fn run_interval_job<F, Fut>(
    name: &'static str,
    interval: Duration,
    mut shutdown: mpsc::Receiver<()>,
    mut pass: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let guard = JobGuard::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(job = name, interval_ms = interval.as_millis() as u64, "Job started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(_run) = guard.try_acquire() else {
                    debug!(job = name, "Previous pass still running, skipping tick");
                    continue;
                };

                if let Err(e) = pass().await {
                    error!(job = name, error = %e, "Pass failed");
                }
            }
            _ = shutdown.recv() => {
                info!(job = name, "Shutdown signal received, stopping job");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[test]
    fn test_guard_is_exclusive() {
        let guard = JobGuard::new();
        let run = guard.try_acquire();
        assert!(run.is_some());
        assert!(guard.try_acquire().is_none());

        drop(run);
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_interval_job_runs_until_shutdown() {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let count = Arc::new(AtomicU32::new(0));
        let count_in_job = count.clone();

        let handle = tokio::spawn(run_interval_job(
            "counter",
            Duration::from_millis(10),
            shutdown_rx,
            move || {
                let count = count_in_job.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();

        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_failing_pass_does_not_stop_the_job() {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let count = Arc::new(AtomicU32::new(0));
        let count_in_job = count.clone();

        let handle = tokio::spawn(run_interval_job(
            "flaky",
            Duration::from_millis(10),
            shutdown_rx,
            move || {
                let count = count_in_job.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(eyre::eyre!("boom"))
                }
            },
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();

        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
