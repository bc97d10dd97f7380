//! Bounded-concurrency admission for backing-store lookups.
//!
//! # Responsibilities
//! - Cap concurrent lookups at `max_concurrent`
//! - Fail immediately with `PoolExhausted` when the cap is reached
//! - Race each lookup against a deadline

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::config::AdmissionConfig;
use crate::error::{StoreError, StoreResult};
use crate::observability::metrics;

/// A slot for one in-flight lookup.
///
/// Dropping the permit releases the slot, so every exit path releases
/// exactly once.
#[derive(Debug)]
pub struct LookupPermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdmissionStats {
    pub active: usize,
    pub max: usize,
    pub rejected_total: u64,
    pub timeouts_total: u64,
}

#[derive(Debug)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    max: usize,
    timeout: Duration,
    rejected: AtomicU64,
    timeouts: AtomicU64,
}

impl AdmissionGate {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max: max_concurrent,
            timeout,
            rejected: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.max_concurrent, config.lookup_timeout())
    }

    /// Take a slot without waiting.
    pub fn try_acquire(&self) -> StoreResult<LookupPermit> {
        match self.permits.clone().try_acquire_owned() {
            Ok(permit) => Ok(LookupPermit { _permit: permit }),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                metrics::record_admission_rejected();
                tracing::warn!(max = self.max, "Lookup rejected, admission gate exhausted");
                Err(StoreError::PoolExhausted(self.max))
            }
        }
    }

    /// Race `lookup` against the configured deadline.
    ///
    /// On timeout the lookup future is dropped, cancelling the underlying call.
    pub async fn with_timeout<F, T>(&self, lookup: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result,
            Err(_) => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                Err(StoreError::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }

    /// Acquire a slot, run the lookup under the deadline, release the slot.
    pub async fn run<F, T>(&self, lookup: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let permit = self.try_acquire()?;
        let result = self.with_timeout(lookup).await;
        drop(permit);
        result
    }

    /// Lookups currently holding a slot.
    pub fn active(&self) -> usize {
        self.max - self.permits.available_permits()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            active: self.active(),
            max: self.max,
            rejected_total: self.rejected.load(Ordering::Relaxed),
            timeouts_total: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use crate::error::ErrorKind;

    #[test]
    fn test_fail_fast_when_exhausted() {
        let gate = AdmissionGate::new(2, Duration::from_secs(5));
        let a = gate.try_acquire().unwrap();
        let _b = gate.try_acquire().unwrap();
        assert_eq!(gate.active(), 2);

        let err = gate.try_acquire().unwrap_err();
        assert_eq!(ErrorKind::classify(&err), ErrorKind::PoolExhausted);

        drop(a);
        assert_eq!(gate.active(), 1);
        assert!(gate.try_acquire().is_ok());
        assert_eq!(gate.stats().rejected_total, 1);
    }

    #[tokio::test]
    async fn test_timeout_wins_even_if_lookup_would_succeed() {
        let gate = AdmissionGate::new(1, Duration::from_millis(50));
        let result: StoreResult<&str> = gate
            .run(async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok("late")
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(ErrorKind::classify(&err), ErrorKind::Timeout);
        assert_eq!(gate.active(), 0, "permit released on timeout");
        assert_eq!(gate.stats().timeouts_total, 1);
    }

    #[tokio::test]
    async fn test_permit_released_on_error() {
        let gate = AdmissionGate::new(1, Duration::from_secs(1));
        let result: StoreResult<()> = gate
            .run(async { Err(StoreError::ConnectionRefused("db down".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(gate.active(), 0);
        assert_eq!(gate.run(async { Ok(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_timed_out_lookup_is_cancelled() {
        let gate = AdmissionGate::new(1, Duration::from_millis(20));
        let finished = Arc::new(AtomicUsize::new(0));
        let f = finished.clone();
        let _ = gate
            .run(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                f.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_max_concurrent() {
        let gate = Arc::new(AdmissionGate::new(3, Duration::from_secs(5)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..30)
            .map(|_| {
                let gate = gate.clone();
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    gate.run(async {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
                })
            })
            .collect();

        let mut exhausted = 0;
        for task in tasks {
            if let Err(err) = task.await.unwrap() {
                assert_eq!(ErrorKind::classify(&err), ErrorKind::PoolExhausted);
                exhausted += 1;
            }
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(exhausted > 0, "some lookups must be refused");
        assert_eq!(gate.active(), 0);
    }
}
