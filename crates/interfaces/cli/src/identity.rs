//! Lazily resolved, process-wide agent identity.
//!
//! The identity lookup can be expensive (it may hit the provider), so it is
//! computed at most once per process behind a double-checked guard: check,
//! acquire, re-check, compute.  A failed compute leaves the slot empty so a
//! later call can retry.

use std::sync::RwLock;

use anyhow::Result;
use tokio::sync::Mutex;

pub struct LazyIdentity {
    value: RwLock<Option<String>>,
    init: Mutex<()>,
}

impl LazyIdentity {
    pub const fn new() -> Self {
        Self {
            value: RwLock::new(None),
            init: Mutex::const_new(()),
        }
    }

    /// Return the cached identity, computing it on first use.
    ///
    /// Concurrent first-users serialize on the init mutex; all but the
    /// winner find the value already present on the re-check and return
    /// without computing.
    pub async fn get_or_init<F, Fut>(&self, compute: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(id) = self.value.read().unwrap().clone() {
            return Ok(id);
        }
        let _guard = self.init.lock().await;
        if let Some(id) = self.value.read().unwrap().clone() {
            return Ok(id);
        }
        let id = compute().await?;
        *self.value.write().unwrap() = Some(id.clone());
        Ok(id)
    }
}

impl Default for LazyIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide agent identity, torn down only at process exit.
pub static AGENT_IDENTITY: LazyIdentity = LazyIdentity::new();

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_first_use_computes_exactly_once() {
        let identity = Arc::new(LazyIdentity::new());
        let computes = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let identity = identity.clone();
            let computes = computes.clone();
            handles.push(tokio::spawn(async move {
                identity
                    .get_or_init(|| async move {
                        computes.fetch_add(1, Ordering::SeqCst);
                        // Yield so racers pile up on the init mutex.
                        tokio::task::yield_now().await;
                        Ok("agent-1".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "agent-1");
        }
        assert_eq!(computes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_compute_is_retryable() {
        let identity = LazyIdentity::new();
        let err = identity
            .get_or_init(|| async { anyhow::bail!("lookup failed") })
            .await;
        assert!(err.is_err());

        let ok = identity
            .get_or_init(|| async { Ok("agent-2".to_string()) })
            .await
            .unwrap();
        assert_eq!(ok, "agent-2");
    }
}
