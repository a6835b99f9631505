//! Lazily started shared handle that can be dropped and started again.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

pub(crate) struct Slot<T> {
    inner: Mutex<Option<Arc<T>>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Current handle, or a new one from `start`. The lock is held while
    /// starting so concurrent callers share one start.
    pub async fn get_or_start<F, Fut, E>(&self, start: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.inner.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }
        let handle = Arc::new(start().await?);
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Forget `stale` so the next call starts afresh. A handle another
    /// caller already put in its place is left alone.
    pub async fn discard(&self, stale: &Arc<T>) -> bool {
        let mut slot = self.inner.lock().await;
        match slot.as_ref() {
            Some(current) if Arc::ptr_eq(current, stale) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub async fn clear(&self) {
        self.inner.lock().await.take();
    }
}
