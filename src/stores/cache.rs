use std::future::Future;

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Loaded,
    Stale,
}

/// In-memory copy of a persisted value.
///
/// Reads go through [`Cached::get_or_load`], which loads on first use and
/// again after [`Cached::invalidate`]. Writers persist first and then call
/// [`Cached::set`], so a reader never sees an older value than the last write.
#[derive(Debug)]
pub enum Cached<T> {
    Uninitialized,
    Loaded(T),
    Stale,
}

impl<T> Cached<T> {
    pub fn new() -> Self {
        Cached::Uninitialized
    }

    pub fn state(&self) -> CacheState {
        match self {
            Cached::Uninitialized => CacheState::Uninitialized,
            Cached::Loaded(_) => CacheState::Loaded,
            Cached::Stale => CacheState::Stale,
        }
    }

    /// Returns the cached value, awaiting `load` only when nothing is loaded.
    /// A failed load leaves the state unchanged.
    pub async fn get_or_load<F>(&mut self, load: F) -> Result<&mut T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.state() != CacheState::Loaded {
            *self = Cached::Loaded(load.await?);
        }

        match self {
            Cached::Loaded(value) => Ok(value),
            Cached::Uninitialized | Cached::Stale => unreachable!("cache was just loaded"),
        }
    }

    pub fn set(&mut self, value: T) {
        *self = Cached::Loaded(value);
    }

    pub fn invalidate(&mut self) {
        if let Cached::Loaded(_) = self {
            *self = Cached::Stale;
        }
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Cached::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::{CacheState, Cached};
    use crate::error::{Error, Result};

    async fn counted(loads: &AtomicU32, value: u32) -> Result<u32> {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn loads_once_until_invalidated() {
        let loads = AtomicU32::new(0);
        let mut cache = Cached::new();
        assert_eq!(cache.state(), CacheState::Uninitialized);

        assert_eq!(*cache.get_or_load(counted(&loads, 1)).await.unwrap(), 1);
        assert_eq!(*cache.get_or_load(counted(&loads, 2)).await.unwrap(), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(), CacheState::Loaded);

        cache.invalidate();
        assert_eq!(cache.state(), CacheState::Stale);
        assert_eq!(*cache.get_or_load(counted(&loads, 3)).await.unwrap(), 3);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn set_skips_the_loader() {
        let loads = AtomicU32::new(0);
        let mut cache = Cached::new();
        cache.set(7);
        assert_eq!(*cache.get_or_load(counted(&loads, 1)).await.unwrap(), 7);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalidate_before_load_is_a_no_op() {
        let mut cache = Cached::<u32>::new();
        cache.invalidate();
        assert_eq!(cache.state(), CacheState::Uninitialized);
    }

    #[tokio::test]
    async fn failed_load_keeps_state() {
        let mut cache = Cached::<u32>::new();
        cache.set(1);
        cache.invalidate();
        let result = cache
            .get_or_load(async { Err(Error::InvalidHash("x".to_owned())) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.state(), CacheState::Stale);
    }
}
