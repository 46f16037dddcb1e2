use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{PriceLoader, PriceTable};
use crate::error::Result;

/// Prices handed out by [`PriceCache::get`]
#[derive(Debug, Clone)]
pub struct CachedPrices {
    pub table: Arc<PriceTable>,
    /// True when this call reloaded the table
    pub fresh: bool,
}

pub struct PriceCache {
    loader: Arc<dyn PriceLoader>,
    refresh: Duration,
    state: Mutex<Option<(Instant, Arc<PriceTable>)>>,
}

impl PriceCache {
    pub fn new(loader: Arc<dyn PriceLoader>, refresh: Duration) -> Self {
        Self {
            loader,
            refresh,
            state: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.loader.name()
    }

    /// Current prices, reloading them when missing or older than the refresh interval.
    ///
    /// A failed reload is returned as an error; the previous table is not reused.
    pub async fn get(&self) -> Result<CachedPrices> {
        let mut state = self.state.lock().await;

        if let Some((loaded_at, table)) = state.as_ref() {
            if loaded_at.elapsed() < self.refresh {
                return Ok(CachedPrices {
                    table: Arc::clone(table),
                    fresh: false,
                });
            }
        }

        tracing::info!("Refreshing {} prices", self.loader.name());
        let table = Arc::new(self.loader.load().await?);
        *state = Some((Instant::now(), Arc::clone(&table)));

        Ok(CachedPrices { table, fresh: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BillingError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
        fail_after: usize,
    }

    #[async_trait]
    impl PriceLoader for CountingLoader {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn load(&self) -> Result<PriceTable> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.fail_after {
                return Err(BillingError::ParseError("unavailable".to_string()));
            }
            Ok(PriceTable::default())
        }
    }

    fn loader(fail_after: usize) -> Arc<CountingLoader> {
        Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            fail_after,
        })
    }

    #[tokio::test]
    async fn test_reuses_table_within_refresh_interval() {
        let loader = loader(usize::MAX);
        let cache = PriceCache::new(loader.clone(), Duration::from_secs(3600));

        assert!(cache.get().await.unwrap().fresh);
        assert!(!cache.get().await.unwrap().fresh);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reloads_stale_table() {
        let loader = loader(usize::MAX);
        let cache = PriceCache::new(loader.clone(), Duration::ZERO);

        cache.get().await.unwrap();
        assert!(cache.get().await.unwrap().fresh);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_reload_is_not_hidden() {
        let cache = PriceCache::new(loader(1), Duration::ZERO);

        cache.get().await.unwrap();
        assert!(cache.get().await.is_err());
    }
}
