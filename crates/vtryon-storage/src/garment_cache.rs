//! Cache of background-removed garment images.
//!
//! Entries are kept in insertion order and evicted oldest-first by [`GarmentCache::trim`].
//! Reads do not refresh an entry, so this is FIFO rather than LRU. The cache
//! may exceed its capacity between trims.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbaImage;
use tracing::debug;

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Arc<RgbaImage>>,
    order: VecDeque<String>,
}

/// Process-local garment image cache.
pub struct GarmentCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl GarmentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &str) -> Option<Arc<RgbaImage>> {
        self.lock().entries.get(key).cloned()
    }

    /// Return the cached image or compute, store and return it.
    ///
    /// `compute` runs without the lock held. Failures are returned as-is and
    /// nothing is stored. If another request filled the key meanwhile, the
    /// earlier value wins.
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<Arc<RgbaImage>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RgbaImage, E>>,
    {
        if let Some(hit) = self.get(key) {
            metrics::counter!("vtryon_garment_cache_hits_total").increment(1);
            debug!(key = %key, "Garment cache hit");
            return Ok(hit);
        }

        metrics::counter!("vtryon_garment_cache_misses_total").increment(1);
        debug!(key = %key, "Garment cache miss");
        let image = Arc::new(compute().await?);
        Ok(self.insert(key, image))
    }

    /// Insert unless present; returns the stored value.
    pub fn insert(&self, key: &str, image: Arc<RgbaImage>) -> Arc<RgbaImage> {
        let mut inner = self.lock();
        if let Some(existing) = inner.entries.get(key) {
            return Arc::clone(existing);
        }
        inner.entries.insert(key.to_string(), Arc::clone(&image));
        inner.order.push_back(key.to_string());
        image
    }

    /// Evict oldest entries beyond capacity. Returns the number evicted.
    pub fn trim(&self) -> usize {
        let mut inner = self.lock();
        let mut evicted = 0;
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            if inner.entries.remove(&oldest).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, remaining = inner.entries.len(), "Trimmed garment cache");
        }
        evicted
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        count
    }
}
