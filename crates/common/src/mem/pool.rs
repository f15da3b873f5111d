use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::config::PoolConfig;

/// A source of reusable byte vectors, shared across threads.
pub trait BufferPool: Send + Sync + 'static {
    /// Returns a vector whose length is exactly `size`. Its capacity may be larger.
    fn get(&self, size: usize) -> Vec<u8>;

    /// Hands a vector obtained from [`BufferPool::get`] back to the pool.
    fn put(&self, buf: Vec<u8>);
}

static DEFAULT_POOL: OnceLock<Arc<dyn BufferPool>> = OnceLock::new();

/// The process-wide pool, built from [`PoolConfig::default`] on first use.
pub fn default_buffer_pool() -> Arc<dyn BufferPool> {
    DEFAULT_POOL
        .get_or_init(|| Arc::new(TieredBufferPool::new(&PoolConfig::default())))
        .clone()
}

/// Pool that never retains anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopBufferPool;

impl BufferPool for NopBufferPool {
    fn get(&self, size: usize) -> Vec<u8> {
        vec![0; size]
    }

    fn put(&self, _buf: Vec<u8>) {}
}

struct Tier {
    size: usize,
    free: Mutex<Vec<Vec<u8>>>,
}

/// Keeps one free list per configured size class.
///
/// A request is served by the smallest tier that can hold it. Requests larger
/// than the biggest tier are plain allocations and are dropped on release, as
/// are releases into a tier already holding `max_idle_per_tier` vectors.
pub struct TieredBufferPool {
    tiers: Vec<Tier>,
    max_idle_per_tier: usize,
}

impl TieredBufferPool {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            tiers: config
                .tier_sizes()
                .iter()
                .map(|&size| Tier {
                    size,
                    free: Mutex::new(Vec::new()),
                })
                .collect(),
            max_idle_per_tier: config.max_idle_per_tier(),
        }
    }

    /// Number of released vectors currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.tiers.iter().map(|tier| tier.free.lock().len()).sum()
    }

    fn tier_for_request(&self, size: usize) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.size >= size)
    }

    fn tier_for_capacity(&self, capacity: usize) -> Option<&Tier> {
        let largest = self.tiers.last()?.size;
        if capacity > largest {
            return None;
        }
        self.tiers.iter().rev().find(|tier| tier.size <= capacity)
    }
}

impl BufferPool for TieredBufferPool {
    fn get(&self, size: usize) -> Vec<u8> {
        let Some(tier) = self.tier_for_request(size) else {
            return vec![0; size];
        };
        let mut buf = tier
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(tier.size));
        buf.resize(size, 0);
        buf
    }

    fn put(&self, mut buf: Vec<u8>) {
        // anything that fits no tier was a one-off allocation
        let Some(tier) = self.tier_for_capacity(buf.capacity()) else {
            return;
        };
        let mut free = tier.free.lock();
        if free.len() >= self.max_idle_per_tier {
            return;
        }
        buf.clear();
        free.push(buf);
    }
}
