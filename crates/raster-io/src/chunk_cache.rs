//! LRU cache for decoded GeoTIFF chunks (strips or tiles).

use std::num::NonZeroUsize;

use lru::LruCache;

/// Typical decoded chunk: a 256x256 tile with 3 bands of `f32`.
const CHUNK_SIZE_ESTIMATE: usize = 256 * 256 * 3 * std::mem::size_of::<f32>();

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub memory_bytes: usize,
}

/// Memory-bounded LRU cache keyed by chunk index.
#[derive(Debug)]
pub struct ChunkCache {
    cache: LruCache<u32, Vec<f32>>,
    memory_limit: usize,
    current_memory: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ChunkCache {
    /// Create a cache holding at most `memory_limit` bytes of decoded samples.
    pub fn new(memory_limit: usize) -> Self {
        let max_entries = (memory_limit / CHUNK_SIZE_ESTIMATE).max(16);
        Self {
            cache: LruCache::new(NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN)),
            memory_limit,
            current_memory: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn get(&mut self, index: u32) -> Option<&Vec<f32>> {
        match self.cache.get(&index) {
            Some(data) => {
                self.hits += 1;
                Some(data)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, index: u32) -> bool {
        self.cache.contains(&index)
    }

    /// Insert a decoded chunk, evicting least recently used chunks as needed.
    /// A chunk larger than the whole budget is not cached.
    pub fn insert(&mut self, index: u32, data: Vec<f32>) {
        let size = data.len() * std::mem::size_of::<f32>();

        while self.current_memory + size > self.memory_limit && !self.cache.is_empty() {
            if let Some((_, evicted)) = self.cache.pop_lru() {
                self.current_memory = self
                    .current_memory
                    .saturating_sub(evicted.len() * std::mem::size_of::<f32>());
                self.evictions += 1;
            }
        }

        if size <= self.memory_limit {
            if let Some((_, replaced)) = self.cache.push(index, data) {
                self.current_memory = self
                    .current_memory
                    .saturating_sub(replaced.len() * std::mem::size_of::<f32>());
                self.evictions += 1;
            }
            self.current_memory += size;
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.cache.len(),
            memory_bytes: self.current_memory,
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_memory = 0;
    }
}
