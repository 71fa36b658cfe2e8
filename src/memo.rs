//! Memoization cache.
//!
//! Two layers: [`MemoCache`], an explicit cache object owned by whoever
//! evaluates (the packrat engine keeps one per input), and [`Memoized`], a
//! decorator around a pure function. Keys are structural values, never
//! strings built by joining arguments, so distinct argument tuples cannot
//! collide.
//!
//! Neither type locks: both take `&mut self`, so sharing one across threads
//! means wrapping it in a `Mutex` at the call site.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

// ============================================================================
// CACHE OBJECT
// ============================================================================

/// Hit/miss counters of a [`MemoCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// A mapping from structural keys to previously computed results.
#[derive(Debug, Clone)]
pub struct MemoCache<K, V> {
    entries: HashMap<K, V>,
    stats: CacheStats,
}

impl<K: Hash + Eq, V> MemoCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Looks up a key, counting the lookup as a hit or a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Looks up a key without touching the statistics.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drops every entry and resets the statistics. Individual keys are
    /// never invalidated.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }
}

impl<K: Hash + Eq, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// FUNCTION DECORATOR
// ============================================================================

/// Wraps a pure function so each distinct argument value is computed once.
///
/// Results are handed out as `Arc<R>`: repeated calls with equal arguments
/// return the very same allocation.
///
/// # Examples
///
/// ```rust
/// use fixedpoint::memo::Memoized;
/// use std::sync::Arc;
///
/// let mut square = Memoized::new(|x: &u64| x * x);
/// let a = square.call(12);
/// let b = square.call(12);
/// assert_eq!(*a, 144);
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(square.invocations(), 1);
///
/// square.clear();
/// square.call(12);
/// assert_eq!(square.invocations(), 2);
/// ```
pub struct Memoized<A, R, F> {
    function: F,
    cache: MemoCache<A, Arc<R>>,
    invocations: usize,
}

impl<A, R, F> Memoized<A, R, F>
where
    A: Hash + Eq,
    F: FnMut(&A) -> R,
{
    pub fn new(function: F) -> Self {
        Self {
            function,
            cache: MemoCache::new(),
            invocations: 0,
        }
    }

    /// Returns the stored result for `args`, computing it on first sight.
    pub fn call(&mut self, args: A) -> Arc<R> {
        if let Some(hit) = self.cache.get(&args) {
            return Arc::clone(hit);
        }
        self.invocations += 1;
        let result = Arc::new((self.function)(&args));
        self.cache.insert(args, Arc::clone(&result));
        result
    }

    /// Number of times the wrapped function actually ran.
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Empties the stored results; the next call of any argument recomputes.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_counts_hits_and_misses() {
        let mut cache: MemoCache<(usize, usize), &str> = MemoCache::new();
        assert!(cache.get(&(0, 1)).is_none());
        cache.insert((0, 1), "a");
        assert_eq!(cache.get(&(0, 1)), Some(&"a"));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn tuple_keys_do_not_collide_where_joined_strings_would() {
        // ("1", 11) and ("11", 1) both join to "111".
        let mut concat = Memoized::new(|args: &(String, usize)| format!("{}|{}", args.0, args.1));
        let a = concat.call(("1".to_string(), 11));
        let b = concat.call(("11".to_string(), 1));
        assert_ne!(a, b);
        assert_eq!(concat.invocations(), 2);
        assert_eq!(concat.len(), 2);
    }

    #[test]
    fn memoized_result_equals_plain_call() {
        let plain = |n: &usize| (0..*n).sum::<usize>();
        let mut memo = Memoized::new(plain);
        let first = memo.call(10);
        let second = memo.call(10);
        assert_eq!(*first, plain(&10));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(memo.stats().hits, 1);
    }

    #[test]
    fn clear_returns_to_initial_state() {
        let mut memo = Memoized::new(|n: &i32| n * 2);
        memo.call(1);
        memo.call(2);
        memo.call(1);
        assert_eq!(memo.invocations(), 2);

        memo.clear();
        assert!(memo.is_empty());
        let before = memo.invocations();
        memo.call(1);
        memo.call(2);
        memo.call(1);
        assert_eq!(memo.invocations() - before, 2);
    }
}
