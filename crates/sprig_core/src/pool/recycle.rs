use std::fmt;

/// Fraction of the current capacity minted when `pop` finds the pool empty.
const GROWTH_RATIO: f64 = 0.3;
/// Capacity multiplier applied when `insert` finds the pool full.
const EXPAND_FACTOR: f64 = 1.5;

/// Pooled-object allocator with a factory, an optional reset hook and a
/// hard capacity ceiling.
///
/// Objects are reset on the way *in* (`insert`), never on the way out, so
/// a popped object is in whatever state the last reset left it. Once the
/// capacity has reached the ceiling and the idle list is full, further
/// inserts drop the object instead of growing.
pub struct RecyclePool<T> {
    name: String,
    idle: Vec<T>,
    capacity: usize,
    ceiling: usize,
    factory: Box<dyn FnMut() -> T>,
    reset: Option<Box<dyn FnMut(&mut T)>>,
}

impl<T> RecyclePool<T> {
    /// Create a pool pre-filled with `initial` objects built by `factory`.
    pub fn new(
        name: impl Into<String>,
        initial: usize,
        ceiling: usize,
        factory: impl FnMut() -> T + 'static,
    ) -> Self {
        let ceiling = ceiling.max(1);
        let capacity = initial.clamp(1, ceiling);
        let mut pool = Self {
            name: name.into(),
            idle: Vec::with_capacity(capacity),
            capacity,
            ceiling,
            factory: Box::new(factory),
            reset: None,
        };
        pool.mint(initial.min(ceiling));
        pool
    }

    /// Install the hook run on every object returned through `insert`.
    pub fn with_reset(mut self, reset: impl FnMut(&mut T) + 'static) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Take an idle object, minting `max(1, ceil(capacity * 0.3))` fresh
    /// ones first if none are idle.
    pub fn pop(&mut self) -> T {
        loop {
            if let Some(obj) = self.idle.pop() {
                return obj;
            }
            let count = ((self.capacity as f64 * GROWTH_RATIO).ceil() as usize).max(1);
            self.mint(count);
        }
    }

    /// Reset `obj` and keep it for reuse. Returns `false` when the pool is
    /// full at its ceiling and the object was dropped instead.
    pub fn insert(&mut self, mut obj: T) -> bool {
        if self.idle.len() >= self.capacity {
            if self.capacity >= self.ceiling {
                tracing::trace!(pool = %self.name, ceiling = self.ceiling, "recycle pool at ceiling, dropping object");
                return false;
            }
            let grown = ((self.capacity as f64 * EXPAND_FACTOR).ceil() as usize)
                .max(self.capacity + 1)
                .min(self.ceiling);
            tracing::debug!(pool = %self.name, from = self.capacity, to = grown, "recycle pool capacity grown");
            self.capacity = grown;
        }
        if let Some(reset) = self.reset.as_mut() {
            reset(&mut obj);
        }
        self.idle.push(obj);
        true
    }

    /// Drop every idle object. Capacity is kept.
    pub fn clear(&mut self) {
        self.idle.clear();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of objects currently idle.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    // Freshly minted objects are pushed in reverse so the first one built
    // is the first one popped.
    fn mint(&mut self, count: usize) {
        let start = self.idle.len();
        for _ in 0..count {
            let obj = (self.factory)();
            self.idle.push(obj);
        }
        self.idle[start..].reverse();
    }
}

impl<T> fmt::Debug for RecyclePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecyclePool")
            .field("name", &self.name)
            .field("idle", &self.idle.len())
            .field("capacity", &self.capacity)
            .field("ceiling", &self.ceiling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_pool(initial: usize, ceiling: usize) -> (RecyclePool<u32>, Rc<Cell<u32>>) {
        let minted = Rc::new(Cell::new(0));
        let counter = Rc::clone(&minted);
        let pool = RecyclePool::new("test", initial, ceiling, move || {
            let id = counter.get();
            counter.set(id + 1);
            id
        });
        (pool, minted)
    }

    #[test]
    fn pops_prefilled_objects_in_creation_order() {
        let (mut pool, minted) = counting_pool(4, 64);
        assert_eq!(minted.get(), 4);
        assert_eq!(pool.pop(), 0);
        assert_eq!(pool.pop(), 1);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn empty_pool_mints_thirty_percent_of_capacity() {
        let (mut pool, minted) = counting_pool(10, 64);
        for _ in 0..10 {
            pool.pop();
        }
        assert_eq!(pool.idle(), 0);
        pool.pop();
        // ceil(10 * 0.3) = 3 minted, one handed out
        assert_eq!(minted.get(), 13);
        assert_eq!(pool.idle(), 2);
        assert_eq!(pool.capacity(), 10);
    }

    #[test]
    fn reset_runs_on_insert_not_on_pop() {
        let mut pool = RecyclePool::new("vecs", 1, 8, Vec::<u8>::new).with_reset(|v| v.clear());
        let mut v = pool.pop();
        v.push(7);
        assert!(pool.insert(v));
        assert!(pool.pop().is_empty());
    }

    #[test]
    fn insert_grows_capacity_by_half_up_to_ceiling() {
        let (mut pool, _) = counting_pool(4, 8);
        for value in 100..104 {
            assert!(pool.insert(value));
        }
        // 4 prefilled + 4 inserted: grew 4 -> 6 -> 8
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.idle(), 8);
        assert!(!pool.insert(200));
        assert_eq!(pool.idle(), 8);
        assert_eq!(pool.capacity(), 8);
    }

    #[test]
    fn zero_initial_capacity_still_grows() {
        let (mut pool, minted) = counting_pool(0, 16);
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.pop(), 0);
        assert_eq!(minted.get(), 1);
        assert!(pool.insert(0));
        assert!(pool.insert(1));
        assert_eq!(pool.capacity(), 2);
    }
}
