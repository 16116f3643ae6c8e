//! Stage Cache
//!
//! Index-addressable snapshots of the row sequence after each pipeline stage.
//! Index 0 holds the raw input; index i holds the output of stage i-1.
//!
//! Key invariants:
//! - Every index below `len()` holds some row sequence
//! - Reading past the end returns the last stored entry (no later stage has
//!   touched it yet)
//! - Writing past the end pads with copies of the last entry first

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct StageCache<T> {
    entries: Vec<Vec<T>>,
}

impl<T> Default for StageCache<T> {
    /// An empty cache. Every read or write fails until rebuilt with rows.
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Clone> StageCache<T> {
    /// Cache seeded with the raw input at index 0
    pub fn new(rows: Vec<T>) -> Self {
        Self { entries: vec![rows] }
    }

    /// Copy of the entry at `index`, or of the last entry when `index` is past the end
    pub fn get(&self, index: usize) -> Result<Vec<T>, EngineError> {
        self.peek(index)
            .map(<[T]>::to_vec)
            .ok_or(EngineError::CacheUninitialized)
    }

    /// Borrowing variant of [`get`](Self::get)
    pub fn peek(&self, index: usize) -> Option<&[T]> {
        self.entries
            .get(index)
            .or_else(|| self.entries.last())
            .map(Vec::as_slice)
    }

    /// Store `rows` at `index`, padding with the last entry if needed
    pub fn set(&mut self, index: usize, rows: Vec<T>) -> Result<(), EngineError> {
        let last = self.entries.last().ok_or(EngineError::CacheUninitialized)?;
        if index >= self.entries.len() {
            let pad = last.clone();
            self.entries.resize(index + 1, pad);
        }
        self.entries[index] = rows;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_last_past_end() {
        let cache = StageCache::new(vec![1, 2, 3]);
        assert_eq!(cache.get(0).unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.get(5).unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_pads_with_last_entry() {
        let mut cache = StageCache::new(vec![1, 2, 3]);
        cache.set(3, vec![9]).unwrap();

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(1).unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.get(2).unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.get(3).unwrap(), vec![9]);
        assert_eq!(cache.get(10).unwrap(), vec![9]);
    }

    #[test]
    fn test_get_is_a_copy() {
        let cache = StageCache::new(vec![1, 2]);
        let mut rows = cache.get(0).unwrap();
        rows.push(3);
        assert_eq!(cache.peek(0), Some(&[1, 2][..]));
    }

    #[test]
    fn test_empty_cache_is_an_error() {
        let mut cache: StageCache<i32> = StageCache::default();
        assert!(cache.is_empty());
        assert!(matches!(cache.get(0), Err(EngineError::CacheUninitialized)));
        assert!(matches!(cache.set(0, vec![1]), Err(EngineError::CacheUninitialized)));
    }
}
