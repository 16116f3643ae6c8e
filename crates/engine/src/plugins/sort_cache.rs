//! Sort Result Cache
//!
//! Memoizes fully sorted row sequences keyed by (direction, field).
//!
//! Key invariants:
//! - A field is sorted at most once per input: descending is the reverse of
//!   the cached ascending result, never a second sort
//! - Entries belong to one input sequence; a different input clears them
//! - Otherwise entries persist until `clear()`

use std::cmp::Ordering;

use log::debug;
use rustc_hash::FxHashMap;

use super::sort::Direction;

#[derive(Debug, Clone)]
pub struct SortCache<T> {
    /// Input the entries were computed from
    input: Option<Vec<T>>,
    entries: FxHashMap<(Direction, String), Vec<T>>,
    hits: u64,
    sorts: u64,
}

impl<T> Default for SortCache<T> {
    fn default() -> Self {
        Self {
            input: None,
            entries: FxHashMap::default(),
            hits: 0,
            sorts: 0,
        }
    }
}

impl<T: Clone + PartialEq> SortCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `rows` ordered by `compare` in `direction`, from the cache when possible
    pub fn sorted<F>(&mut self, rows: &[T], field: &str, direction: Direction, compare: F) -> Vec<T>
    where
        F: Fn(&T, &T) -> Ordering,
    {
        if self.input.as_deref() != Some(rows) {
            if !self.entries.is_empty() {
                debug!("sort cache: input changed, dropping {} entries", self.entries.len());
            }
            self.entries.clear();
            self.input = Some(rows.to_vec());
        }

        let key = (direction, field.to_string());
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            return hit.clone();
        }

        let ascending_key = (Direction::Asc, field.to_string());
        let ascending = match self.entries.get(&ascending_key) {
            Some(ascending) => ascending.clone(),
            None => {
                let mut ascending = rows.to_vec();
                ascending.sort_by(|a, b| compare(a, b));
                self.sorts += 1;
                debug!("sort cache: sorted {} rows by {}", ascending.len(), field);
                self.entries.insert(ascending_key, ascending.clone());
                ascending
            }
        };

        match direction {
            Direction::Asc => ascending,
            Direction::Desc => {
                let mut descending = ascending;
                descending.reverse();
                self.entries.insert(key, descending.clone());
                descending
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.input = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requests served without sorting or reversing
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of actual sorts performed
    pub fn sorts(&self) -> u64 {
        self.sorts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_value(a: &(u32, i32), b: &(u32, i32)) -> Ordering {
        a.1.cmp(&b.1)
    }

    #[test]
    fn test_descending_is_reverse_of_ascending() {
        let rows = vec![(1, 5), (2, 3), (3, 5), (4, 1)];
        let mut cache = SortCache::new();

        let asc = cache.sorted(&rows, "value", Direction::Asc, by_value);
        assert_eq!(asc, vec![(4, 1), (2, 3), (1, 5), (3, 5)]);

        let desc = cache.sorted(&rows, "value", Direction::Desc, by_value);
        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);
        assert_eq!(cache.sorts(), 1);
    }

    #[test]
    fn test_descending_first_still_sorts_once() {
        let rows = vec![(1, 2), (2, 9), (3, 4)];
        let mut cache = SortCache::new();

        let desc = cache.sorted(&rows, "value", Direction::Desc, by_value);
        assert_eq!(desc, vec![(2, 9), (3, 4), (1, 2)]);
        cache.sorted(&rows, "value", Direction::Asc, by_value);
        assert_eq!(cache.sorts(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_repeat_requests_hit() {
        let rows = vec![(1, 2), (2, 1)];
        let mut cache = SortCache::new();
        cache.sorted(&rows, "value", Direction::Asc, by_value);
        cache.sorted(&rows, "value", Direction::Asc, by_value);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.sorts(), 1);
    }

    #[test]
    fn test_new_input_clears_entries() {
        let mut cache = SortCache::new();
        cache.sorted(&[(1, 2), (2, 1)], "value", Direction::Asc, by_value);
        assert_eq!(cache.len(), 1);

        let sorted = cache.sorted(&[(3, 7), (4, 6)], "value", Direction::Asc, by_value);
        assert_eq!(sorted, vec![(4, 6), (3, 7)]);
        assert_eq!(cache.sorts(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let rows = vec![(1, 2), (2, 1)];
        let mut cache = SortCache::new();
        cache.sorted(&rows, "value", Direction::Asc, by_value);
        cache.clear();
        assert!(cache.is_empty());

        cache.sorted(&rows, "value", Direction::Asc, by_value);
        assert_eq!(cache.sorts(), 2);
    }
}
