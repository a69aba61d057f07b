#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

//! Associative container whose keys carry a gap-free positional rank.
//!
//! Every present key occupies exactly one rank in `0..len()`. Inserting at
//! rank `r` pushes every key at rank `>= r` up by one; removing the key at
//! rank `r` pulls every key above it down by one.
//!
//! The ordered key view is derived lazily: mutators drop it and
//! [`RankedContainer::ordered_keys`] rebuilds it by a stable sort on rank the
//! next time it is asked for.
//!
//! # Complexity
//! - `get`, `rank_of`, `contains_key`: `O(1)`
//! - `add`, `remove`, `add_or_update` (rank change): `O(n)` re-indexing
//! - `ordered_keys`: `O(n log n)` after a mutation, `O(1)` otherwise
//!
//! # Persistence
//! The container serializes as a sequence of `(key, value)` pairs in rank
//! order and deserializes by appending each pair in sequence order, so a save
//! followed by a load reproduces the same ordering.
//!
//! # Examples
//! ```
//! use procmirror_common::collections::RankedContainer;
//!
//! let mut ranked = RankedContainer::new();
//! ranked.add("a", 1, 0);
//! ranked.add("b", 2, 0);
//! ranked.add("c", 3, 1);
//! assert_eq!(ranked.ordered_keys(), &["b", "c", "a"]);
//!
//! ranked.remove(&"c");
//! assert_eq!(ranked.rank_of(&"a"), Some(1));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use once_cell::unsync::OnceCell;
use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone)]
struct RankedSlot<V> {
    rank: usize,
    value: V,
}

/// Key/value store where each key holds a unique, contiguous rank.
#[derive(Clone)]
pub struct RankedContainer<K, V> {
    entries: HashMap<K, RankedSlot<V>>,
    ordered: OnceCell<Vec<K>>,
}

impl<K, V> RankedContainer<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: HashMap::new(), ordered: OnceCell::new() }
    }

    /// Creates an empty container with room for `capacity` keys.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: HashMap::with_capacity(capacity), ordered: OnceCell::new() }
    }

    /// Rebuilds a container from pairs listed in rank order.
    ///
    /// Each pair is appended, so its rank is its position in the sequence.
    /// A key listed twice keeps its last value at its last position.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut container = Self::new();
        for (key, value) in pairs {
            let end = container.len();
            container.add(key, value, end);
        }
        container
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Current rank of `key`.
    #[must_use]
    pub fn rank_of(&self, key: &K) -> Option<usize> {
        self.entries.get(key).map(|slot| slot.rank)
    }

    /// Borrows the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Returns the value for `key`, or `V::default()` when absent.
    #[must_use]
    pub fn get_or_default(&self, key: &K) -> V
    where
        V: Clone + Default,
    {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Inserts `key` at `rank` and returns the rank it ended up at.
    ///
    /// A rank at or beyond the current length appends. Otherwise every key
    /// at rank `>= rank` moves up by one. If `key` was already present it is
    /// removed first, so ranks stay gap-free.
    pub fn add(&mut self, key: K, value: V, rank: usize) -> usize {
        self.remove(&key);

        let rank = rank.min(self.entries.len());
        for slot in self.entries.values_mut() {
            if slot.rank >= rank {
                slot.rank += 1;
            }
        }
        self.entries.insert(key, RankedSlot { rank, value });
        self.invalidate();
        rank
    }

    /// Removes `key`, compacting the ranks above it.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key)?;
        for slot in self.entries.values_mut() {
            if slot.rank > removed.rank {
                slot.rank -= 1;
            }
        }
        self.invalidate();
        Some(removed.value)
    }

    /// Stores `value` for `key` at `rank`, returning the resulting rank.
    ///
    /// When `key` already sits at exactly `rank` the value is replaced in
    /// place and the ordered view is kept. A different rank is a remove
    /// followed by an add; an absent key is a plain add.
    pub fn add_or_update(&mut self, key: K, value: V, rank: usize) -> usize {
        if let Some(slot) = self.entries.get_mut(&key) {
            if slot.rank == rank {
                slot.value = value;
                return rank;
            }
        }
        self.add(key, value, rank)
    }

    /// Keys in ascending rank order.
    ///
    /// Rebuilt only if a mutation happened since the previous call.
    pub fn ordered_keys(&self) -> &[K] {
        self.ordered.get_or_init(|| {
            let mut ranked: Vec<(&K, usize)> =
                self.entries.iter().map(|(key, slot)| (key, slot.rank)).collect();
            ranked.sort_by_key(|&(_, rank)| rank);
            ranked.into_iter().map(|(key, _)| key.clone()).collect()
        })
    }

    /// Iterates `(key, value)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.ordered_keys()
            .iter()
            .filter_map(move |key| self.entries.get_key_value(key).map(|(k, slot)| (k, &slot.value)))
    }

    /// Clones every pair in rank order, the inverse of [`Self::from_pairs`].
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.iter().map(|(key, value)| (key.clone(), value.clone())).collect()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.ordered.take();
    }
}

impl<K, V> Default for RankedContainer<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for RankedContainer<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for RankedContainer<K, V>
where
    K: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl<K, V> Serialize for RankedContainer<K, V>
where
    K: Eq + Hash + Clone + Serialize,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for pair in self.iter() {
            seq.serialize_element(&pair)?;
        }
        seq.end()
    }
}

struct RankedVisitor<K, V>(PhantomData<(K, V)>);

impl<'de, K, V> Visitor<'de> for RankedVisitor<K, V>
where
    K: Eq + Hash + Clone + Deserialize<'de>,
    V: Deserialize<'de>,
{
    type Value = RankedContainer<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence of [key, value] pairs in rank order")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut container = RankedContainer::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some((key, value)) = seq.next_element::<(K, V)>()? {
            let end = container.len();
            container.add(key, value, end);
        }
        Ok(container)
    }
}

impl<'de, K, V> Deserialize<'de> for RankedContainer<K, V>
where
    K: Eq + Hash + Clone + Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(RankedVisitor(PhantomData))
    }
}
