use crate::arena::{Entry, TypedArena};
use crate::skiplist::error::Result;
use crate::skiplist::level::{self, LevelGenerator};
use log::{debug, trace};
use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::io;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::mem;
use std::result;

/// Promotion probability used by `SkipList::default`.
pub const DEFAULT_PROBABILITY: f64 = 0.5;

/// Height cap used by `SkipList::default`.
pub const DEFAULT_MAX_HEIGHT: usize = 32;

struct Node<T> {
    key: T,
    links: Vec<Option<Entry>>,
}

/// A position in a level traversal: either the sentinel or a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Cursor {
    Head,
    Node(Entry),
}

/// An ordered set implemented by a skiplist.
///
/// A skiplist is a probabilistic data structure that allows for binary search tree operations by
/// maintaining a linked hierarchy of subsequences. The first subsequence is a sorted linked list
/// of every key. Each successive subsequence contains roughly a fraction `p` of the keys in the
/// one below, where `p` is the promotion probability. Searching from the sparsest level down lets
/// most keys be skipped, so insertion, deletion, and lookup take expected logarithmic time without
/// any rebalancing.
///
/// Nodes live in a `TypedArena` and link to each other through arena handles. The sentinel is
/// the `head` link array, whose length is the current height of the list.
///
/// # Examples
/// ```
/// use skip_list::skiplist::SkipList;
///
/// let mut list = SkipList::new(0.5, 16);
/// list.insert(3);
/// list.insert(1);
/// list.insert(3);
///
/// assert_eq!(list.len(), 2);
/// assert!(list.contains(&1));
/// assert_eq!(list.iter().collect::<Vec<&u32>>(), vec![&1, &3]);
///
/// assert!(list.erase(&1));
/// assert!(!list.erase(&1));
/// ```
pub struct SkipList<T>
where T: Ord
{
    arena: TypedArena<Node<T>>,
    head: Vec<Option<Entry>>,
    levels: LevelGenerator,
    len: usize,
}

impl<T> SkipList<T>
where T: Ord
{
    /// Constructs a new, empty `SkipList<T>` whose level generator is seeded from the operating
    /// system.
    ///
    /// The caller must pass a `probability` strictly between 0 and 1 and a `max_height` of at
    /// least 1. Only debug builds check this; use `try_new` to validate untrusted parameters.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let list: SkipList<u32> = SkipList::new(0.25, 12);
    /// assert_eq!(list.height(), 1);
    /// ```
    pub fn new(probability: f64, max_height: usize) -> Self {
        debug_assert!(level::validate(probability, max_height).is_ok());
        Self::from_levels(LevelGenerator::new(probability, max_height))
    }

    /// Constructs a new, empty `SkipList<T>` after checking its parameters.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// assert!(SkipList::<u32>::try_new(0.5, 8).is_ok());
    /// assert!(SkipList::<u32>::try_new(1.0, 8).is_err());
    /// assert!(SkipList::<u32>::try_new(0.5, 0).is_err());
    /// ```
    pub fn try_new(probability: f64, max_height: usize) -> Result<Self> {
        level::validate(probability, max_height)?;
        Ok(Self::new(probability, max_height))
    }

    /// Constructs a new, empty `SkipList<T>` with a deterministic level generator. Two lists
    /// built with the same parameters and fed the same operations have identical shapes.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::with_seed(0.5, 16, [1, 2, 3, 4]);
    /// list.insert("a");
    /// assert!(list.contains("a"));
    /// ```
    pub fn with_seed(probability: f64, max_height: usize, seed: [u32; 4]) -> Self {
        debug_assert!(level::validate(probability, max_height).is_ok());
        Self::from_levels(LevelGenerator::with_seed(probability, max_height, seed))
    }

    fn from_levels(levels: LevelGenerator) -> Self {
        SkipList {
            arena: TypedArena::new(),
            head: vec![None],
            levels,
            len: 0,
        }
    }

    /// Returns the number of active levels.
    pub fn height(&self) -> usize {
        self.head.len()
    }

    /// Returns the height cap set at construction.
    pub fn max_height(&self) -> usize {
        self.levels.max_height()
    }

    /// Returns the promotion probability set at construction.
    pub fn probability(&self) -> f64 {
        self.levels.probability()
    }

    fn next(&self, cursor: Cursor, level: usize) -> Option<Entry> {
        match cursor {
            Cursor::Head => self.head[level],
            Cursor::Node(entry) => self.arena[entry].links[level],
        }
    }

    fn next_mut(&mut self, cursor: Cursor, level: usize) -> &mut Option<Entry> {
        match cursor {
            Cursor::Head => &mut self.head[level],
            Cursor::Node(entry) => &mut self.arena[entry].links[level],
        }
    }

    /// Moves forward along `level` while the next key is less than `key`.
    fn advance<Q>(&self, mut curr: Cursor, level: usize, key: &Q) -> Cursor
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        while let Some(next) = self.next(curr, level) {
            let next_key: &Q = self.arena[next].key.borrow();
            if next_key >= key {
                break;
            }
            curr = Cursor::Node(next);
        }
        curr
    }

    /// Returns the last position before `key` on every active level, indexed by level. Nothing
    /// is mutated, so the result is a consistent snapshot for a subsequent splice.
    fn find_predecessors<Q>(&self, key: &Q) -> Vec<Cursor>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut update = Vec::with_capacity(self.height());
        self.fill_predecessors(key, &mut update);
        update
    }

    /// Like `find_predecessors`, but writes into `update`. Does not allocate if `update` already
    /// has capacity for `height()` cursors.
    fn fill_predecessors<Q>(&self, key: &Q, update: &mut Vec<Cursor>)
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        update.clear();
        update.resize(self.height(), Cursor::Head);
        let mut curr = Cursor::Head;
        for level in (0..self.height()).rev() {
            curr = self.advance(curr, level, key);
            update[level] = curr;
        }
    }

    /// Returns the node holding `key` if it directly follows `pred` on level 0.
    fn matching_successor<Q>(&self, pred: Cursor, key: &Q) -> Option<Entry>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.next(pred, 0).filter(|entry| {
            let next_key: &Q = self.arena[*entry].key.borrow();
            next_key == key
        })
    }

    /// Links a new node holding `key` after the recorded predecessors. `links.len()` is the
    /// node's height. No allocation happens here once the sentinel and arena have room.
    fn link_node(&mut self, update: &[Cursor], key: T, links: Vec<Option<Entry>>) {
        let new_height = links.len();
        if new_height > self.height() {
            debug!("growing skiplist height from {} to {}", self.height(), new_height);
            self.head.resize(new_height, None);
        }

        let node = self.arena.allocate(Node { key, links });
        for level in 0..new_height {
            let pred = update.get(level).cloned().unwrap_or(Cursor::Head);
            let next = mem::replace(self.next_mut(pred, level), Some(node));
            self.arena[node].links[level] = next;
        }
        self.len += 1;
    }

    /// Inserts a key into the list. Returns `true` if the key was added and `false` if it was
    /// already present, in which case the list is left unchanged and `key` is dropped.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// assert!(list.insert(1));
    /// assert!(!list.insert(1));
    /// assert_eq!(list.len(), 1);
    /// ```
    pub fn insert(&mut self, key: T) -> bool {
        let update = self.find_predecessors(&key);
        if self.matching_successor(update[0], &key).is_some() {
            return false;
        }

        let new_height = self.levels.random_level(self.height());
        trace!("inserting node of height {}", new_height);
        self.link_node(&update, key, vec![None; new_height]);
        true
    }

    /// Inserts a key into the list like `insert`, but reports allocation failure instead of
    /// aborting. Every allocation happens before the first link is rewritten, so on error the
    /// list is exactly as it was.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// assert_eq!(list.try_insert(1).unwrap(), true);
    /// assert_eq!(list.try_insert(1).unwrap(), false);
    /// ```
    pub fn try_insert(&mut self, key: T) -> Result<bool> {
        let mut update = Vec::new();
        update.try_reserve_exact(self.height())?;
        self.fill_predecessors(&key, &mut update);
        if self.matching_successor(update[0], &key).is_some() {
            return Ok(false);
        }

        let new_height = self.levels.random_level(self.height());
        let links = self.reserve_node(new_height)?;

        trace!("inserting node of height {}", new_height);
        self.link_node(&update, key, links);
        Ok(true)
    }

    /// Reserves everything needed to link a node of `new_height` levels: its link array, room
    /// for the sentinel to grow, and an arena slot. Nothing observable changes on error.
    fn reserve_node(&mut self, new_height: usize) -> Result<Vec<Option<Entry>>> {
        let mut links = Vec::new();
        links.try_reserve_exact(new_height)?;
        if new_height > self.height() {
            self.head.try_reserve_exact(new_height - self.height())?;
        }
        self.arena.try_reserve()?;
        links.resize(new_height, None);
        Ok(links)
    }

    /// Removes a key from the list and returns it, or `None` if it was not present.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// list.insert(String::from("a"));
    /// assert_eq!(list.remove("a"), Some(String::from("a")));
    /// assert_eq!(list.remove("a"), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let update = self.find_predecessors(key);
        let target = self.matching_successor(update[0], key)?;

        for (level, pred) in update.into_iter().enumerate() {
            if self.next(pred, level) != Some(target) {
                break;
            }
            let next = self.arena[target].links[level];
            *self.next_mut(pred, level) = next;
        }

        let Node { key, .. } = self.arena.free(target);
        self.len -= 1;
        self.shrink_height();
        Some(key)
    }

    /// Removes a key from the list. Returns `true` if the key was found and removed.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// list.insert(5);
    /// assert!(list.erase(&5));
    /// assert!(!list.erase(&10));
    /// ```
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove(key).is_some()
    }

    /// Drops empty levels from the top until the topmost level holds a node or only level 0 is
    /// left.
    fn shrink_height(&mut self) {
        let old_height = self.height();
        while self.head.len() > 1 && self.head.last() == Some(&None) {
            self.head.pop();
        }
        if self.height() < old_height {
            debug!("shrinking skiplist height from {} to {}", old_height, self.height());
        }
    }

    /// Returns a reference to the key in the list equal to `key`, if any.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// list.insert(2);
    /// assert_eq!(list.get(&2), Some(&2));
    /// assert_eq!(list.get(&3), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut curr = Cursor::Head;
        for level in (0..self.height()).rev() {
            curr = self.advance(curr, level, key);
        }
        self.matching_successor(curr, key).map(|entry| &self.arena[entry].key)
    }

    /// Checks if a key exists in the list.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// list.insert(String::from("banana"));
    /// assert!(list.contains("banana"));
    /// assert!(!list.contains("grape"));
    /// ```
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Returns the number of keys in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every key, releasing nodes in ascending order, and resets the height to 1.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// list.insert(1);
    /// list.insert(2);
    /// list.clear();
    /// assert!(list.is_empty());
    /// assert_eq!(list.height(), 1);
    /// ```
    pub fn clear(&mut self) {
        self.free_nodes();
        debug!("cleared skiplist");
    }

    fn free_nodes(&mut self) {
        let mut current = self.head[0];
        while let Some(entry) = current {
            current = self.arena.free(entry).links[0];
        }
        self.arena.clear();
        self.head = vec![None];
        self.len = 0;
    }

    /// Moves the contents of the list into a new list, leaving `self` a fresh, empty list with
    /// the same probability and height cap. The returned list keeps the current level generator;
    /// `self` gets a newly seeded one.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut first = SkipList::default();
    /// first.insert(10);
    /// let second = first.take();
    ///
    /// assert!(first.is_empty());
    /// assert!(second.contains(&10));
    /// ```
    pub fn take(&mut self) -> Self {
        let fresh = Self::from_levels(self.levels.reseeded());
        trace!("moving {} keys out of skiplist", self.len);
        mem::replace(self, fresh)
    }

    /// Replaces the contents of `self` with those of `other`, leaving `other` a fresh, empty
    /// list. The keys previously held by `self` are dropped.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut source = SkipList::default();
    /// source.insert(1);
    /// let mut target = SkipList::default();
    /// target.insert(2);
    ///
    /// target.assign_from(&mut source);
    /// assert_eq!(target.iter().collect::<Vec<&u32>>(), vec![&1]);
    /// assert!(source.is_empty());
    /// ```
    pub fn assign_from(&mut self, other: &mut Self) {
        *self = other.take();
    }

    /// Returns the minimum key of the list, or `None` if the list is empty.
    pub fn first(&self) -> Option<&T> {
        self.head[0].map(|entry| &self.arena[entry].key)
    }

    /// Returns the maximum key of the list, or `None` if the list is empty.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// assert_eq!(list.last(), None);
    /// list.insert(1);
    /// list.insert(3);
    /// assert_eq!(list.first(), Some(&1));
    /// assert_eq!(list.last(), Some(&3));
    /// ```
    pub fn last(&self) -> Option<&T> {
        let mut curr = Cursor::Head;
        for level in (0..self.height()).rev() {
            while let Some(next) = self.next(curr, level) {
                curr = Cursor::Node(next);
            }
        }
        match curr {
            Cursor::Head => None,
            Cursor::Node(entry) => Some(&self.arena[entry].key),
        }
    }

    /// Returns an iterator over the list. The iterator yields keys in ascending order.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::default();
    /// list.insert(2);
    /// list.insert(1);
    ///
    /// let mut iterator = list.iter();
    /// assert_eq!(iterator.next(), Some(&1));
    /// assert_eq!(iterator.next(), Some(&2));
    /// assert_eq!(iterator.next(), None);
    /// ```
    pub fn iter(&self) -> Iter<T> {
        Iter {
            arena: &self.arena,
            current: self.head[0],
            remaining: self.len,
        }
    }

    /// Writes the keys on every level, from the topmost level down to level 0, one line per level.
    ///
    /// # Examples
    /// ```
    /// use skip_list::skiplist::SkipList;
    ///
    /// let mut list = SkipList::new(0.5, 1);
    /// list.insert(2);
    /// list.insert(1);
    ///
    /// let mut out = Vec::new();
    /// list.dump(&mut out).unwrap();
    /// assert_eq!(
    ///     String::from_utf8(out).unwrap(),
    ///     "SkipList (levels = 1, p = 0.5):\nLevel 0: 1 2 \n",
    /// );
    /// ```
    pub fn dump<W>(&self, out: &mut W) -> io::Result<()>
    where
        W: io::Write,
        T: fmt::Display,
    {
        writeln!(out, "SkipList (levels = {}, p = {}):", self.height(), self.probability())?;
        for level in (0..self.height()).rev() {
            write!(out, "Level {}: ", level)?;
            let mut current = self.head[level];
            while let Some(entry) = current {
                let node = &self.arena[entry];
                write!(out, "{} ", node.key)?;
                current = node.links[level];
            }
            writeln!(out)?;
        }
        out.flush()
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        assert!(self.height() >= 1);
        assert!(self.height() <= self.max_height());
        if self.height() > 1 {
            assert!(self.head[self.height() - 1].is_some(), "empty top level");
        }
        assert_eq!(self.arena.len(), self.len);

        let mut below: Vec<Entry> = Vec::new();
        for level in 0..self.height() {
            let mut nodes = Vec::new();
            let mut current = self.head[level];
            while let Some(entry) = current {
                let node = &self.arena[entry];
                assert!(node.links.len() > level);
                assert!(node.links.len() <= self.height());
                nodes.push(entry);
                current = node.links[level];
            }

            if level == 0 {
                assert_eq!(nodes.len(), self.len);
                for pair in nodes.windows(2) {
                    assert!(self.arena[pair[0]].key < self.arena[pair[1]].key);
                }
            } else {
                let mut lower = below.iter();
                for entry in &nodes {
                    assert!(lower.any(|other| other == entry), "level {} is not a subsequence", level);
                }
            }
            below = nodes;
        }
    }
}

impl<T> Drop for SkipList<T>
where T: Ord
{
    fn drop(&mut self) {
        self.free_nodes();
    }
}

impl<T> Default for SkipList<T>
where T: Ord
{
    fn default() -> Self {
        Self::new(DEFAULT_PROBABILITY, DEFAULT_MAX_HEIGHT)
    }
}

impl<T> PartialEq for SkipList<T>
where T: Ord
{
    fn eq(&self, other: &SkipList<T>) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T> Eq for SkipList<T> where T: Ord {}

impl<T> fmt::Debug for SkipList<T>
where T: Ord + fmt::Debug
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for SkipList<T>
where T: Ord
{
    fn extend<I>(&mut self, iter: I)
    where I: IntoIterator<Item = T>
    {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<T> FromIterator<T> for SkipList<T>
where T: Ord
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = T>
    {
        let mut list = SkipList::default();
        list.extend(iter);
        list
    }
}

impl<T> IntoIterator for SkipList<T>
where T: Ord
{
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(mut self) -> Self::IntoIter {
        let current = self.head[0].take();
        let remaining = mem::replace(&mut self.len, 0);
        IntoIter {
            arena: mem::replace(&mut self.arena, TypedArena::new()),
            current,
            remaining,
        }
    }
}

impl<'a, T> IntoIterator for &'a SkipList<T>
where T: 'a + Ord
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An owning iterator for `SkipList<T>`.
///
/// This iterator traverses the keys of a list in ascending order and yields owned keys.
pub struct IntoIter<T> {
    arena: TypedArena<Node<T>>,
    current: Option<Entry>,
    remaining: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.current?;
        let Node { key, links } = self.arena.free(entry);
        self.current = links[0];
        self.remaining -= 1;
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> Drop for IntoIter<T> {
    fn drop(&mut self) {
        while let Some(entry) = self.current {
            self.current = self.arena.free(entry).links[0];
        }
    }
}

/// An iterator for `SkipList<T>`.
///
/// This iterator walks level 0 of a list and yields immutable references to keys in ascending
/// order.
pub struct Iter<'a, T>
where T: 'a
{
    arena: &'a TypedArena<Node<T>>,
    current: Option<Entry>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T>
where T: 'a
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.current?;
        let arena = self.arena;
        let node = &arena[entry];
        self.current = node.links[0];
        self.remaining -= 1;
        Some(&node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> where T: 'a {}

impl<'a, T> Clone for Iter<'a, T>
where T: 'a
{
    fn clone(&self) -> Self {
        Iter {
            arena: self.arena,
            current: self.current,
            remaining: self.remaining,
        }
    }
}

impl<T> Serialize for SkipList<T>
where T: Ord + Serialize
{
    fn serialize<S>(&self, serializer: S) -> result::Result<S::Ok, S::Error>
    where S: Serializer
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T> Deserialize<'de> for SkipList<T>
where T: Ord + Deserialize<'de>
{
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where D: Deserializer<'de>
    {
        struct SkipListVisitor<T> {
            marker: PhantomData<T>,
        }

        impl<'de, T> Visitor<'de> for SkipListVisitor<T>
        where T: Ord + Deserialize<'de>
        {
            type Value = SkipList<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of keys")
            }

            fn visit_seq<A>(self, mut seq: A) -> result::Result<Self::Value, A::Error>
            where A: SeqAccess<'de>
            {
                let mut list = SkipList::default();
                while let Some(key) = seq.next_element()? {
                    list.insert(key);
                }
                Ok(list)
            }
        }

        deserializer.deserialize_seq(SkipListVisitor { marker: PhantomData })
    }
}
