//! Slab allocator for a single type of object, addressed by stable handles.

use std::collections::TryReserveError;
use std::mem;
use std::ops::{Index, IndexMut};
use std::vec::Vec;

/// A handle to an object allocated in a `TypedArena<T>`.
///
/// Handles stay valid until the object they refer to is freed. A freed slot is recycled by the
/// next allocation, so a stale handle may alias a newer object.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Entry {
    index: usize,
}

enum Block<T> {
    Occupied(T),
    Vacant(Option<Entry>),
}

/// A slab allocator that only allocates a single type of object.
///
/// Objects live in one contiguous `Vec` and are referred to by `Entry` handles, which are plain
/// indices. Freed blocks form an intrusive free list and are reused before the slab grows, so
/// handles never move even when the backing storage reallocates. All remaining objects are
/// dropped in slab order when the arena is dropped.
///
/// # Examples
///
/// ```
/// use skip_list::arena::TypedArena;
///
/// let mut arena = TypedArena::new();
///
/// let x = arena.allocate(1);
/// assert_eq!(arena[x], 1);
///
/// arena[x] += 1;
/// assert_eq!(arena[x], 2);
///
/// assert_eq!(arena.free(x), 2);
/// assert!(arena.is_empty());
/// ```
pub struct TypedArena<T> {
    head: Option<Entry>,
    blocks: Vec<Block<T>>,
    len: usize,
}

impl<T> TypedArena<T> {
    /// Constructs a new, empty `TypedArena<T>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skip_list::arena::TypedArena;
    ///
    /// let arena: TypedArena<u32> = TypedArena::new();
    /// assert_eq!(arena.len(), 0);
    /// ```
    pub fn new() -> Self {
        TypedArena {
            head: None,
            blocks: Vec::new(),
            len: 0,
        }
    }

    /// Returns the number of live objects in the arena.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the arena holds no live objects.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Makes sure the next call to `allocate` will not need to grow the slab. Returns an error
    /// if the slab needed to grow and the allocator could not satisfy the request; the arena is
    /// left untouched in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use skip_list::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new();
    /// arena.try_reserve().unwrap();
    /// let x = arena.allocate(7);
    /// assert_eq!(arena[x], 7);
    /// ```
    pub fn try_reserve(&mut self) -> Result<(), TryReserveError> {
        if self.head.is_none() {
            self.blocks.try_reserve(1)?;
        }
        Ok(())
    }

    /// Allocates an object in the arena and returns its handle.
    ///
    /// # Examples
    ///
    /// ```
    /// use skip_list::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new();
    /// let x = arena.allocate(0);
    /// assert_eq!(arena.get(x), Some(&0));
    /// ```
    pub fn allocate(&mut self, value: T) -> Entry {
        self.len += 1;
        match self.head.take() {
            None => {
                self.blocks.push(Block::Occupied(value));
                Entry {
                    index: self.blocks.len() - 1,
                }
            },
            Some(entry) => {
                let vacant_block = mem::replace(&mut self.blocks[entry.index], Block::Occupied(value));
                match vacant_block {
                    Block::Vacant(next_entry) => {
                        self.head = next_entry;
                        entry
                    },
                    Block::Occupied(_) => panic!("Error: free list points at an occupied block."),
                }
            },
        }
    }

    /// Deallocates an object in the arena and returns it.
    ///
    /// # Panics
    ///
    /// Panics if `entry` does not refer to a live object.
    ///
    /// # Examples
    ///
    /// ```
    /// use skip_list::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new();
    /// let x = arena.allocate(0);
    /// assert_eq!(arena.free(x), 0);
    /// ```
    pub fn free(&mut self, entry: Entry) -> T {
        match self.blocks.get(entry.index) {
            Some(Block::Occupied(_)) => {},
            Some(Block::Vacant(_)) => panic!("Error: attempting to free vacant block."),
            None => panic!("Error: attempting to free invalid block."),
        }
        let old_block = mem::replace(&mut self.blocks[entry.index], Block::Vacant(self.head.take()));
        self.head = Some(entry);
        self.len -= 1;
        match old_block {
            Block::Occupied(value) => value,
            Block::Vacant(_) => unreachable!(),
        }
    }

    /// Returns an immutable reference to an object in the arena, or `None` if the entry does not
    /// refer to a live object.
    pub fn get(&self, entry: Entry) -> Option<&T> {
        match self.blocks.get(entry.index) {
            Some(Block::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to an object in the arena, or `None` if the entry does not
    /// refer to a live object.
    pub fn get_mut(&mut self, entry: Entry) -> Option<&mut T> {
        match self.blocks.get_mut(entry.index) {
            Some(Block::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Drops every object in the arena and releases the slab.
    pub fn clear(&mut self) {
        self.head = None;
        self.blocks = Vec::new();
        self.len = 0;
    }
}

impl<T> Default for TypedArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Entry> for TypedArena<T> {
    type Output = T;

    fn index(&self, entry: Entry) -> &Self::Output {
        self.get(entry).expect("Error: entry out of bounds.")
    }
}

impl<T> IndexMut<Entry> for TypedArena<T> {
    fn index_mut(&mut self, entry: Entry) -> &mut Self::Output {
        self.get_mut(entry).expect("Error: entry out of bounds.")
    }
}

#[cfg(test)]
mod tests {
    use super::Entry;
    use super::TypedArena;

    #[test]
    #[should_panic]
    fn test_free_invalid_block() {
        let mut arena: TypedArena<u32> = TypedArena::new();
        arena.free(Entry { index: 0 });
    }

    #[test]
    #[should_panic]
    fn test_free_vacant_block() {
        let mut arena = TypedArena::new();
        let entry = arena.allocate(0);
        arena.free(entry);
        arena.free(entry);
    }

    #[test]
    fn test_allocate() {
        let mut arena = TypedArena::new();
        assert_eq!(arena.allocate(0), Entry { index: 0 });
        assert_eq!(arena.allocate(0), Entry { index: 1 });
        assert_eq!(arena.allocate(0), Entry { index: 2 });
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_free_reuses_block() {
        let mut arena = TypedArena::new();
        let first = arena.allocate(0);
        let second = arena.allocate(1);
        assert_eq!(arena.free(first), 0);
        assert_eq!(arena.free(second), 1);
        assert!(arena.is_empty());

        // most recently freed block is reused first
        assert_eq!(arena.allocate(2), second);
        assert_eq!(arena.allocate(3), first);
        assert_eq!(arena.allocate(4), Entry { index: 2 });
    }

    #[test]
    fn test_get_vacant_block() {
        let mut arena = TypedArena::new();
        let entry = arena.allocate(0);
        arena.free(entry);
        assert_eq!(arena.get(entry), None);
        assert_eq!(arena.get(Entry { index: 5 }), None);
    }

    #[test]
    fn test_get_mut() {
        let mut arena = TypedArena::new();
        let entry = arena.allocate(0);
        *arena.get_mut(entry).unwrap() = 1;
        assert_eq!(arena[entry], 1);
    }

    #[test]
    fn test_try_reserve() {
        let mut arena = TypedArena::new();
        assert!(arena.try_reserve().is_ok());
        let entry = arena.allocate(0);
        arena.free(entry);
        assert!(arena.try_reserve().is_ok());
        assert_eq!(arena.allocate(1), entry);
    }

    #[test]
    fn test_try_reserve_does_not_grow_slab() {
        let mut arena = TypedArena::new();
        let entries = (0..3).map(|value| arena.allocate(value)).collect::<Vec<Entry>>();
        arena.free(entries[1]);

        // a vacant block is reused without touching the slab
        let capacity = arena.blocks.capacity();
        arena.try_reserve().unwrap();
        assert_eq!(arena.blocks.capacity(), capacity);
        assert_eq!(arena.allocate(7), entries[1]);
        assert_eq!(arena.blocks.capacity(), capacity);

        // with no vacant block, the slab grows up front
        arena.try_reserve().unwrap();
        let capacity = arena.blocks.capacity();
        assert!(capacity > arena.blocks.len());
        arena.allocate(8);
        assert_eq!(arena.blocks.capacity(), capacity);
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn test_clear() {
        let mut arena = TypedArena::new();
        arena.allocate(String::from("a"));
        arena.allocate(String::from("b"));
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.allocate(String::from("c")), Entry { index: 0 });
    }
}
