//! Fixed-capacity, insertion-ordered associative containers pre-allocated
//! per request: [`KeyValueStore`] (headers and query) and [`PathParams`]
//! (path parameters, filled in by an external router, out of scope here,
//! see spec.md §1).
//!
//! Entries never store a live `&[u8]` pointing at a sibling field, since
//! that would make [`crate::request_state::RequestState`] self-referential.
//! Instead they store a [`Loc`] (a location description: a range in the
//! static buffer, or a range inside one of the request [`crate::arena::Arena`]
//! allocations) and are resolved against `buf`/`arena` on lookup. This is
//! what lets the containers themselves be allocated once and reset between
//! requests without unsafe code.

use crate::arena::Arena;
use crate::error::CapacityError;

/// Where a stored byte slice actually lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Loc {
    /// `buf[start..end]` of the request's static buffer.
    Buf(usize, usize),
    /// `arena.get(index)[start..end]`, for values moved into or decoded
    /// into an overflow allocation.
    Arena(usize, usize, usize),
}

impl Loc {
    pub fn resolve<'a>(&self, buf: &'a [u8], arena: &'a Arena) -> &'a [u8] {
        match *self {
            Loc::Buf(start, end) => &buf[start..end],
            Loc::Arena(index, start, end) => &arena.get(index)[start..end],
        }
    }
}

/// An insertion-ordered (name, value) container with a fixed capacity set
/// at construction. Used for both the header container and the
/// query-string container.
pub struct KeyValueStore {
    entries: Vec<(Loc, Loc)>,
    capacity: usize,
}

impl KeyValueStore {
    pub fn new(capacity: usize) -> Self {
        KeyValueStore {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a (name, value) pair. Fails if the container is already at
    /// capacity; the caller decides what that means (the parser turns header
    /// overflow into `ParseError::TooManyHeaders`; query overflow is
    /// silently capped, see DESIGN.md).
    pub fn try_push(&mut self, name: Loc, value: Loc) -> Result<(), CapacityError> {
        if self.entries.len() >= self.capacity {
            return Err(CapacityError);
        }
        self.entries.push((name, value));
        Ok(())
    }

    /// Linear lookup by exact byte match. Header lookups are
    /// case-insensitive only because stored names were lowercased on
    /// parse; callers MUST pass an already-lowercased `name`.
    pub fn get<'a>(&self, buf: &'a [u8], arena: &'a Arena, name: &[u8]) -> Option<&'a [u8]> {
        for (n, v) in &self.entries {
            if n.resolve(buf, arena) == name {
                return Some(v.resolve(buf, arena));
            }
        }
        None
    }

    pub fn iter<'a>(
        &'a self,
        buf: &'a [u8],
        arena: &'a Arena,
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.entries
            .iter()
            .map(move |(n, v)| (n.resolve(buf, arena), v.resolve(buf, arena)))
    }
}

/// Path parameters extracted by an external router. Parameter names come
/// from the router's route pattern (typically `&'static str` literals, e.g.
/// `"order_id"`), not from request bytes, so only the value needs a [`Loc`].
pub struct PathParams {
    entries: Vec<(&'static str, Loc)>,
    capacity: usize,
}

impl PathParams {
    pub fn new(capacity: usize) -> Self {
        PathParams {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn try_push(&mut self, name: &'static str, value: Loc) -> Result<(), CapacityError> {
        if self.entries.len() >= self.capacity {
            return Err(CapacityError);
        }
        self.entries.push((name, value));
        Ok(())
    }

    pub fn get<'a>(&self, buf: &'a [u8], arena: &'a Arena, name: &str) -> Option<&'a [u8]> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.resolve(buf, arena))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_header_store_lookup() {
        let buf = b"host: example.com\r\n";
        let arena = Arena::new();
        let mut store = KeyValueStore::new(4);
        store
            .try_push(Loc::Buf(0, 4), Loc::Buf(6, 17))
            .unwrap();

        assert_eq!(store.get(buf, &arena, b"host"), Some(&buf[6..17]));
        assert_eq!(store.get(buf, &arena, b"missing"), None);
    }

    #[test]
    fn test_capacity_enforced() {
        let mut store = KeyValueStore::new(1);
        assert!(store.try_push(Loc::Buf(0, 1), Loc::Buf(0, 1)).is_ok());
        assert!(store.try_push(Loc::Buf(0, 1), Loc::Buf(0, 1)).is_err());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let buf = b"abcdef";
        let arena = Arena::new();
        let mut store = KeyValueStore::new(4);
        store.try_push(Loc::Buf(0, 1), Loc::Buf(1, 2)).unwrap();
        store.try_push(Loc::Buf(2, 3), Loc::Buf(3, 4)).unwrap();

        let collected: Vec<_> = store.iter(buf, &arena).collect();
        assert_eq!(collected, vec![(&buf[0..1], &buf[1..2]), (&buf[2..3], &buf[3..4])]);
    }

    #[test]
    fn test_arena_backed_value() {
        let buf = b"ignored";
        let mut arena = Arena::new();
        let idx = arena.alloc(5);
        arena.get_mut(idx).copy_from_slice(b"hello");

        let mut store = KeyValueStore::new(1);
        store
            .try_push(Loc::Buf(0, 0), Loc::Arena(idx, 0, 5))
            .unwrap();
        assert_eq!(store.get(buf, &arena, b""), Some(&b"hello"[..]));
    }

    #[test]
    fn test_path_params() {
        let buf = b"/orders/42";
        let arena = Arena::new();
        let mut params = PathParams::new(2);
        params.try_push("order_id", Loc::Buf(8, 10)).unwrap();

        assert_eq!(params.get(buf, &arena, "order_id"), Some(&buf[8..10]));
        assert_eq!(params.get(buf, &arena, "item_id"), None);
    }
}
