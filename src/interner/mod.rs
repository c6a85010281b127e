/*!
Content-addressed interning of path attribute values.

Every AS path, community list, extended community list, and full attribute
set decoded from UPDATE messages is deduplicated into a store and referenced
by a typed key. Equality of keys is equality of content, so routes sharing
byte-identical attributes share one entry, and the last release of a key
frees it.

The stores are plain single-writer structures: one session worker owns them
together with the routing tables.
*/
use crate::models::{AsPath, AttrSet, CommunityList, ExtCommunityList, PathAttributes};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Handle into an [InternStore]. Copyable; does not count as a reference by
/// itself -- the refcount is moved explicitly with `retain`/`unintern`.
pub struct InternKey<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> InternKey<T> {
    fn new(index: usize) -> Self {
        InternKey {
            index,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for InternKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InternKey<T> {}

impl<T> PartialEq for InternKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for InternKey<T> {}

impl<T> Hash for InternKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for InternKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InternKey({})", self.index)
    }
}

struct InternSlot<T> {
    value: T,
    refcount: u32,
}

/// One reference-counted, content-addressed store.
pub struct InternStore<T> {
    slots: Vec<Option<InternSlot<T>>>,
    free: Vec<usize>,
    index: HashMap<T, usize>,
}

impl<T: Clone + Eq + Hash> InternStore<T> {
    pub fn new() -> Self {
        InternStore {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Intern `value`: return the canonical key for its content, holding one
    /// new reference. The transient input is consumed.
    pub fn intern(&mut self, value: T) -> InternKey<T> {
        if let Some(&slot) = self.index.get(&value) {
            self.slot_mut(slot).refcount += 1;
            return InternKey::new(slot);
        }

        let slot = InternSlot {
            value: value.clone(),
            refcount: 1,
        };
        let index = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(value, index);
        InternKey::new(index)
    }

    /// Take one more reference to an already-interned entry.
    pub fn retain(&mut self, key: InternKey<T>) {
        self.slot_mut(key.index).refcount += 1;
    }

    /// Drop one reference. When the count reaches zero the entry leaves the
    /// store and its value is handed back so the caller can release any
    /// sub-handles it owns.
    pub fn unintern(&mut self, key: InternKey<T>) -> Option<T> {
        let slot = self.slot_mut(key.index);
        debug_assert!(slot.refcount > 0);
        slot.refcount -= 1;
        if slot.refcount > 0 {
            return None;
        }

        let slot = self.slots[key.index].take().expect("live interned slot");
        self.index.remove(&slot.value);
        self.free.push(key.index);
        Some(slot.value)
    }

    /// Non-refcounting query: the key an equal value would intern to.
    pub fn lookup(&self, value: &T) -> Option<InternKey<T>> {
        self.index.get(value).map(|&i| InternKey::new(i))
    }

    pub fn get(&self, key: InternKey<T>) -> &T {
        &self.slot(key.index).value
    }

    pub fn refcount(&self, key: InternKey<T>) -> u32 {
        self.slot(key.index).refcount
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn slot(&self, index: usize) -> &InternSlot<T> {
        self.slots[index].as_ref().expect("live interned slot")
    }

    fn slot_mut(&mut self, index: usize) -> &mut InternSlot<T> {
        self.slots[index].as_mut().expect("live interned slot")
    }
}

impl<T: Clone + Eq + Hash> Default for InternStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The four interning tables, owned by the session worker for its lifetime.
#[derive(Default)]
pub struct AttrStores {
    as_paths: InternStore<AsPath>,
    communities: InternStore<CommunityList>,
    ext_communities: InternStore<ExtCommunityList>,
    attr_sets: InternStore<AttrSet>,
}

impl AttrStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a freshly parsed attribute collection, returning the canonical
    /// set key with one reference held.
    ///
    /// Invariant: every live [AttrSet] owns exactly one reference to each of
    /// its sub-handles. When an equal set already exists the references taken
    /// here for the sub-values are given back.
    pub fn intern_attrs(&mut self, parsed: PathAttributes) -> InternKey<AttrSet> {
        let PathAttributes {
            origin,
            next_hop,
            med,
            local_pref,
            path_limit,
            as_path,
            communities,
            ext_communities,
        } = parsed;

        let as_path = as_path.map(|v| self.as_paths.intern(v));
        let communities = communities.map(|v| self.communities.intern(v));
        let ext_communities = ext_communities.map(|v| self.ext_communities.intern(v));

        let set = AttrSet {
            origin,
            next_hop,
            med,
            local_pref,
            path_limit,
            as_path,
            communities,
            ext_communities,
        };

        match self.attr_sets.lookup(&set) {
            Some(existing) => {
                if let Some(key) = as_path {
                    self.as_paths.unintern(key);
                }
                if let Some(key) = communities {
                    self.communities.unintern(key);
                }
                if let Some(key) = ext_communities {
                    self.ext_communities.unintern(key);
                }
                self.attr_sets.retain(existing);
                existing
            }
            None => self.attr_sets.intern(set),
        }
    }

    /// Take one more reference to an attribute set.
    pub fn retain_attrs(&mut self, key: InternKey<AttrSet>) {
        self.attr_sets.retain(key);
    }

    /// Drop one reference to an attribute set, releasing its sub-handles when
    /// it dies.
    pub fn unintern_attrs(&mut self, key: InternKey<AttrSet>) {
        if let Some(set) = self.attr_sets.unintern(key) {
            if let Some(key) = set.as_path {
                self.as_paths.unintern(key);
            }
            if let Some(key) = set.communities {
                self.communities.unintern(key);
            }
            if let Some(key) = set.ext_communities {
                self.ext_communities.unintern(key);
            }
        }
    }

    pub fn attr_set(&self, key: InternKey<AttrSet>) -> &AttrSet {
        self.attr_sets.get(key)
    }

    pub fn as_path(&self, key: InternKey<AsPath>) -> &AsPath {
        self.as_paths.get(key)
    }

    pub fn communities(&self, key: InternKey<CommunityList>) -> &CommunityList {
        self.communities.get(key)
    }

    pub fn ext_communities(&self, key: InternKey<ExtCommunityList>) -> &ExtCommunityList {
        self.ext_communities.get(key)
    }

    pub fn attr_sets(&self) -> &InternStore<AttrSet> {
        &self.attr_sets
    }

    pub fn as_paths(&self) -> &InternStore<AsPath> {
        &self.as_paths
    }

    pub fn community_lists(&self) -> &InternStore<CommunityList> {
        &self.communities
    }

    pub fn ext_community_lists(&self) -> &InternStore<ExtCommunityList> {
        &self.ext_communities
    }

    /// True when no attribute of any kind is interned.
    pub fn is_empty(&self) -> bool {
        self.as_paths.is_empty()
            && self.communities.is_empty()
            && self.ext_communities.is_empty()
            && self.attr_sets.is_empty()
    }
}
