//! Per-type entity registry.
//!
//! A book keeps one [`Collection`] per entity type. Registries index live
//! instances by identity but never own them: entries are weak, and an
//! instance removes itself when its last handle is dropped.

use crate::error::{CoreError, CoreResult};
use crate::guid::Guid;
use crate::instance::{DisplayName, Instance, InstanceInner};
use crate::types::EntityType;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

pub(crate) struct CollectionInner {
    entity_type: EntityType,
    entries: RwLock<HashMap<Guid, Weak<InstanceInner>>>,
    display_name: RwLock<Option<Arc<dyn DisplayName>>>,
    detached: AtomicBool,
}

/// Identity-to-instance registry for one entity type.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

/// Non-owning reference to a registry, held by its instances.
#[derive(Clone)]
pub(crate) struct WeakCollection(Weak<CollectionInner>);

impl WeakCollection {
    /// Returns the registry unless it was dropped or detached from its book.
    pub(crate) fn upgrade(&self) -> Option<Collection> {
        let inner = self.0.upgrade()?;
        if inner.detached.load(AtomicOrdering::Acquire) {
            return None;
        }
        Some(Collection { inner })
    }
}

impl fmt::Debug for WeakCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakCollection")
    }
}

impl Collection {
    pub(crate) fn new(entity_type: EntityType) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                entity_type,
                entries: RwLock::new(HashMap::new()),
                display_name: RwLock::new(None),
                detached: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakCollection {
        WeakCollection(Arc::downgrade(&self.inner))
    }

    /// Returns the entity type this registry holds.
    #[must_use]
    pub fn entity_type(&self) -> &EntityType {
        &self.inner.entity_type
    }

    /// Returns true if both handles refer to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Looks up the live instance registered under `guid`.
    #[must_use]
    pub fn lookup(&self, guid: &Guid) -> Option<Instance> {
        self.inner
            .entries
            .read()
            .get(guid)
            .and_then(Weak::upgrade)
            .map(Instance::from_inner)
    }

    /// Returns true if a live instance is registered under `guid`.
    #[must_use]
    pub fn contains(&self, guid: &Guid) -> bool {
        self.lookup(guid).is_some()
    }

    /// Returns the number of live instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Returns true if no live instance is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the identities of all live instances.
    #[must_use]
    pub fn guids(&self) -> Vec<Guid> {
        self.inner
            .entries
            .read()
            .iter()
            .filter(|(_, w)| w.strong_count() > 0)
            .map(|(guid, _)| *guid)
            .collect()
    }

    /// Returns handles to all live instances.
    #[must_use]
    pub fn instances(&self) -> Vec<Instance> {
        self.inner
            .entries
            .read()
            .values()
            .filter_map(Weak::upgrade)
            .map(Instance::from_inner)
            .collect()
    }

    /// Calls `f` for every live instance.
    ///
    /// Iterates over a snapshot, so `f` may create, re-key or drop instances.
    pub fn for_each(&self, mut f: impl FnMut(&Instance)) {
        for instance in self.instances() {
            f(&instance);
        }
    }

    /// Returns true if any live instance is dirty.
    ///
    /// Computed on demand from the instances' own flags.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.instances().iter().any(Instance::is_dirty)
    }

    /// Marks every live instance clean.
    pub fn mark_clean(&self) {
        self.for_each(Instance::mark_clean);
    }

    /// Returns true once the owning book has been destroyed.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(AtomicOrdering::Acquire)
    }

    /// Orders registries by entity type. Absent registries sort first.
    #[must_use]
    pub fn compare(a: Option<&Self>, b: Option<&Self>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.entity_type().cmp(b.entity_type()),
        }
    }

    pub(crate) fn set_display_name(&self, hook: Option<Arc<dyn DisplayName>>) {
        *self.inner.display_name.write() = hook;
    }

    pub(crate) fn display_name_hook(&self) -> Option<Arc<dyn DisplayName>> {
        self.inner.display_name.read().clone()
    }

    pub(crate) fn insert(&self, guid: Guid, instance: Weak<InstanceInner>) {
        self.inner.entries.write().insert(guid, instance);
    }

    pub(crate) fn remove(&self, guid: &Guid) {
        self.inner.entries.write().remove(guid);
    }

    /// Removes the entry for `guid` only if its instance is gone.
    pub(crate) fn remove_stale(&self, guid: &Guid) {
        let mut entries = self.inner.entries.write();
        if entries.get(guid).is_some_and(|w| w.strong_count() == 0) {
            entries.remove(guid);
        }
    }

    pub(crate) fn rekey(&self, old: Guid, new: Guid, instance: Weak<InstanceInner>) -> CoreResult<()> {
        let mut entries = self.inner.entries.write();
        if let Some(existing) = entries.get(&new) {
            if existing.strong_count() > 0 && !existing.ptr_eq(&instance) {
                return Err(CoreError::duplicate_guid(new, self.inner.entity_type.as_str()));
            }
        }
        entries.remove(&old);
        entries.insert(new, instance);
        Ok(())
    }

    pub(crate) fn detach(&self) {
        self.inner.detached.store(true, AtomicOrdering::Release);
        self.inner.entries.write().clear();
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("entity_type", &self.inner.entity_type)
            .field("len", &self.len())
            .field("detached", &self.is_detached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Book;

    #[test]
    fn lookup_missing_returns_none() {
        let col = Collection::new(EntityType::from("Account"));
        assert!(col.lookup(&Guid::new()).is_none());
        assert!(col.is_empty());
    }

    #[test]
    fn lookup_registered_instance() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        let col = book.collection("Account").unwrap();
        assert_eq!(col.lookup(&inst.guid()), Some(inst.clone()));
        assert!(col.contains(&inst.guid()));
        assert_eq!(col.guids(), vec![inst.guid()]);
    }

    #[test]
    fn is_dirty_tracks_members() {
        let book = Book::new();
        let a = Instance::create("Account", &book);
        let b = Instance::create("Account", &book);
        let col = book.collection("Account").unwrap();

        assert!(!col.is_dirty());
        b.set_dirty();
        assert!(col.is_dirty());
        b.mark_clean();
        assert!(!col.is_dirty());
        a.set_dirty();
        assert!(col.is_dirty());
    }

    #[test]
    fn dropped_dirty_instance_no_longer_counts() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        inst.set_dirty();
        let col = book.collection("Account").unwrap();
        assert!(col.is_dirty());
        drop(inst);
        assert!(!col.is_dirty());
    }

    #[test]
    fn mark_clean_clears_all_members() {
        let book = Book::new();
        let a = Instance::create("Account", &book);
        let b = Instance::create("Account", &book);
        a.set_dirty();
        b.set_dirty();
        let col = book.collection("Account").unwrap();
        col.mark_clean();
        assert!(!a.is_dirty());
        assert!(!b.is_dirty());
    }

    #[test]
    fn for_each_visits_all() {
        let book = Book::new();
        let _a = Instance::create("Account", &book);
        let _b = Instance::create("Account", &book);
        let col = book.collection("Account").unwrap();
        let mut seen = 0;
        col.for_each(|_| seen += 1);
        assert_eq!(seen, 2);
    }

    #[test]
    fn compare_by_type() {
        let a = Collection::new(EntityType::from("Account"));
        let s = Collection::new(EntityType::from("Split"));
        assert_eq!(Collection::compare(Some(&a), Some(&s)), Ordering::Less);
        assert_eq!(Collection::compare(None, Some(&a)), Ordering::Less);
        assert_eq!(Collection::compare(None, None), Ordering::Equal);
    }

    #[test]
    fn detach_empties_registry() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        let col = book.collection("Account").unwrap();
        col.detach();
        assert!(col.is_detached());
        assert!(col.lookup(&inst.guid()).is_none());
        assert!(inst.collection().is_none());
    }
}
