//! The base persistable-object abstraction.
//!
//! Every engine object embeds an [`Instance`]. The instance carries identity,
//! the edit-session counter, dirty/infant/destroying flags and non-owning
//! back-references to the book and registry it lives in.

use crate::backend::SharedBackend;
use crate::book::{Book, WeakBook};
use crate::collection::{Collection, WeakCollection};
use crate::commit::{self, CommitHooks, EditSession};
use crate::error::{CoreError, CoreResult};
use crate::guid::Guid;
use crate::slots::Slots;
use crate::types::{EntityType, Timestamp};
use parking_lot::{Mutex, MutexGuard};
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

/// Overrides the human-readable label of an instance.
///
/// Install one per entity type with [`Book::set_display_name`]. Closures of
/// the form `Fn(&Instance) -> String` implement this trait.
pub trait DisplayName: Send + Sync {
    /// Returns the label for `instance`.
    fn display_name(&self, instance: &Instance) -> String;
}

impl<F> DisplayName for F
where
    F: Fn(&Instance) -> String + Send + Sync,
{
    fn display_name(&self, instance: &Instance) -> String {
        self(instance)
    }
}

#[derive(Debug)]
struct InstanceState {
    guid: Guid,
    entity_type: Option<EntityType>,
    book: Option<WeakBook>,
    collection: Option<WeakCollection>,
    slots: Option<Slots>,
    edit_level: i32,
    dirty: bool,
    infant: bool,
    destroying: bool,
    last_update: Timestamp,
    version: i32,
    version_check: u32,
    idata: u32,
}

pub(crate) struct InstanceInner {
    state: Mutex<InstanceState>,
}

impl Drop for InstanceInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(collection) = state.collection.take().and_then(|c| c.upgrade()) {
            collection.remove_stale(&state.guid);
        }
    }
}

/// Handle to a persistable instance.
///
/// Handles are cheap to clone and all clones refer to the same instance. The
/// instance unregisters itself from its registry when the last handle is
/// dropped.
///
/// Access to a given instance is assumed to be serialized by the caller. The
/// internal lock only makes handles `Send + Sync`; it is never held while a
/// backend hook or a caller callback runs.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

impl Instance {
    /// Creates a detached instance with a fresh identity.
    ///
    /// The instance has an empty slot map, is an infant, is clean and has
    /// edit level 0. It belongs to no book until [`Instance::initialize`].
    #[must_use]
    pub fn new() -> Self {
        let state = InstanceState {
            guid: Guid::new(),
            entity_type: None,
            book: None,
            collection: None,
            slots: Some(Slots::new()),
            edit_level: 0,
            dirty: false,
            infant: true,
            destroying: false,
            last_update: Timestamp::ZERO,
            version: 0,
            version_check: 0,
            idata: 0,
        };
        Self {
            inner: Arc::new(InstanceInner {
                state: Mutex::new(state),
            }),
        }
    }

    /// Creates an instance and initializes it into `book`.
    #[must_use]
    pub fn create(entity_type: impl Into<EntityType>, book: &Book) -> Self {
        let instance = Self::new();
        instance.initialize(entity_type, Some(book));
        instance
    }

    pub(crate) fn from_inner(inner: Arc<InstanceInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<InstanceInner> {
        Arc::downgrade(&self.inner)
    }

    fn state(&self) -> MutexGuard<'_, InstanceState> {
        self.inner.state.lock()
    }

    /// Returns true if both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Binds the instance to `book` under `entity_type`.
    ///
    /// Assigns a fresh identity that is not yet present in the book's
    /// registry for the type, records the type, and registers the instance
    /// there, creating the registry if needed. Does nothing when `book` is
    /// absent or destroyed, or when the instance is already bound.
    pub fn initialize(&self, entity_type: impl Into<EntityType>, book: Option<&Book>) {
        let Some(book) = book else {
            return;
        };
        if self.state().book.is_some() {
            tracing::warn!(guid = %self.guid(), "instance already initialized");
            return;
        }
        let entity_type = entity_type.into();
        let collection = match book.get_or_create_collection(entity_type.clone()) {
            Ok(collection) => collection,
            Err(err) => {
                tracing::warn!(%entity_type, error = %err, "cannot initialize instance");
                return;
            }
        };

        let guid = loop {
            let candidate = Guid::new();
            if !collection.contains(&candidate) {
                break candidate;
            }
            tracing::warn!(%entity_type, "duplicate id created, trying again");
        };

        {
            let mut state = self.state();
            state.guid = guid;
            state.entity_type = Some(entity_type);
            state.book = Some(book.downgrade());
            state.collection = Some(collection.downgrade());
        }
        collection.insert(guid, self.downgrade());
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Returns the identity.
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.state().guid
    }

    /// Returns the identity of `instance`, or the null identity if absent.
    #[must_use]
    pub fn guid_of(instance: Option<&Self>) -> Guid {
        instance.map_or(Guid::NULL, Self::guid)
    }

    /// Re-keys the instance and re-indexes its registry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateGuid`] if another live instance is
    /// registered under `guid` in the same registry. The instance is left
    /// unchanged in that case.
    pub fn set_guid(&self, guid: Guid) -> CoreResult<()> {
        let (old, collection) = {
            let state = self.state();
            (state.guid, state.collection.as_ref().and_then(WeakCollection::upgrade))
        };
        if old == guid {
            return Ok(());
        }
        if let Some(collection) = &collection {
            collection.rekey(old, guid, self.downgrade())?;
        }
        let mut state = self.state();
        state.guid = guid;
        state.dirty = true;
        Ok(())
    }

    /// Returns the entity type, if initialized.
    #[must_use]
    pub fn entity_type(&self) -> Option<EntityType> {
        self.state().entity_type.clone()
    }

    // ------------------------------------------------------------------
    // Book and registry linkage
    // ------------------------------------------------------------------

    /// Returns the owning book, or `None` if absent or destroyed.
    #[must_use]
    pub fn book(&self) -> Option<Book> {
        self.state().book.as_ref().and_then(WeakBook::upgrade)
    }

    /// Returns the registry holding this instance, or `None` if absent or
    /// detached.
    #[must_use]
    pub fn collection(&self) -> Option<Collection> {
        self.state()
            .collection
            .as_ref()
            .and_then(WeakCollection::upgrade)
    }

    /// Returns the backend reachable through the owning book.
    #[must_use]
    pub fn backend(&self) -> Option<SharedBackend> {
        self.book().and_then(|book| book.backend())
    }

    /// Moves the instance into `book`.
    ///
    /// An initialized instance is unregistered from its current registry
    /// and registered into `book`'s registry for its type. An uninitialized
    /// instance only records the book.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BookDestroyed`] if `book` has been destroyed and
    /// [`CoreError::DuplicateGuid`] if the target registry already holds
    /// another instance with this identity.
    pub fn set_book(&self, book: &Book) -> CoreResult<()> {
        if book.is_shutting_down() {
            return Err(CoreError::BookDestroyed);
        }
        let (guid, entity_type, old) = {
            let state = self.state();
            (
                state.guid,
                state.entity_type.clone(),
                state.collection.as_ref().and_then(WeakCollection::upgrade),
            )
        };

        let target = match entity_type {
            Some(ty) => Some(book.get_or_create_collection(ty)?),
            None => None,
        };
        if let Some(target) = &target {
            if let Some(existing) = target.lookup(&guid) {
                if !existing.ptr_eq(self) {
                    return Err(CoreError::duplicate_guid(guid, target.entity_type().as_str()));
                }
            }
        }

        if let Some(old) = old {
            old.remove(&guid);
        }
        if let Some(target) = &target {
            target.insert(guid, self.downgrade());
        }
        let mut state = self.state();
        state.book = Some(book.downgrade());
        state.collection = target.map(|c| c.downgrade());
        Ok(())
    }

    /// Moves the instance into the book `other` belongs to.
    ///
    /// Does nothing if `other` has no book.
    ///
    /// # Errors
    ///
    /// See [`Instance::set_book`].
    pub fn copy_book(&self, other: &Self) -> CoreResult<()> {
        match other.book() {
            Some(book) => self.set_book(&book),
            None => Ok(()),
        }
    }

    /// Returns true if both instances belong to the same live book.
    #[must_use]
    pub fn books_equal(a: &Self, b: &Self) -> bool {
        match (a.book(), b.book()) {
            (Some(x), Some(y)) => x.ptr_eq(&y),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    /// Returns a copy of the slot payload.
    #[must_use]
    pub fn slots(&self) -> Option<Slots> {
        self.state().slots.clone()
    }

    /// Runs `f` against a snapshot of the slot payload.
    ///
    /// The instance is not locked while `f` runs, so `f` may use it.
    pub fn with_slots<R>(&self, f: impl FnOnce(Option<&Slots>) -> R) -> R {
        let slots = self.slots();
        f(slots.as_ref())
    }

    /// Replaces the slot payload and marks the instance dirty.
    ///
    /// The instance becomes dirty even if `slots` equals the current payload
    /// or is `None`.
    pub fn set_slots(&self, slots: Option<Slots>) {
        let mut state = self.state();
        state.slots = slots;
        state.dirty = true;
    }

    /// Edits the slot payload in place, creating it if absent, and marks the
    /// instance dirty.
    ///
    /// `f` edits a copy with the instance unlocked, so it may read the
    /// instance; the copy replaces the payload once `f` returns.
    pub fn update_slots<R>(&self, f: impl FnOnce(&mut Slots) -> R) -> R {
        let mut slots = self.slots().unwrap_or_default();
        let result = f(&mut slots);
        let mut state = self.state();
        state.slots = Some(slots);
        state.dirty = true;
        result
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    /// Returns true if in-memory state diverges from persisted state.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// Returns true if `instance` is present and dirty.
    #[must_use]
    pub fn is_dirty_opt(instance: Option<&Self>) -> bool {
        instance.is_some_and(Self::is_dirty)
    }

    /// Marks the instance dirty.
    pub fn set_dirty(&self) {
        self.state().dirty = true;
    }

    /// Sets the dirty flag directly.
    pub fn set_dirty_flag(&self, dirty: bool) {
        self.state().dirty = dirty;
    }

    /// Marks the instance clean. Backends call this after persisting it.
    pub fn mark_clean(&self) {
        self.state().dirty = false;
    }

    /// Returns true until the first successful backend commit.
    #[must_use]
    pub fn is_infant(&self) -> bool {
        self.state().infant
    }

    pub(crate) fn clear_infant(&self) {
        self.state().infant = false;
    }

    /// Returns true if the pending commit is a deletion.
    #[must_use]
    pub fn is_destroying(&self) -> bool {
        self.state().destroying
    }

    /// Flags the pending commit as a deletion (or not).
    pub fn set_destroying(&self, destroying: bool) {
        self.state().destroying = destroying;
    }

    // ------------------------------------------------------------------
    // Edit level
    // ------------------------------------------------------------------

    /// Returns the edit-session nesting level.
    #[must_use]
    pub fn edit_level(&self) -> i32 {
        self.state().edit_level
    }

    /// Increments the edit level without any other effect. Returns the new level.
    pub fn increase_edit_level(&self) -> i32 {
        let mut state = self.state();
        state.edit_level += 1;
        state.edit_level
    }

    /// Decrements the edit level without any other effect. Returns the new level.
    pub fn decrease_edit_level(&self) -> i32 {
        let mut state = self.state();
        state.edit_level -= 1;
        state.edit_level
    }

    /// Resets the edit level to 0.
    pub fn reset_edit_level(&self) {
        self.state().edit_level = 0;
    }

    pub(crate) fn set_edit_level(&self, level: i32) {
        self.state().edit_level = level;
    }

    // ------------------------------------------------------------------
    // Versioning
    // ------------------------------------------------------------------

    /// Returns the version timestamp.
    #[must_use]
    pub fn last_update(&self) -> Timestamp {
        self.state().last_update
    }

    /// Sets the version timestamp.
    pub fn set_last_update(&self, timestamp: Timestamp) {
        self.state().last_update = timestamp;
    }

    /// Returns the backend version counter.
    #[must_use]
    pub fn version(&self) -> i32 {
        self.state().version
    }

    /// Sets the backend version counter.
    pub fn set_version(&self, version: i32) {
        self.state().version = version;
    }

    /// Returns the backend version checksum.
    #[must_use]
    pub fn version_check(&self) -> u32 {
        self.state().version_check
    }

    /// Sets the backend version checksum.
    pub fn set_version_check(&self, value: u32) {
        self.state().version_check = value;
    }

    /// Returns the backend-private integer id.
    #[must_use]
    pub fn idata(&self) -> u32 {
        self.state().idata
    }

    /// Sets the backend-private integer id.
    pub fn set_idata(&self, idata: u32) {
        self.state().idata = idata;
    }

    /// Orders two instances by version timestamp.
    ///
    /// An absent instance sorts before any present one and two absent
    /// instances are equal.
    #[must_use]
    pub fn version_compare(a: Option<&Self>, b: Option<&Self>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.last_update().cmp(&b.last_update()),
        }
    }

    /// Orders two instances by identity. Absent instances sort first.
    #[must_use]
    pub fn guid_compare(a: Option<&Self>, b: Option<&Self>) -> Ordering {
        Self::guid_of(a).cmp(&Self::guid_of(b))
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Returns a human-readable label.
    ///
    /// Uses the [`DisplayName`] hook installed for the instance's entity
    /// type if there is one, otherwise `"<entity-type> <guid>"` (`Object`
    /// stands in for a missing type).
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(hook) = self.display_name_hook() {
            return hook.display_name(self);
        }
        let (entity_type, guid) = {
            let state = self.state();
            (state.entity_type.clone(), state.guid)
        };
        match entity_type {
            Some(ty) => format!("{ty} {guid}"),
            None => format!("Object {guid}"),
        }
    }

    /// Returns the label of `instance`, or an empty string if absent.
    #[must_use]
    pub fn display_name_of(instance: Option<&Self>) -> String {
        instance.map(Self::display_name).unwrap_or_default()
    }

    /// Returns true if a [`DisplayName`] hook is installed for the
    /// instance's entity type.
    #[must_use]
    pub fn has_display_name_hook(&self) -> bool {
        self.display_name_hook().is_some()
    }

    fn display_name_hook(&self) -> Option<Arc<dyn DisplayName>> {
        self.collection().and_then(|c| c.display_name_hook())
    }

    // ------------------------------------------------------------------
    // Edit sessions
    // ------------------------------------------------------------------

    /// Opens (or nests) an edit session. See [`commit::begin_edit`].
    pub fn begin_edit(&self) -> bool {
        commit::begin_edit(Some(self))
    }

    /// Closes one edit level. See [`commit::commit_edit`].
    pub fn commit_edit(&self) -> bool {
        commit::commit_edit(Some(self))
    }

    /// Runs the backend commit and dispatches `hooks`. See [`commit::finalize_commit`].
    pub fn finalize_commit(&self, hooks: CommitHooks<'_>) -> bool {
        commit::finalize_commit(Some(self), hooks)
    }

    /// Opens an edit session guarded by an [`EditSession`].
    pub fn edit(&self) -> EditSession<'_> {
        EditSession::open(self)
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Instance")
            .field("guid", &state.guid)
            .field("entity_type", &state.entity_type)
            .field("edit_level", &state.edit_level)
            .field("dirty", &state.dirty)
            .field("infant", &state.infant)
            .field("destroying", &state.destroying)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::SlotValue;

    #[test]
    fn new_instance_defaults() {
        let inst = Instance::new();
        assert!(!inst.guid().is_null());
        assert!(inst.collection().is_none());
        assert!(inst.book().is_none());
        assert!(inst.slots().is_some());
        assert_eq!(inst.last_update(), Timestamp::ZERO);
        assert_eq!(inst.edit_level(), 0);
        assert!(!inst.is_destroying());
        assert!(!inst.is_dirty());
        assert!(inst.is_infant());
        assert_eq!(inst.version(), 0);
        assert_eq!(inst.version_check(), 0);
        assert_eq!(inst.idata(), 0);
        assert!(!inst.has_display_name_hook());
    }

    #[test]
    fn initialize_registers_into_book() {
        let book = Book::new();
        let inst = Instance::new();
        let before = inst.guid();

        inst.initialize("test type", Some(&book));

        let after = inst.guid();
        assert_ne!(before, after);
        assert!(inst.book().unwrap().ptr_eq(&book));
        let col = book.collection("test type").unwrap();
        assert!(col.ptr_eq(&inst.collection().unwrap()));
        assert_eq!(inst.entity_type().unwrap().as_str(), "test type");
        assert_eq!(col.lookup(&after), Some(inst.clone()));
    }

    #[test]
    fn initialized_instance_is_clean_infant() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        assert!(inst.is_infant());
        assert!(!inst.is_dirty());
        assert_eq!(inst.edit_level(), 0);
        assert_ne!(inst.guid(), Guid::null());
    }

    #[test]
    fn initialize_without_book_is_noop() {
        let inst = Instance::new();
        let guid = inst.guid();
        inst.initialize("Account", None);
        assert_eq!(inst.guid(), guid);
        assert!(inst.entity_type().is_none());
        assert!(inst.collection().is_none());
    }

    #[test]
    fn second_initialize_is_ignored() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        let guid = inst.guid();
        inst.initialize("Split", Some(&book));
        assert_eq!(inst.guid(), guid);
        assert_eq!(inst.entity_type().unwrap().as_str(), "Account");
        assert!(book.collection("Split").is_none());
    }

    #[test]
    fn guid_of_absent_is_null() {
        assert!(Instance::guid_of(None).is_null());
        let inst = Instance::new();
        assert_eq!(Instance::guid_of(Some(&inst)), inst.guid());
    }

    #[test]
    fn set_guid_reindexes_collection() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        let old = inst.guid();
        let new = Guid::new();

        inst.set_guid(new).unwrap();

        let col = inst.collection().unwrap();
        assert_eq!(inst.guid(), new);
        assert!(col.lookup(&old).is_none());
        assert_eq!(col.lookup(&new), Some(inst.clone()));
        assert!(inst.is_dirty());
    }

    #[test]
    fn set_guid_rejects_collision() {
        let book = Book::new();
        let a = Instance::create("Account", &book);
        let b = Instance::create("Account", &book);
        let result = b.set_guid(a.guid());
        assert!(matches!(result, Err(CoreError::DuplicateGuid { .. })));
        assert_ne!(b.guid(), a.guid());
    }

    #[test]
    fn slots_same_value_still_dirties() {
        let inst = Instance::new();
        let slots = inst.slots();

        inst.set_slots(slots.clone());
        assert_eq!(inst.slots(), slots);
        assert!(inst.is_dirty());

        inst.mark_clean();
        inst.set_slots(slots.clone());
        assert!(inst.is_dirty());
    }

    #[test]
    fn slots_replace_and_clear() {
        let inst = Instance::new();
        let mut other = Slots::new();
        other.insert("memo", SlotValue::Text("x".into()));

        inst.set_slots(Some(other.clone()));
        assert_eq!(inst.slots(), Some(other));
        assert!(inst.is_dirty());

        inst.mark_clean();
        inst.set_slots(None);
        assert!(inst.slots().is_none());
        assert!(inst.is_dirty());
    }

    #[test]
    fn update_slots_creates_missing_payload() {
        let inst = Instance::new();
        inst.set_slots(None);
        inst.mark_clean();
        inst.update_slots(|s| s.insert("n", SlotValue::Int(1)));
        assert!(inst.is_dirty());
        let n = inst.with_slots(|s| s.and_then(|s| s.get("n")).cloned());
        assert_eq!(n, Some(SlotValue::Int(1)));
    }

    #[test]
    fn version_compare_orders_absent_first() {
        let left = Instance::new();
        let right = Instance::new();

        assert_eq!(Instance::version_compare(None, None), Ordering::Equal);
        assert_eq!(Instance::version_compare(None, Some(&right)), Ordering::Less);
        assert_eq!(Instance::version_compare(Some(&left), None), Ordering::Greater);

        left.set_last_update(Timestamp::new(0));
        right.set_last_update(Timestamp::new(1));
        assert_eq!(Instance::version_compare(Some(&left), Some(&right)), Ordering::Less);

        left.set_last_update(Timestamp::new(1));
        right.set_last_update(Timestamp::new(0));
        assert_eq!(Instance::version_compare(Some(&left), Some(&right)), Ordering::Greater);

        right.set_last_update(Timestamp::new(1));
        assert_eq!(Instance::version_compare(Some(&left), Some(&right)), Ordering::Equal);
    }

    #[test]
    fn dirty_flag_round_trip() {
        let inst = Instance::new();
        assert!(!Instance::is_dirty_opt(None));
        assert!(!inst.is_dirty());
        inst.set_dirty();
        assert!(inst.is_dirty());
        assert!(Instance::is_dirty_opt(Some(&inst)));
        inst.set_dirty_flag(false);
        assert!(!inst.is_dirty());
    }

    #[test]
    fn default_display_name() {
        let book = Book::new();
        let inst = Instance::create("test type", &book);
        assert_eq!(inst.display_name(), format!("test type {}", inst.guid()));
    }

    #[test]
    fn display_name_of_uninitialized_instance() {
        let inst = Instance::new();
        assert_eq!(inst.display_name(), format!("Object {}", inst.guid()));
    }

    #[test]
    fn display_name_hook_overrides_default() {
        let book = Book::new();
        book.set_display_name("Mock", |i: &Instance| format!("Mock {}", i.idata()))
            .unwrap();
        let inst = Instance::create("Mock", &book);
        let other = Instance::create("Account", &book);
        inst.set_idata(3);

        assert!(inst.has_display_name_hook());
        assert_eq!(inst.display_name(), "Mock 3");
        assert!(!other.has_display_name_hook());
        assert_eq!(other.display_name(), format!("Account {}", other.guid()));
    }

    #[test]
    fn display_name_hook_may_read_instance_state() {
        let book = Book::new();
        book.set_display_name("Account", |i: &Instance| {
            format!("{} dirty={}", i.entity_type().unwrap(), i.is_dirty())
        })
        .unwrap();
        let inst = Instance::create("Account", &book);
        assert_eq!(inst.display_name(), "Account dirty=false");
    }

    #[test]
    fn slot_closures_may_read_the_instance() {
        let inst = Instance::new();
        inst.update_slots(|s| {
            s.insert("dirty", SlotValue::Int(i64::from(inst.is_dirty())));
        });
        assert!(inst.is_dirty());
        let seen = inst.with_slots(|s| {
            (s.and_then(|s| s.get("dirty")).cloned(), inst.edit_level())
        });
        assert_eq!(seen, (Some(SlotValue::Int(0)), 0));
    }

    #[test]
    fn display_name_of_absent_is_empty() {
        assert_eq!(Instance::display_name_of(None), "");
    }

    #[test]
    fn drop_unregisters_from_collection() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        let guid = inst.guid();
        let col = book.collection("Account").unwrap();
        assert_eq!(col.len(), 1);

        drop(inst);

        assert!(col.lookup(&guid).is_none());
        assert_eq!(col.len(), 0);
    }

    #[test]
    fn clone_keeps_registration_alive() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        let other = inst.clone();
        drop(inst);
        let col = book.collection("Account").unwrap();
        assert_eq!(col.lookup(&other.guid()), Some(other));
    }

    #[test]
    fn set_book_moves_registration() {
        let first = Book::new();
        let second = Book::new();
        let inst = Instance::create("Account", &first);
        let guid = inst.guid();

        inst.set_book(&second).unwrap();

        assert!(first.collection("Account").unwrap().lookup(&guid).is_none());
        assert!(second.collection("Account").unwrap().lookup(&guid).is_some());
        assert!(inst.book().unwrap().ptr_eq(&second));
    }

    #[test]
    fn set_book_on_uninitialized_instance_records_book_only() {
        let book = Book::new();
        let inst = Instance::new();
        inst.set_book(&book).unwrap();
        assert!(inst.book().unwrap().ptr_eq(&book));
        assert!(inst.collection().is_none());
        assert_eq!(book.collection_count(), 0);
    }

    #[test]
    fn copy_book_and_books_equal() {
        let book = Book::new();
        let a = Instance::create("Account", &book);
        let b = Instance::new();
        assert!(!Instance::books_equal(&a, &b));
        b.copy_book(&a).unwrap();
        assert!(Instance::books_equal(&a, &b));
    }

    #[test]
    fn destroyed_book_is_unavailable() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        book.destroy();
        assert!(inst.book().is_none());
        assert!(inst.collection().is_none());
        assert!(inst.backend().is_none());
    }

    #[test]
    fn dropped_book_is_unavailable() {
        let book = Book::new();
        let inst = Instance::create("Account", &book);
        drop(book);
        assert!(inst.book().is_none());
        assert!(inst.collection().is_none());
    }

    #[test]
    fn guid_compare_orders_by_identity() {
        let a = Instance::new();
        let b = Instance::new();
        a.set_guid(Guid::from_bytes([1; 16])).unwrap();
        b.set_guid(Guid::from_bytes([2; 16])).unwrap();
        assert_eq!(Instance::guid_compare(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(Instance::guid_compare(None, Some(&a)), Ordering::Less);
    }
}
