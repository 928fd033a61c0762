//! Observable lists.
//!
//! [`CoreList`] is an ordered collection of [`Value`]s that fires one
//! [`ListChange`] per mutation. When a list is stored in an object property
//! the object becomes the list's owner and the hierarchical parent of every
//! object item.
//!
//! Move notifications use final-index semantics: after
//! `move_item(old, new)` the item sits at `new`, and after
//! `move_range(old, count, new)` the moved block starts at `new`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::{ModelError, ModelResult};
use crate::event::ListenerSet;
use crate::object::{self, CoreObject, WeakObject};
use crate::value::Value;

/// What [`CoreList::clear`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetBehavior {
    /// Fire [`ListChange::Reset`].
    #[default]
    Reset,
    /// Fire [`ListChange::Remove`] carrying every removed item.
    Remove,
}

/// A list mutation.
#[derive(Debug, Clone)]
pub enum ListChange {
    Insert {
        index: usize,
        items: Vec<Value>,
    },
    Remove {
        index: usize,
        items: Vec<Value>,
    },
    Move {
        old_index: usize,
        new_index: usize,
        items: Vec<Value>,
    },
    Replace {
        index: usize,
        old_items: Vec<Value>,
        new_items: Vec<Value>,
    },
    /// The contents changed wholesale and the previous items are not reported.
    Reset,
}

struct ListInner {
    items: RefCell<Vec<Value>>,
    owner: RefCell<Option<WeakObject>>,
    reset_behavior: Cell<ResetBehavior>,
    changed: ListenerSet<ListChange>,
}

/// Shared handle to an observable list. Clones refer to the same list.
#[derive(Clone)]
pub struct CoreList(Rc<ListInner>);

impl CoreList {
    pub fn new() -> Self {
        Self(Rc::new(ListInner {
            items: RefCell::new(Vec::new()),
            owner: RefCell::new(None),
            reset_behavior: Cell::new(ResetBehavior::default()),
            changed: ListenerSet::new(),
        }))
    }

    pub fn from_values<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let list = Self::new();
        *list.0.items.borrow_mut() = items.into_iter().map(Into::into).collect();
        list
    }

    #[must_use]
    pub fn with_reset_behavior(self, behavior: ResetBehavior) -> Self {
        self.0.reset_behavior.set(behavior);
        self
    }

    pub fn reset_behavior(&self) -> ResetBehavior {
        self.0.reset_behavior.get()
    }

    pub fn set_reset_behavior(&self, behavior: ResetBehavior) {
        self.0.reset_behavior.set(behavior);
    }

    pub fn changed(&self) -> &ListenerSet<ListChange> {
        &self.0.changed
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.borrow().get(index).cloned()
    }

    /// Snapshot of the current items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.0.items.borrow().iter().position(|item| item == value)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    /// The object whose property holds this list.
    pub fn owner(&self) -> Option<CoreObject> {
        self.0
            .owner
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .map(CoreObject::from_inner)
    }

    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }

    pub fn ptr_eq(&self, other: &CoreList) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn push(&self, item: impl Into<Value>) {
        let index = self.len();
        self.splice_in(index, vec![item.into()]);
    }

    /// Appends every item, firing a single insert.
    pub fn extend<I>(&self, items: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let index = self.len();
        self.splice_in(index, items.into_iter().map(Into::into).collect());
    }

    pub fn insert(&self, index: usize, item: impl Into<Value>) -> ModelResult {
        self.insert_range(index, vec![item.into()])
    }

    pub fn insert_range(&self, index: usize, items: Vec<Value>) -> ModelResult {
        let len = self.len();
        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        self.splice_in(index, items);
        Ok(())
    }

    /// Removes the first item equal to `item`. Returns `false` if absent.
    pub fn remove(&self, item: &Value) -> bool {
        match self.index_of(item) {
            Some(index) => self.remove_range(index, 1).is_ok(),
            None => false,
        }
    }

    pub fn remove_at(&self, index: usize) -> ModelResult<Value> {
        let mut removed = self.remove_range(index, 1)?;
        removed
            .pop()
            .ok_or(ModelError::IndexOutOfRange { index, len: 0 })
    }

    pub fn remove_range(&self, index: usize, count: usize) -> ModelResult<Vec<Value>> {
        let len = self.len();
        check_range(index, count, len)?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let removed: Vec<Value> = self
            .0
            .items
            .borrow_mut()
            .drain(index..index + count)
            .collect();
        self.release_all(&removed);
        self.0.changed.emit(&ListChange::Remove {
            index,
            items: removed.clone(),
        });
        Ok(removed)
    }

    /// Removes every item, reporting according to [`ResetBehavior`].
    pub fn clear(&self) {
        if self.is_empty() {
            return;
        }
        let removed = std::mem::take(&mut *self.0.items.borrow_mut());
        self.release_all(&removed);
        log::trace!("list cleared ({} items, {:?})", removed.len(), self.reset_behavior());
        match self.reset_behavior() {
            ResetBehavior::Reset => self.0.changed.emit(&ListChange::Reset),
            ResetBehavior::Remove => self.0.changed.emit(&ListChange::Remove {
                index: 0,
                items: removed,
            }),
        }
    }

    /// Moves one item so that it ends up at `new_index`.
    pub fn move_item(&self, old_index: usize, new_index: usize) -> ModelResult {
        self.move_range(old_index, 1, new_index)
    }

    /// Moves `count` items starting at `old_index` so that the block starts
    /// at `new_index` afterwards.
    pub fn move_range(&self, old_index: usize, count: usize, new_index: usize) -> ModelResult {
        let len = self.len();
        check_range(old_index, count, len)?;
        check_range(new_index, count, len)?;
        if count == 0 || old_index == new_index {
            return Ok(());
        }
        let moved: Vec<Value> = {
            let mut items = self.0.items.borrow_mut();
            let moved: Vec<Value> = items.drain(old_index..old_index + count).collect();
            items.splice(new_index..new_index, moved.iter().cloned());
            moved
        };
        self.0.changed.emit(&ListChange::Move {
            old_index,
            new_index,
            items: moved,
        });
        Ok(())
    }

    /// Replaces the item at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: impl Into<Value>) -> ModelResult<Value> {
        let item = item.into();
        let old = {
            let mut items = self.0.items.borrow_mut();
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or(ModelError::IndexOutOfRange { index, len })?;
            if *slot == item {
                return Ok(item);
            }
            std::mem::replace(slot, item.clone())
        };
        self.release_all(std::slice::from_ref(&old));
        self.adopt_all(std::slice::from_ref(&item));
        self.0.changed.emit(&ListChange::Replace {
            index,
            old_items: vec![old.clone()],
            new_items: vec![item],
        });
        Ok(old)
    }

    /// Replaces the whole contents with a single replace notification.
    pub fn replace_all(&self, items: Vec<Value>) {
        let old_items = std::mem::replace(&mut *self.0.items.borrow_mut(), items.clone());
        self.release_all(&old_items);
        self.adopt_all(&items);
        self.0.changed.emit(&ListChange::Replace {
            index: 0,
            old_items,
            new_items: items,
        });
    }

    pub(crate) fn attach_owner(&self, owner: WeakObject) {
        *self.0.owner.borrow_mut() = Some(owner);
        let items = self.to_vec();
        self.adopt_all(&items);
    }

    pub(crate) fn detach_owner(&self, owner: &WeakObject) {
        let attached = matches!(&*self.0.owner.borrow(), Some(current) if current.ptr_eq(owner));
        if attached {
            let items = self.to_vec();
            self.release_all(&items);
            *self.0.owner.borrow_mut() = None;
        }
    }

    fn splice_in(&self, index: usize, items: Vec<Value>) {
        if items.is_empty() {
            return;
        }
        self.0
            .items
            .borrow_mut()
            .splice(index..index, items.iter().cloned());
        self.adopt_all(&items);
        self.0.changed.emit(&ListChange::Insert { index, items });
    }

    fn adopt_all(&self, items: &[Value]) {
        let owner = self.0.owner.borrow().clone();
        if let Some(owner) = owner {
            for item in items {
                object::adopt(&owner, item);
            }
        }
    }

    fn release_all(&self, items: &[Value]) {
        let owner = self.0.owner.borrow().clone();
        if let Some(owner) = owner {
            for item in items {
                object::release(&owner, item);
            }
        }
    }
}

fn check_range(index: usize, count: usize, len: usize) -> ModelResult {
    if index.checked_add(count).is_none_or(|end| end > len) {
        return Err(ModelError::IndexOutOfRange { index, len });
    }
    Ok(())
}

impl Default for CoreList {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CoreList {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for CoreList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.items.borrow().iter()).finish()
    }
}
