use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use strata_core::{CoreList, CoreObject, ListChange, ListenerId, Value};

use super::{ChildObserver, ObserverContext, OperationObserver, OperationSink, OperationStream};
use crate::operation::{
    InsertCollectionRangeOperation, MoveCollectionRangeOperation, RemoveCollectionRangeOperation,
    resolve_list,
};
use crate::path::TrackedPaths;
use crate::sequence::OperationSequenceGenerator;

/// Observes a list held by `owner` at `path`.
///
/// Each list change becomes one collection operation; a replacement becomes
/// a removal followed by an insertion at the same index. Item changes are
/// reported by per-item child observers under the collection's own path.
///
/// A list that `owner` does not hold directly at `path` (a list nested as
/// an item of another list) is pinned into the recorded operations.
///
/// A [`ListChange::Reset`] cannot be inverted and records nothing. Lists
/// that must stay undoable across `clear` should use
/// [`ResetBehavior::Remove`](strata_core::ResetBehavior::Remove).
pub struct CollectionObserver(Rc<CollectionObserverInner>);

struct ItemObserver {
    refs: usize,
    observer: ChildObserver,
}

struct CollectionObserverInner {
    list: CoreList,
    owner: CoreObject,
    path: String,
    pinned: bool,
    ctx: ObserverContext,
    stream: Rc<OperationStream>,
    items: RefCell<HashMap<*const (), ItemObserver>>,
    listener: Cell<Option<ListenerId>>,
    disposed: Cell<bool>,
}

impl CollectionObserver {
    pub fn new(
        sink: Option<Rc<dyn OperationSink>>,
        list: CoreList,
        owner: CoreObject,
        path: impl Into<String>,
        sequence: OperationSequenceGenerator,
        tracked_paths: Option<TrackedPaths>,
    ) -> Self {
        Self::with_context(
            sink,
            list,
            owner,
            path.into(),
            ObserverContext::new(sequence, tracked_paths),
        )
    }

    pub(crate) fn with_context(
        sink: Option<Rc<dyn OperationSink>>,
        list: CoreList,
        owner: CoreObject,
        path: String,
        ctx: ObserverContext,
    ) -> Self {
        let pinned = !resolve_list(&owner, &path).is_ok_and(|held| held.ptr_eq(&list));
        let inner = Rc::new(CollectionObserverInner {
            list,
            owner,
            path,
            pinned,
            ctx,
            stream: OperationStream::new(sink),
            items: RefCell::new(HashMap::new()),
            listener: Cell::new(None),
            disposed: Cell::new(false),
        });
        let weak: Weak<CollectionObserverInner> = Rc::downgrade(&inner);
        let id = inner.list.changed().subscribe(move |change: &ListChange| {
            if let Some(inner) = weak.upgrade() {
                inner.on_changed(change);
            }
        });
        inner.listener.set(Some(id));
        inner.track_all(&inner.list.to_vec());
        Self(inner)
    }

    pub fn list(&self) -> &CoreList {
        &self.0.list
    }

    /// Number of distinct items with a child observer.
    pub fn observed_items(&self) -> usize {
        self.0.items.borrow().len()
    }
}

impl OperationObserver for CollectionObserver {
    fn subscribe(&self, sink: Rc<dyn OperationSink>) {
        self.0.stream.attach(sink);
    }

    fn dispose(&self) {
        self.0.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }
}

impl Drop for CollectionObserver {
    fn drop(&mut self) {
        self.0.dispose();
    }
}

impl CollectionObserverInner {
    fn on_changed(&self, change: &ListChange) {
        if self.disposed.get() {
            return;
        }
        match change {
            ListChange::Insert { index, items } => {
                self.track_all(items);
                self.publish_insert(items, *index);
            }
            ListChange::Remove { index, items } => {
                self.untrack_all(items);
                self.publish_remove(items, *index);
            }
            ListChange::Move {
                old_index,
                new_index,
                items,
            } => {
                if self.ctx.should_publish(&self.path) {
                    let operation = MoveCollectionRangeOperation::new(
                        self.owner.clone(),
                        self.path.clone(),
                        *old_index,
                        *new_index,
                        items.len(),
                        self.ctx.next_sequence(),
                    );
                    let operation = if self.pinned {
                        operation.with_list(self.list.clone())
                    } else {
                        operation
                    };
                    self.stream.publish(Box::new(operation));
                }
            }
            ListChange::Replace {
                index,
                old_items,
                new_items,
            } => {
                self.untrack_all(old_items);
                self.track_all(new_items);
                self.publish_remove(old_items, *index);
                self.publish_insert(new_items, *index);
            }
            ListChange::Reset => {
                log::warn!(
                    "collection at `{}` was reset; the change cannot be undone",
                    self.path
                );
                self.clear_items();
                self.track_all(&self.list.to_vec());
            }
        }
    }

    fn publish_insert(&self, items: &[Value], index: usize) {
        if items.is_empty() || !self.ctx.should_publish(&self.path) {
            return;
        }
        let operation = InsertCollectionRangeOperation::new(
            self.owner.clone(),
            self.path.clone(),
            items.to_vec(),
            index,
            self.ctx.next_sequence(),
        );
        let operation = if self.pinned {
            operation.with_list(self.list.clone())
        } else {
            operation
        };
        self.stream.publish(Box::new(operation));
    }

    fn publish_remove(&self, items: &[Value], index: usize) {
        if items.is_empty() || !self.ctx.should_publish(&self.path) {
            return;
        }
        let operation = RemoveCollectionRangeOperation::new(
            self.owner.clone(),
            self.path.clone(),
            items.to_vec(),
            index,
            self.ctx.next_sequence(),
        );
        let operation = if self.pinned {
            operation.with_list(self.list.clone())
        } else {
            operation
        };
        self.stream.publish(Box::new(operation));
    }

    fn track_all(&self, items: &[Value]) {
        for item in items {
            self.track(item);
        }
    }

    fn track(&self, item: &Value) {
        let Some(key) = item.identity() else {
            return;
        };
        if let Some(entry) = self.items.borrow_mut().get_mut(&key) {
            entry.refs += 1;
            return;
        }
        let observer = ChildObserver::for_value(
            item,
            &self.owner,
            &self.path,
            self.stream.relay(),
            &self.ctx,
        );
        if let Some(observer) = observer {
            self.items
                .borrow_mut()
                .insert(key, ItemObserver { refs: 1, observer });
        }
    }

    fn untrack_all(&self, items: &[Value]) {
        for item in items {
            self.untrack(item);
        }
    }

    fn untrack(&self, item: &Value) {
        let Some(key) = item.identity() else {
            return;
        };
        let removed = {
            let mut observers = self.items.borrow_mut();
            match observers.get_mut(&key) {
                Some(entry) if entry.refs > 1 => {
                    entry.refs -= 1;
                    None
                }
                Some(_) => observers.remove(&key),
                None => None,
            }
        };
        if let Some(entry) = removed {
            entry.observer.dispose();
        }
    }

    fn clear_items(&self) {
        let observers: Vec<ItemObserver> = self
            .items
            .borrow_mut()
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in &observers {
            entry.observer.dispose();
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some(id) = self.listener.take() {
            self.list.changed().unsubscribe(id);
        }
        self.clear_items();
        self.stream.complete();
    }
}
