use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use strata_core::{CoreObject, HIERARCHICAL_PARENT, ListenerId, NodeItem, PropertyChange, Value};

use super::{
    ChildObserver, EnginePropertyObserver, NodeItemObserver, ObserverContext, OperationObserver,
    OperationSink, OperationStream,
};
use crate::operation::UpdatePropertyValueOperation;
use crate::path::{self, TrackedPaths};
use crate::sequence::OperationSequenceGenerator;

/// Observes the tracked properties of one object.
///
/// Core property changes publish [`UpdatePropertyValueOperation`]s at
/// `base_path.Name`. Nested objects, lists and spline easings get their own
/// child observer, engine properties get an [`EnginePropertyObserver`] and a
/// node item's port gets a [`NodeItemObserver`]. Untracked properties and
/// the hierarchical parent link are never observed.
///
/// The graph below the object must be acyclic apart from parent links.
pub struct CoreObjectObserver(Rc<ObjectObserverInner>);

struct ObjectObserverInner {
    object: CoreObject,
    base_path: String,
    ctx: ObserverContext,
    stream: Rc<OperationStream>,
    children: RefCell<HashMap<&'static str, ChildObserver>>,
    engine: RefCell<Vec<EnginePropertyObserver>>,
    node_item: RefCell<Option<NodeItemObserver>>,
    listener: Cell<Option<ListenerId>>,
    disposed: Cell<bool>,
}

impl CoreObjectObserver {
    /// Starts observing `object`.
    ///
    /// `base_path` prefixes every published path; pass `""` for the tracking
    /// root. With `tracked_paths`, only the listed paths (and the branches
    /// leading to them) are observed.
    pub fn new(
        sink: Option<Rc<dyn OperationSink>>,
        object: CoreObject,
        sequence: OperationSequenceGenerator,
        base_path: impl Into<String>,
        tracked_paths: Option<TrackedPaths>,
    ) -> Self {
        Self::with_context(
            sink,
            object,
            base_path.into(),
            ObserverContext::new(sequence, tracked_paths),
        )
    }

    pub(crate) fn with_context(
        sink: Option<Rc<dyn OperationSink>>,
        object: CoreObject,
        base_path: String,
        ctx: ObserverContext,
    ) -> Self {
        let inner = Rc::new(ObjectObserverInner {
            object,
            base_path,
            ctx,
            stream: OperationStream::new(sink),
            children: RefCell::new(HashMap::new()),
            engine: RefCell::new(Vec::new()),
            node_item: RefCell::new(None),
            listener: Cell::new(None),
            disposed: Cell::new(false),
        });
        inner.attach();
        Self(inner)
    }

    pub fn object(&self) -> &CoreObject {
        &self.0.object
    }

    pub fn base_path(&self) -> &str {
        &self.0.base_path
    }
}

impl OperationObserver for CoreObjectObserver {
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

impl Drop for CoreObjectObserver {
    fn drop(&mut self) {
        self.0.dispose();
    }
}

impl ObjectObserverInner {
    fn attach(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let id = self
            .object
            .property_changed()
            .subscribe(move |change: &PropertyChange| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_property_changed(change);
                }
            });
        self.listener.set(Some(id));

        for prop in self.object.descriptor().properties() {
            if !prop.is_tracked() || prop.is_engine() {
                continue;
            }
            let child_path = path::join(&self.base_path, prop.name());
            if let Ok(value) = self.object.get(prop.name()) {
                self.rewire(prop.name(), &value, &child_path);
            }
        }

        let engine: Vec<EnginePropertyObserver> = self
            .object
            .engine_properties()
            .filter(|property| {
                self.object
                    .descriptor()
                    .find(property.name())
                    .is_some_and(|(_, prop)| prop.is_tracked())
            })
            .filter_map(|property| {
                let property_path = path::join(&self.base_path, property.name());
                self.ctx.is_tracked(&property_path).then(|| {
                    EnginePropertyObserver::with_context(
                        Some(self.stream.relay()),
                        self.object.clone(),
                        property.clone(),
                        property_path,
                        self.ctx.clone(),
                    )
                })
            })
            .collect();
        *self.engine.borrow_mut() = engine;

        if let Some(item) = NodeItem::from_object(self.object.clone()) {
            *self.node_item.borrow_mut() = Some(NodeItemObserver::with_context(
                Some(self.stream.relay()),
                item,
                self.base_path.clone(),
                self.ctx.clone(),
            ));
        }

        log::debug!("observing {:?} at `{}`", self.object, self.base_path);
    }

    fn on_property_changed(&self, change: &PropertyChange) {
        if self.disposed.get() || change.property == HIERARCHICAL_PARENT {
            return;
        }
        let Some((_, prop)) = self.object.descriptor().find(change.property) else {
            return;
        };
        if !prop.is_tracked() {
            return;
        }
        let property_path = path::join(&self.base_path, change.property);
        if !self.ctx.is_tracked(&property_path) {
            return;
        }

        self.rewire(prop.name(), &change.new_value, &property_path);

        if self.ctx.should_publish(&property_path) {
            self.stream.publish(Box::new(UpdatePropertyValueOperation::new(
                self.object.clone(),
                property_path,
                change.new_value.clone(),
                change.old_value.clone(),
                self.ctx.next_sequence(),
            )));
        }
    }

    /// Replaces the child observer of property `name` with one for `value`.
    fn rewire(&self, name: &'static str, value: &Value, property_path: &str) {
        let old = self.children.borrow_mut().remove(name);
        if let Some(old) = old {
            old.dispose();
        }
        let child = ChildObserver::for_value(
            value,
            &self.object,
            property_path,
            self.stream.relay(),
            &self.ctx,
        );
        if let Some(child) = child {
            self.children.borrow_mut().insert(name, child);
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some(id) = self.listener.take() {
            self.object.property_changed().unsubscribe(id);
        }

        let children: Vec<ChildObserver> = self
            .children
            .borrow_mut()
            .drain()
            .map(|(_, child)| child)
            .collect();
        for child in &children {
            child.dispose();
        }
        let engine = std::mem::take(&mut *self.engine.borrow_mut());
        for observer in &engine {
            observer.dispose();
        }
        let node_item = self.node_item.borrow_mut().take();
        if let Some(observer) = &node_item {
            observer.dispose();
        }

        log::debug!("disposed observer of {:?} at `{}`", self.object, self.base_path);
        self.stream.complete();
    }
}
