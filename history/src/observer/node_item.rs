use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use strata_core::{
    KeyFrameAnimation, ListenerId, NodeItem, NodePort, SlotChange, Value, ValueChange,
};

use super::{
    ChildObserver, CoreObjectObserver, ObserverContext, OperationObserver, OperationSink,
    OperationStream, rewire,
};
use crate::operation::UpdateNodeItemOperation;
use crate::path::{self, ANIMATION, NODE_PROPERTY, TrackedPaths};
use crate::sequence::OperationSequenceGenerator;

/// Observes the port of a node item.
///
/// The port value is reported at `path.Property` and its animation at
/// `path.Animation`, both as [`UpdateNodeItemOperation`]s. An item without a
/// port is accepted and observes nothing.
pub struct NodeItemObserver(Rc<NodeObserverInner>);

struct NodeObserverInner {
    item: NodeItem,
    path: String,
    ctx: ObserverContext,
    stream: Rc<OperationStream>,
    value_child: RefCell<Option<ChildObserver>>,
    animation_child: RefCell<Option<CoreObjectObserver>>,
    listeners: Cell<Option<(ListenerId, ListenerId)>>,
    disposed: Cell<bool>,
}

impl NodeItemObserver {
    pub fn new(
        sink: Option<Rc<dyn OperationSink>>,
        item: NodeItem,
        sequence: OperationSequenceGenerator,
        path: impl Into<String>,
        tracked_paths: Option<TrackedPaths>,
    ) -> Self {
        Self::with_context(
            sink,
            item,
            path.into(),
            ObserverContext::new(sequence, tracked_paths),
        )
    }

    pub(crate) fn with_context(
        sink: Option<Rc<dyn OperationSink>>,
        item: NodeItem,
        path: String,
        ctx: ObserverContext,
    ) -> Self {
        let inner = Rc::new(NodeObserverInner {
            item,
            path,
            ctx,
            stream: OperationStream::new(sink),
            value_child: RefCell::new(None),
            animation_child: RefCell::new(None),
            listeners: Cell::new(None),
            disposed: Cell::new(false),
        });
        inner.attach();
        Self(inner)
    }

    pub fn item(&self) -> &NodeItem {
        &self.0.item
    }
}

impl OperationObserver for NodeItemObserver {
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

impl Drop for NodeItemObserver {
    fn drop(&mut self) {
        self.0.dispose();
    }
}

impl NodeObserverInner {
    fn port(&self) -> Option<&NodePort> {
        self.item.port()
    }

    fn value_path(&self) -> String {
        path::join(&self.path, NODE_PROPERTY)
    }

    fn animation_path(&self) -> String {
        path::join(&self.path, ANIMATION)
    }

    fn attach(self: &Rc<Self>) {
        let Some(port) = self.port() else {
            return;
        };
        let weak: Weak<Self> = Rc::downgrade(self);
        let on_value = {
            let weak = weak.clone();
            port.changed().subscribe(move |change: &ValueChange| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_value_changed(change);
                }
            })
        };
        let on_animation = port
            .animation_changed()
            .subscribe(move |change: &SlotChange<KeyFrameAnimation>| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_animation_changed(change);
                }
            });
        self.listeners.set(Some((on_value, on_animation)));

        self.rewire_value(&port.value());
        self.rewire_animation(port.animation());
    }

    fn on_value_changed(&self, change: &ValueChange) {
        if self.disposed.get() {
            return;
        }
        self.rewire_value(&change.new_value);
        let value_path = self.value_path();
        if self.ctx.should_publish(&value_path) {
            self.stream.publish(Box::new(UpdateNodeItemOperation::new(
                self.item.clone(),
                value_path,
                change.new_value.clone(),
                change.old_value.clone(),
                self.ctx.next_sequence(),
            )));
        }
    }

    fn on_animation_changed(&self, change: &SlotChange<KeyFrameAnimation>) {
        if self.disposed.get() {
            return;
        }
        self.rewire_animation(change.new.clone());
        let animation_path = self.animation_path();
        if self.ctx.should_publish(&animation_path) {
            self.stream.publish(Box::new(UpdateNodeItemOperation::new(
                self.item.clone(),
                animation_path,
                Value::from(change.new.clone()),
                Value::from(change.old.clone()),
                self.ctx.next_sequence(),
            )));
        }
    }

    fn rewire_value(&self, value: &Value) {
        rewire(
            &self.value_child,
            value,
            self.item.as_object(),
            &self.value_path(),
            self.stream.relay(),
            &self.ctx,
        );
    }

    fn rewire_animation(&self, animation: Option<KeyFrameAnimation>) {
        let old = self.animation_child.borrow_mut().take();
        if let Some(old) = old {
            old.dispose();
        }
        let animation_path = self.animation_path();
        if let Some(animation) = animation
            && self.ctx.is_tracked(&animation_path)
        {
            let observer = CoreObjectObserver::with_context(
                Some(self.stream.relay()),
                animation.into_object(),
                animation_path,
                self.ctx.clone(),
            );
            *self.animation_child.borrow_mut() = Some(observer);
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some((on_value, on_animation)) = self.listeners.take()
            && let Some(port) = self.port()
        {
            port.changed().unsubscribe(on_value);
            port.animation_changed().unsubscribe(on_animation);
        }
        let value_child = self.value_child.borrow_mut().take();
        if let Some(child) = &value_child {
            child.dispose();
        }
        let animation_child = self.animation_child.borrow_mut().take();
        if let Some(child) = &animation_child {
            child.dispose();
        }
        self.stream.complete();
    }
}
