//! Node graph items.
//!
//! A [`NodeItem`] is a [`CoreObject`] that may expose a single [`NodePort`].
//! The port carries a value and, when animatable, an optional animation.
//! Items without a port are legal; they simply have nothing to observe.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::animation::KeyFrameAnimation;
use crate::descriptor::TypeDescriptor;
use crate::engine::{SlotChange, ValueChange};
use crate::event::ListenerSet;
use crate::object::{self, CoreObject, WeakObject};
use crate::value::{Value, ValueKind};

static NODE_ITEM: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::builder("NodeItem")
        .property("Name", ValueKind::Str, || Value::from(""))
        .build()
});

struct PortInner {
    name: String,
    animatable: bool,
    value: RefCell<Value>,
    animation: RefCell<Option<KeyFrameAnimation>>,
    owner: RefCell<Option<WeakObject>>,
    changed: ListenerSet<ValueChange>,
    animation_changed: ListenerSet<SlotChange<KeyFrameAnimation>>,
}

/// Shared handle to a node port.
#[derive(Clone)]
pub struct NodePort(Rc<PortInner>);

impl NodePort {
    /// Creates a port without an animation slot.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::build(name.into(), value.into(), false)
    }

    /// Creates a port whose value may be driven by an animation.
    pub fn animatable(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::build(name.into(), value.into(), true)
    }

    fn build(name: String, value: Value, animatable: bool) -> Self {
        Self(Rc::new(PortInner {
            name,
            animatable,
            value: RefCell::new(value),
            animation: RefCell::new(None),
            owner: RefCell::new(None),
            changed: ListenerSet::new(),
            animation_changed: ListenerSet::new(),
        }))
    }

    pub(crate) fn attach(&self, owner: WeakObject) {
        object::adopt(&owner, &self.value());
        *self.0.owner.borrow_mut() = Some(owner);
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_animatable(&self) -> bool {
        self.0.animatable
    }

    pub fn value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Replaces the port value. Equal values fire nothing.
    pub fn set_value(&self, value: impl Into<Value>) {
        let value = value.into();
        if *self.0.value.borrow() == value {
            return;
        }
        let old_value = self.0.value.replace(value.clone());
        self.reparent(&old_value, &value);
        self.0.changed.emit(&ValueChange {
            old_value,
            new_value: value,
        });
    }

    pub fn animation(&self) -> Option<KeyFrameAnimation> {
        self.0.animation.borrow().clone()
    }

    /// Replaces the animation. Returns `false` if the port is not animatable.
    pub fn set_animation(&self, animation: Option<KeyFrameAnimation>) -> bool {
        if !self.0.animatable {
            return false;
        }
        if *self.0.animation.borrow() == animation {
            return true;
        }
        let old = self.0.animation.replace(animation.clone());
        self.reparent(&Value::from(old.clone()), &Value::from(animation.clone()));
        self.0.animation_changed.emit(&SlotChange {
            old,
            new: animation,
        });
        true
    }

    pub fn changed(&self) -> &ListenerSet<ValueChange> {
        &self.0.changed
    }

    pub fn animation_changed(&self) -> &ListenerSet<SlotChange<KeyFrameAnimation>> {
        &self.0.animation_changed
    }

    fn reparent(&self, old: &Value, new: &Value) {
        let owner = self.0.owner.borrow().clone();
        if let Some(owner) = owner {
            object::release(&owner, old);
            object::adopt(&owner, new);
        }
    }
}

impl fmt::Debug for NodePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePort")
            .field("name", &self.0.name)
            .field("value", &*self.0.value.borrow())
            .field("animatable", &self.0.animatable)
            .finish()
    }
}

/// A node graph item: an object with an optional port.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeItem(CoreObject);

impl NodeItem {
    pub fn new(port: Option<NodePort>) -> Self {
        Self(CoreObject::new_node_item(&NODE_ITEM, port))
    }

    /// Creates a node item with a custom descriptor.
    pub fn with_descriptor(descriptor: &'static TypeDescriptor, port: Option<NodePort>) -> Self {
        Self(CoreObject::new_node_item(descriptor, port))
    }

    /// Wraps an object that was created as a node item.
    pub fn from_object(object: CoreObject) -> Option<Self> {
        object.is_node_item().then_some(Self(object))
    }

    pub fn as_object(&self) -> &CoreObject {
        &self.0
    }

    pub fn into_object(self) -> CoreObject {
        self.0
    }

    pub fn port(&self) -> Option<&NodePort> {
        self.0.node_port()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn port_value_notifies_once() {
        let port = NodePort::new("Radius", 1.0);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        port.changed().subscribe(move |_| h.set(h.get() + 1));

        port.set_value(2.0);
        port.set_value(2.0);
        assert_eq!(hits.get(), 1);
        assert_eq!(port.value(), Value::Float(2.0));
    }

    #[test]
    fn non_animatable_port_rejects_animation() {
        let port = NodePort::new("Radius", 1.0);
        assert!(!port.set_animation(Some(KeyFrameAnimation::new())));
        let port = NodePort::animatable("Radius", 1.0);
        assert!(port.set_animation(Some(KeyFrameAnimation::new())));
    }

    #[test]
    fn node_item_exposes_port() {
        let item = NodeItem::new(Some(NodePort::new("Size", 4)));
        assert_eq!(item.port().map(NodePort::name), Some("Size"));
        assert!(item.as_object().is_node_item());

        let bare = NodeItem::new(None);
        assert!(bare.port().is_none());
        assert!(NodeItem::from_object(bare.into_object()).is_some());
    }

    #[test]
    fn port_animation_is_parented_to_item() {
        let port = NodePort::animatable("Size", 4);
        let item = NodeItem::new(Some(port.clone()));
        let animation = KeyFrameAnimation::new();
        port.set_animation(Some(animation.clone()));
        assert_eq!(animation.as_object().parent(), Some(item.as_object().clone()));
    }
}
