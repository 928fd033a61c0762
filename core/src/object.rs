//! Tracked objects.
//!
//! A [`CoreObject`] is a reference-counted instance of a [`TypeDescriptor`].
//! Core property writes fire [`PropertyChange`] on the object's
//! [`property_changed`](CoreObject::property_changed) listeners; engine
//! property writes fire on the [`EngineProperty`] itself.
//!
//! Storing an object (or a list of objects) into a property makes the
//! holder its hierarchical parent. Parent changes are reported through the
//! regular property-change channel under the reserved
//! [`HIERARCHICAL_PARENT`] name.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::descriptor::{PropertyDescriptor, PropertyKind, TypeDescriptor};
use crate::engine::EngineProperty;
use crate::error::{ModelError, ModelResult};
use crate::event::ListenerSet;
use crate::id::ObjectId;
use crate::node::NodePort;
use crate::value::{FromValue, Value, ValueKind};

/// Reserved property name carried by parent-change notifications.
pub const HIERARCHICAL_PARENT: &str = "HierarchicalParent";

/// Notification fired when a core property (or the parent link) changes.
#[derive(Debug, Clone)]
pub struct PropertyChange {
    pub property: &'static str,
    pub old_value: Value,
    pub new_value: Value,
}

pub(crate) type WeakObject = Weak<ObjectInner>;

enum Slot {
    Core(RefCell<Value>),
    Engine(EngineProperty),
}

enum Role {
    Plain,
    NodeItem(Option<NodePort>),
}

pub(crate) struct ObjectInner {
    id: ObjectId,
    descriptor: &'static TypeDescriptor,
    slots: Vec<Slot>,
    role: Role,
    parent: RefCell<WeakObject>,
    property_changed: ListenerSet<PropertyChange>,
}

/// Shared handle to a tracked object. Clones refer to the same object.
#[derive(Clone)]
pub struct CoreObject(Rc<ObjectInner>);

impl CoreObject {
    /// Creates an object with every property set to its default.
    pub fn new(descriptor: &'static TypeDescriptor) -> Self {
        Self::build(descriptor, Role::Plain)
    }

    pub(crate) fn new_node_item(descriptor: &'static TypeDescriptor, port: Option<NodePort>) -> Self {
        Self::build(descriptor, Role::NodeItem(port))
    }

    fn build(descriptor: &'static TypeDescriptor, role: Role) -> Self {
        let inner = Rc::new_cyclic(|weak: &WeakObject| {
            let slots = descriptor
                .properties()
                .iter()
                .map(|prop| {
                    let value = prop.default_value();
                    adopt(weak, &value);
                    match prop.kind() {
                        PropertyKind::Core => Slot::Core(RefCell::new(value)),
                        PropertyKind::Engine { animatable } => Slot::Engine(EngineProperty::new(
                            prop.name(),
                            prop.value_kind(),
                            animatable,
                            value,
                            weak.clone(),
                        )),
                    }
                })
                .collect();
            if let Role::NodeItem(Some(port)) = &role {
                port.attach(weak.clone());
            }
            ObjectInner {
                id: ObjectId::new(),
                descriptor,
                slots,
                role,
                parent: RefCell::new(Weak::new()),
                property_changed: ListenerSet::new(),
            }
        });
        Self(inner)
    }

    pub(crate) fn from_inner(inner: Rc<ObjectInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> WeakObject {
        Rc::downgrade(&self.0)
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        self.0.descriptor
    }

    pub fn type_name(&self) -> &'static str {
        self.0.descriptor.name()
    }

    /// Address of the shared state, usable as an identity key.
    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }

    pub fn ptr_eq(&self, other: &CoreObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns `true` if `name` is a declared property of this object.
    pub fn has_property(&self, name: &str) -> bool {
        self.0.descriptor.find(name).is_some()
    }

    /// Reads a property. Engine properties yield their current value.
    pub fn get(&self, name: &str) -> ModelResult<Value> {
        let (index, _) = self.lookup(name)?;
        Ok(match &self.0.slots[index] {
            Slot::Core(cell) => cell.borrow().clone(),
            Slot::Engine(property) => property.current_value(),
        })
    }

    /// Reads a property and converts it, returning `None` on any mismatch.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get(name).ok().and_then(|value| T::from_value(&value))
    }

    /// Writes a property.
    ///
    /// Writing a value equal to the current one is a no-op and fires
    /// nothing. Engine properties are forwarded to
    /// [`EngineProperty::set_value`].
    pub fn set(&self, name: &str, value: impl Into<Value>) -> ModelResult {
        let value = value.into();
        let (index, prop) = self.lookup(name)?;
        check_kind(prop.name(), prop.value_kind(), &value)?;
        match &self.0.slots[index] {
            Slot::Core(cell) => {
                if *cell.borrow() == value {
                    return Ok(());
                }
                let old_value = cell.replace(value.clone());
                let owner = self.downgrade();
                release(&owner, &old_value);
                adopt(&owner, &value);
                self.0.property_changed.emit(&PropertyChange {
                    property: prop.name(),
                    old_value,
                    new_value: value,
                });
                Ok(())
            }
            Slot::Engine(property) => property.set_value(value),
        }
    }

    /// Listeners for core property and parent changes.
    pub fn property_changed(&self) -> &ListenerSet<PropertyChange> {
        &self.0.property_changed
    }

    /// Returns the engine property with this name, if any.
    pub fn engine_property(&self, name: &str) -> Option<&EngineProperty> {
        let (index, _) = self.0.descriptor.find(name)?;
        match &self.0.slots[index] {
            Slot::Engine(property) => Some(property),
            Slot::Core(_) => None,
        }
    }

    /// Iterates over the engine properties in declaration order.
    pub fn engine_properties(&self) -> impl Iterator<Item = &EngineProperty> {
        self.0.slots.iter().filter_map(|slot| match slot {
            Slot::Engine(property) => Some(property),
            Slot::Core(_) => None,
        })
    }

    pub fn parent(&self) -> Option<CoreObject> {
        self.0.parent.borrow().upgrade().map(CoreObject)
    }

    /// Returns `true` if this object was created as a node item.
    pub fn is_node_item(&self) -> bool {
        matches!(self.0.role, Role::NodeItem(_))
    }

    /// The node port of a node item, if it has one.
    pub fn node_port(&self) -> Option<&NodePort> {
        match &self.0.role {
            Role::NodeItem(port) => port.as_ref(),
            Role::Plain => None,
        }
    }

    /// Values directly held by this object: core property values, engine
    /// property values and animations, and the node port's value and
    /// animation.
    pub fn contained_values(&self) -> Vec<Value> {
        let mut values = Vec::with_capacity(self.0.slots.len());
        for slot in &self.0.slots {
            match slot {
                Slot::Core(cell) => values.push(cell.borrow().clone()),
                Slot::Engine(property) => {
                    values.push(property.current_value());
                    if let Some(animation) = property.animation() {
                        values.push(animation.into());
                    }
                }
            }
        }
        if let Some(port) = self.node_port() {
            values.push(port.value());
            if let Some(animation) = port.animation() {
                values.push(animation.into());
            }
        }
        values
    }

    /// Depth-first search for a reachable object by id, including `self`.
    ///
    /// Follows property values, list items, engine property values and
    /// animations, and node port values. Shared subgraphs and cycles are
    /// visited once.
    pub fn find(&self, id: ObjectId) -> Option<CoreObject> {
        let mut visited = HashSet::new();
        let mut stack = vec![Value::Object(self.clone())];
        while let Some(value) = stack.pop() {
            match value {
                Value::Object(object) => {
                    if !visited.insert(object.as_ptr()) {
                        continue;
                    }
                    if object.id() == id {
                        return Some(object);
                    }
                    stack.extend(object.contained_values());
                }
                Value::List(list) => {
                    if visited.insert(list.as_ptr()) {
                        stack.extend(list.to_vec());
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn lookup(&self, name: &str) -> ModelResult<(usize, &'static PropertyDescriptor)> {
        self.0
            .descriptor
            .find(name)
            .ok_or_else(|| ModelError::UnknownProperty {
                type_name: self.type_name(),
                property: name.to_owned(),
            })
    }

    pub(crate) fn set_parent(&self, parent: WeakObject) {
        let old = self.0.parent.replace(parent);
        let old_value = Value::from(old.upgrade().map(CoreObject));
        let new_value = Value::from(self.parent());
        if old_value != new_value {
            self.0.property_changed.emit(&PropertyChange {
                property: HIERARCHICAL_PARENT,
                old_value,
                new_value,
            });
        }
    }

    fn parent_is(&self, owner: &WeakObject) -> bool {
        Weak::ptr_eq(&self.0.parent.borrow(), owner)
    }
}

impl PartialEq for CoreObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for CoreObject {}

impl Hash for CoreObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for CoreObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.id())
    }
}

pub(crate) fn check_kind(property: &str, expected: ValueKind, value: &Value) -> ModelResult {
    match value.kind() {
        Some(actual) if !value.conforms_to(expected) => Err(ModelError::TypeMismatch {
            property: property.to_owned(),
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Makes `owner` the parent of an object value, or the owner of a list.
pub(crate) fn adopt(owner: &WeakObject, value: &Value) {
    match value {
        Value::Object(child) => child.set_parent(owner.clone()),
        Value::List(list) => list.attach_owner(owner.clone()),
        _ => {}
    }
}

/// Undoes [`adopt`] if `owner` is still the parent of `value`.
pub(crate) fn release(owner: &WeakObject, value: &Value) {
    match value {
        Value::Object(child) if child.parent_is(owner) => child.set_parent(Weak::new()),
        Value::List(list) => list.detach_owner(owner),
        _ => {}
    }
}
