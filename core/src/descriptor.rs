//! Static type descriptions.
//!
//! A [`TypeDescriptor`] lists the properties an object type exposes, in
//! declaration order. Descriptors are built once and referenced as
//! `&'static`, typically through a `LazyLock`:
//!
//! ```ignore
//! static SHAPE: LazyLock<TypeDescriptor> = LazyLock::new(|| {
//!     TypeDescriptor::builder("Shape")
//!         .property("Name", ValueKind::Str, || Value::from(""))
//!         .animatable_property("Opacity", ValueKind::Float, || Value::Float(1.0))
//!         .build()
//! });
//!
//! let shape = CoreObject::new(&SHAPE);
//! ```

use std::fmt;

use crate::value::{Value, ValueKind};

/// How a property stores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// A plain value slot.
    Core,
    /// An [`EngineProperty`](crate::EngineProperty). Animatable engine
    /// properties also carry animation and expression slots.
    Engine { animatable: bool },
}

/// One declared property of a type.
pub struct PropertyDescriptor {
    name: &'static str,
    kind: PropertyKind,
    value_kind: ValueKind,
    default: fn() -> Value,
    tracked: bool,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    /// Produces a fresh default value for a new object.
    pub fn default_value(&self) -> Value {
        (self.default)()
    }

    /// Whether changes to this property should be recorded.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    pub fn is_engine(&self) -> bool {
        matches!(self.kind, PropertyKind::Engine { .. })
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value_kind", &self.value_kind)
            .field("tracked", &self.tracked)
            .finish()
    }
}

/// Describes an object type and its properties.
#[derive(Debug)]
pub struct TypeDescriptor {
    name: &'static str,
    properties: Vec<PropertyDescriptor>,
}

impl TypeDescriptor {
    pub fn builder(name: &'static str) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            name,
            properties: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Looks a property up by name, returning its slot index.
    pub fn find(&self, name: &str) -> Option<(usize, &PropertyDescriptor)> {
        self.properties
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }
}

/// Builder for [`TypeDescriptor`].
pub struct TypeDescriptorBuilder {
    name: &'static str,
    properties: Vec<PropertyDescriptor>,
}

impl TypeDescriptorBuilder {
    /// Adds a tracked core property.
    pub fn property(self, name: &'static str, value_kind: ValueKind, default: fn() -> Value) -> Self {
        self.push(name, PropertyKind::Core, value_kind, default, true)
    }

    /// Adds a core property whose changes are never recorded.
    pub fn untracked_property(
        self,
        name: &'static str,
        value_kind: ValueKind,
        default: fn() -> Value,
    ) -> Self {
        self.push(name, PropertyKind::Core, value_kind, default, false)
    }

    /// Adds a non-animatable engine property.
    pub fn engine_property(
        self,
        name: &'static str,
        value_kind: ValueKind,
        default: fn() -> Value,
    ) -> Self {
        self.push(
            name,
            PropertyKind::Engine { animatable: false },
            value_kind,
            default,
            true,
        )
    }

    /// Adds an engine property with animation and expression slots.
    pub fn animatable_property(
        self,
        name: &'static str,
        value_kind: ValueKind,
        default: fn() -> Value,
    ) -> Self {
        self.push(
            name,
            PropertyKind::Engine { animatable: true },
            value_kind,
            default,
            true,
        )
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            name: self.name,
            properties: self.properties,
        }
    }

    fn push(
        mut self,
        name: &'static str,
        kind: PropertyKind,
        value_kind: ValueKind,
        default: fn() -> Value,
        tracked: bool,
    ) -> Self {
        assert!(
            !self.properties.iter().any(|p| p.name == name),
            "duplicate property `{name}` on {}",
            self.name
        );
        self.properties.push(PropertyDescriptor {
            name,
            kind,
            value_kind,
            default,
            tracked,
        });
        self
    }
}
