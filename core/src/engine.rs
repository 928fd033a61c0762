//! Engine properties.
//!
//! An [`EngineProperty`] is a value slot owned by a [`CoreObject`]. Animatable
//! engine properties additionally carry an optional [`KeyFrameAnimation`]
//! and an optional [`Expression`]; the three slots fire on separate
//! listener sets.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::animation::KeyFrameAnimation;
use crate::error::ModelResult;
use crate::event::ListenerSet;
use crate::expression::Expression;
use crate::object::{self, CoreObject, WeakObject};
use crate::value::{Value, ValueKind};

/// Notification fired when a value slot changes.
#[derive(Debug, Clone)]
pub struct ValueChange {
    pub old_value: Value,
    pub new_value: Value,
}

/// Notification fired when an optional slot (animation, expression) changes.
#[derive(Debug, Clone)]
pub struct SlotChange<T> {
    pub old: Option<T>,
    pub new: Option<T>,
}

struct EngineInner {
    name: &'static str,
    value_kind: ValueKind,
    animatable: bool,
    owner: WeakObject,
    value: RefCell<Value>,
    animation: RefCell<Option<KeyFrameAnimation>>,
    expression: RefCell<Option<Expression>>,
    value_changed: ListenerSet<ValueChange>,
    animation_changed: ListenerSet<SlotChange<KeyFrameAnimation>>,
    expression_changed: ListenerSet<SlotChange<Expression>>,
}

/// Shared handle to an engine property slot.
#[derive(Clone)]
pub struct EngineProperty(Rc<EngineInner>);

impl EngineProperty {
    pub(crate) fn new(
        name: &'static str,
        value_kind: ValueKind,
        animatable: bool,
        value: Value,
        owner: WeakObject,
    ) -> Self {
        Self(Rc::new(EngineInner {
            name,
            value_kind,
            animatable,
            owner,
            value: RefCell::new(value),
            animation: RefCell::new(None),
            expression: RefCell::new(None),
            value_changed: ListenerSet::new(),
            animation_changed: ListenerSet::new(),
            expression_changed: ListenerSet::new(),
        }))
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn value_kind(&self) -> ValueKind {
        self.0.value_kind
    }

    /// Whether this property has animation and expression slots.
    pub fn is_animatable(&self) -> bool {
        self.0.animatable
    }

    /// The object that declares this property.
    pub fn owner(&self) -> Option<CoreObject> {
        self.0.owner.upgrade().map(CoreObject::from_inner)
    }

    pub fn current_value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Replaces the current value. Equal values fire nothing.
    pub fn set_value(&self, value: impl Into<Value>) -> ModelResult {
        let value = value.into();
        object::check_kind(self.0.name, self.0.value_kind, &value)?;
        if *self.0.value.borrow() == value {
            return Ok(());
        }
        let old_value = self.0.value.replace(value.clone());
        object::release(&self.0.owner, &old_value);
        object::adopt(&self.0.owner, &value);
        self.0.value_changed.emit(&ValueChange {
            old_value,
            new_value: value,
        });
        Ok(())
    }

    pub fn animation(&self) -> Option<KeyFrameAnimation> {
        self.0.animation.borrow().clone()
    }

    /// Replaces the animation slot.
    ///
    /// Returns `false` without changing anything if the property is not
    /// animatable.
    pub fn set_animation(&self, animation: Option<KeyFrameAnimation>) -> bool {
        if !self.0.animatable {
            return false;
        }
        if *self.0.animation.borrow() == animation {
            return true;
        }
        let old = self.0.animation.replace(animation.clone());
        object::release(&self.0.owner, &Value::from(old.clone()));
        object::adopt(&self.0.owner, &Value::from(animation.clone()));
        self.0.animation_changed.emit(&SlotChange {
            old,
            new: animation,
        });
        true
    }

    pub fn expression(&self) -> Option<Expression> {
        self.0.expression.borrow().clone()
    }

    /// Replaces the expression slot.
    ///
    /// Returns `false` without changing anything if the property is not
    /// animatable.
    pub fn set_expression(&self, expression: Option<Expression>) -> bool {
        if !self.0.animatable {
            return false;
        }
        if *self.0.expression.borrow() == expression {
            return true;
        }
        let old = self.0.expression.replace(expression.clone());
        self.0.expression_changed.emit(&SlotChange {
            old,
            new: expression,
        });
        true
    }

    /// Evaluates the property at `time`: the animation if present,
    /// otherwise the current value.
    pub fn value_at(&self, time: f64) -> Value {
        match self.animation() {
            Some(animation) if !animation.key_frames().is_empty() => animation.interpolate(time),
            _ => self.current_value(),
        }
    }

    pub fn value_changed(&self) -> &ListenerSet<ValueChange> {
        &self.0.value_changed
    }

    pub fn animation_changed(&self) -> &ListenerSet<SlotChange<KeyFrameAnimation>> {
        &self.0.animation_changed
    }

    pub fn expression_changed(&self) -> &ListenerSet<SlotChange<Expression>> {
        &self.0.expression_changed
    }

    pub fn ptr_eq(&self, other: &EngineProperty) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EngineProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineProperty")
            .field("name", &self.0.name)
            .field("value", &*self.0.value.borrow())
            .field("animatable", &self.0.animatable)
            .field("has_animation", &self.0.animation.borrow().is_some())
            .field("has_expression", &self.0.expression.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::LazyLock;

    use super::*;
    use crate::animation::KeyFrame;
    use crate::descriptor::TypeDescriptor;
    use crate::easing::Easing;

    static LAYER: LazyLock<TypeDescriptor> = LazyLock::new(|| {
        TypeDescriptor::builder("Layer")
            .animatable_property("Opacity", ValueKind::Float, || Value::Float(1.0))
            .engine_property("ZIndex", ValueKind::Int, || Value::Int(0))
            .build()
    });

    #[test]
    fn set_value_fires_and_skips_equal() {
        let layer = CoreObject::new(&LAYER);
        let opacity = layer.engine_property("Opacity").unwrap().clone();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        opacity
            .value_changed()
            .subscribe(move |c: &ValueChange| sink.borrow_mut().push(c.clone()));

        opacity.set_value(0.25).unwrap();
        opacity.set_value(0.25).unwrap();

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].old_value, Value::Float(1.0));
        assert_eq!(log[0].new_value, Value::Float(0.25));
        assert!(opacity.set_value("x").is_err());
    }

    #[test]
    fn non_animatable_rejects_aux_slots() {
        let layer = CoreObject::new(&LAYER);
        let z = layer.engine_property("ZIndex").unwrap();
        assert!(!z.set_animation(Some(KeyFrameAnimation::new())));
        assert!(!z.set_expression(Some(Expression::new("1 + 1"))));
        assert!(z.animation().is_none());
        assert!(z.expression().is_none());
    }

    #[test]
    fn animation_slot_notifies_and_adopts() {
        let layer = CoreObject::new(&LAYER);
        let opacity = layer.engine_property("Opacity").unwrap();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        opacity.animation_changed().subscribe(move |_| h.set(h.get() + 1));

        let animation = KeyFrameAnimation::new();
        assert!(opacity.set_animation(Some(animation.clone())));
        assert!(opacity.set_animation(Some(animation.clone())));
        assert_eq!(hits.get(), 1);
        assert_eq!(animation.as_object().parent(), Some(layer.clone()));

        assert!(opacity.set_animation(None));
        assert_eq!(hits.get(), 2);
        assert_eq!(animation.as_object().parent(), None);
    }

    #[test]
    fn value_at_prefers_animation() {
        let layer = CoreObject::new(&LAYER);
        let opacity = layer.engine_property("Opacity").unwrap();
        assert_eq!(opacity.value_at(3.0), Value::Float(1.0));

        let animation = KeyFrameAnimation::new();
        animation.add_key_frame(KeyFrame::new(0.0, 0.0, Easing::Linear));
        animation.add_key_frame(KeyFrame::new(2.0, 1.0, Easing::Linear));
        opacity.set_animation(Some(animation));

        assert_eq!(opacity.value_at(1.0), Value::Float(0.5));
    }

    #[test]
    fn owner_is_declaring_object() {
        let layer = CoreObject::new(&LAYER);
        let opacity = layer.engine_property("Opacity").unwrap();
        assert_eq!(opacity.owner(), Some(layer.clone()));
    }
}
