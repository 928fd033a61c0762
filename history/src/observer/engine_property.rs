use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use strata_core::{
    CoreObject, EngineProperty, Expression, KeyFrameAnimation, ListenerId, SlotChange, Value,
    ValueChange,
};

use super::{
    ChildObserver, CoreObjectObserver, ObserverContext, OperationObserver, OperationSink,
    OperationStream, rewire,
};
use crate::operation::UpdatePropertyValueOperation;
use crate::path::{self, ANIMATION, EXPRESSION, TrackedPaths};
use crate::sequence::OperationSequenceGenerator;

/// Observes an engine property's value, animation and expression slots.
///
/// Publishes [`UpdatePropertyValueOperation`]s at `path`,
/// `path.Animation` and `path.Expression`. The key frames of the current
/// animation are observed below `path.Animation`.
pub struct EnginePropertyObserver(Rc<EngineObserverInner>);

struct EngineObserverInner {
    owner: CoreObject,
    property: EngineProperty,
    path: String,
    ctx: ObserverContext,
    stream: Rc<OperationStream>,
    value_child: RefCell<Option<ChildObserver>>,
    animation_child: RefCell<Option<CoreObjectObserver>>,
    listeners: Cell<Option<[ListenerId; 3]>>,
    disposed: Cell<bool>,
}

impl EnginePropertyObserver {
    pub fn new(
        sink: Option<Rc<dyn OperationSink>>,
        owner: CoreObject,
        property: EngineProperty,
        sequence: OperationSequenceGenerator,
        path: impl Into<String>,
        tracked_paths: Option<TrackedPaths>,
    ) -> Self {
        Self::with_context(
            sink,
            owner,
            property,
            path.into(),
            ObserverContext::new(sequence, tracked_paths),
        )
    }

    pub(crate) fn with_context(
        sink: Option<Rc<dyn OperationSink>>,
        owner: CoreObject,
        property: EngineProperty,
        path: String,
        ctx: ObserverContext,
    ) -> Self {
        let inner = Rc::new(EngineObserverInner {
            owner,
            property,
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

    pub fn property(&self) -> &EngineProperty {
        &self.0.property
    }

    pub fn path(&self) -> &str {
        &self.0.path
    }
}

impl OperationObserver for EnginePropertyObserver {
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

impl Drop for EnginePropertyObserver {
    fn drop(&mut self) {
        self.0.dispose();
    }
}

impl EngineObserverInner {
    fn attach(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let on_value = {
            let weak = weak.clone();
            self.property
                .value_changed()
                .subscribe(move |change: &ValueChange| {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_value_changed(change);
                    }
                })
        };
        let on_animation = {
            let weak = weak.clone();
            self.property.animation_changed().subscribe(
                move |change: &SlotChange<KeyFrameAnimation>| {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_animation_changed(change);
                    }
                },
            )
        };
        let on_expression = self.property.expression_changed().subscribe(
            move |change: &SlotChange<Expression>| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_expression_changed(change);
                }
            },
        );
        self.listeners.set(Some([on_value, on_animation, on_expression]));

        self.rewire_value(&self.property.current_value());
        self.rewire_animation(self.property.animation());
    }

    fn on_value_changed(&self, change: &ValueChange) {
        if self.disposed.get() {
            return;
        }
        self.rewire_value(&change.new_value);
        if self.ctx.should_publish(&self.path) {
            self.stream.publish(Box::new(UpdatePropertyValueOperation::new(
                self.owner.clone(),
                self.path.clone(),
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
        let animation_path = path::join(&self.path, ANIMATION);
        if self.ctx.should_publish(&animation_path) {
            self.stream.publish(Box::new(UpdatePropertyValueOperation::new(
                self.owner.clone(),
                animation_path,
                Value::from(change.new.clone()),
                Value::from(change.old.clone()),
                self.ctx.next_sequence(),
            )));
        }
    }

    fn on_expression_changed(&self, change: &SlotChange<Expression>) {
        if self.disposed.get() {
            return;
        }
        let expression_path = path::join(&self.path, EXPRESSION);
        if self.ctx.should_publish(&expression_path) {
            self.stream.publish(Box::new(UpdatePropertyValueOperation::new(
                self.owner.clone(),
                expression_path,
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
            &self.owner,
            &self.path,
            self.stream.relay(),
            &self.ctx,
        );
    }

    fn rewire_animation(&self, animation: Option<KeyFrameAnimation>) {
        let old = self.animation_child.borrow_mut().take();
        if let Some(old) = old {
            old.dispose();
        }
        let animation_path = path::join(&self.path, ANIMATION);
        let Some(animation) = animation else {
            return;
        };
        if !self.ctx.is_tracked(&animation_path) {
            return;
        }
        let observer = CoreObjectObserver::with_context(
            Some(self.stream.relay()),
            animation.into_object(),
            animation_path,
            self.ctx.clone(),
        );
        *self.animation_child.borrow_mut() = Some(observer);
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some([on_value, on_animation, on_expression]) = self.listeners.take() {
            self.property.value_changed().unsubscribe(on_value);
            self.property.animation_changed().unsubscribe(on_animation);
            self.property.expression_changed().unsubscribe(on_expression);
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

#[cfg(test)]
mod tests {
    use strata_core::{CoreList, Easing, KeyFrame};

    use super::*;
    use crate::observer::testing::RecordingSink;
    use crate::operation::fixtures::SHAPE;
    use crate::suppression::PublishingSuppression;

    fn observe(shape: &CoreObject, name: &str, sink: &Rc<RecordingSink>) -> EnginePropertyObserver {
        EnginePropertyObserver::new(
            Some(sink.clone()),
            shape.clone(),
            shape.engine_property(name).unwrap().clone(),
            OperationSequenceGenerator::new(),
            name,
            None,
        )
    }

    #[test]
    fn value_animation_and_expression_paths() {
        let shape = CoreObject::new(&SHAPE);
        let sink = RecordingSink::new();
        let _observer = observe(&shape, "Opacity", &sink);
        let property = shape.engine_property("Opacity").unwrap();

        property.set_value(0.25).unwrap();
        property.set_animation(Some(KeyFrameAnimation::new()));
        property.set_expression(Some(Expression::new("time * 2")));

        assert_eq!(
            sink.paths(),
            vec!["Opacity", "Opacity.Animation", "Opacity.Expression"]
        );
        let ops = sink.take();
        let expression = ops[2]
            .downcast_ref::<UpdatePropertyValueOperation>()
            .unwrap();
        assert!(expression.old_value().is_null());
        assert!(expression.new_value().as_expression().is_some());
    }

    #[test]
    fn key_frames_are_observed_under_animation() {
        let shape = CoreObject::new(&SHAPE);
        let sink = RecordingSink::new();
        let _observer = observe(&shape, "Opacity", &sink);
        let property = shape.engine_property("Opacity").unwrap();
        let animation = KeyFrameAnimation::new();
        property.set_animation(Some(animation.clone()));
        sink.take();

        let key_frame = KeyFrame::new(0.0, 0.5, Easing::Linear);
        animation.add_key_frame(key_frame.clone());
        key_frame.set_key_time(1.0);

        assert_eq!(
            sink.paths(),
            vec![
                "Opacity.Animation.KeyFrames",
                "Opacity.Animation.KeyFrames.KeyTime"
            ]
        );
    }

    #[test]
    fn replaced_animation_is_released() {
        let shape = CoreObject::new(&SHAPE);
        let sink = RecordingSink::new();
        let _observer = observe(&shape, "Opacity", &sink);
        let property = shape.engine_property("Opacity").unwrap();
        let first = KeyFrameAnimation::new();
        property.set_animation(Some(first.clone()));
        property.set_animation(None);
        sink.take();

        first.add_key_frame(KeyFrame::new(0.0, 1.0, Easing::Linear));
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn list_values_get_collection_child() {
        let shape = CoreObject::new(&SHAPE);
        let sink = RecordingSink::new();
        let _observer = observe(&shape, "Points", &sink);

        let points = shape.get_as::<CoreList>("Points").unwrap();
        points.push(1);
        let replacement = CoreList::from_values([Value::Int(5)]);
        shape.set("Points", replacement.clone()).unwrap();
        points.push(2);
        replacement.push(6);

        assert_eq!(sink.paths(), vec!["Points", "Points", "Points"]);
    }

    #[test]
    fn suppressed_writes_are_silent() {
        let shape = CoreObject::new(&SHAPE);
        let sink = RecordingSink::new();
        let _observer = observe(&shape, "ZIndex", &sink);

        {
            let _guard = PublishingSuppression::enter();
            shape.set("ZIndex", 3).unwrap();
        }
        shape.set("ZIndex", 4).unwrap();

        let ops = sink.take();
        assert_eq!(ops.len(), 1);
        let op = ops[0].downcast_ref::<UpdatePropertyValueOperation>().unwrap();
        assert_eq!(op.old_value(), &Value::Int(3));
    }

    #[test]
    fn dispose_unsubscribes_all_slots() {
        let shape = CoreObject::new(&SHAPE);
        let sink = RecordingSink::new();
        let observer = observe(&shape, "Opacity", &sink);
        let property = shape.engine_property("Opacity").unwrap();

        observer.dispose();
        property.set_value(0.1).unwrap();
        property.set_expression(Some(Expression::new("1")));

        assert_eq!(sink.len(), 0);
        assert!(sink.completed.get());
        assert!(property.value_changed().is_empty());
        assert!(property.expression_changed().is_empty());
    }
}
