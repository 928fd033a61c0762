//! Key-frame animations.
//!
//! Both [`KeyFrameAnimation`] and [`KeyFrame`] are ordinary [`CoreObject`]s
//! with well-known descriptors, so their properties are observed and
//! replayed like any other object's. The wrappers only add typed access.

use std::sync::LazyLock;

use crate::descriptor::TypeDescriptor;
use crate::easing::Easing;
use crate::list::CoreList;
use crate::object::CoreObject;
use crate::value::{Value, ValueKind};

/// Property holding the animation's key frames.
pub const KEY_FRAMES: &str = "KeyFrames";

static KEY_FRAME_ANIMATION: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::builder("KeyFrameAnimation")
        .property(KEY_FRAMES, ValueKind::List, || Value::List(CoreList::new()))
        .build()
});

static KEY_FRAME: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::builder("KeyFrame")
        .property("Value", ValueKind::Any, || Value::Null)
        .property("KeyTime", ValueKind::Float, || Value::Float(0.0))
        .property("Easing", ValueKind::Easing, || Value::Easing(Easing::Linear))
        .build()
});

/// An animation made of key frames stored in its `KeyFrames` list.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFrameAnimation(CoreObject);

impl KeyFrameAnimation {
    pub fn new() -> Self {
        Self(CoreObject::new(&KEY_FRAME_ANIMATION))
    }

    /// Wraps an object created by [`KeyFrameAnimation::new`].
    pub fn from_object(object: CoreObject) -> Option<Self> {
        std::ptr::eq(object.descriptor(), &*KEY_FRAME_ANIMATION).then_some(Self(object))
    }

    pub fn as_object(&self) -> &CoreObject {
        &self.0
    }

    pub fn into_object(self) -> CoreObject {
        self.0
    }

    /// The live key frame list.
    pub fn key_frames(&self) -> CoreList {
        self.0
            .get_as::<CoreList>(KEY_FRAMES)
            .unwrap_or_default()
    }

    pub fn add_key_frame(&self, key_frame: KeyFrame) {
        self.key_frames().push(key_frame.into_object());
    }

    /// Evaluates the animation at `time`.
    ///
    /// Before the first key frame the first value holds, after the last the
    /// last value holds. In between, numeric values are interpolated using
    /// the easing of the later key frame; other values step.
    pub fn interpolate(&self, time: f64) -> Value {
        let mut frames: Vec<KeyFrame> = self
            .key_frames()
            .to_vec()
            .into_iter()
            .filter_map(|v| v.as_object().cloned().and_then(KeyFrame::from_object))
            .collect();
        frames.sort_by(|a, b| a.key_time().total_cmp(&b.key_time()));

        let Some(first) = frames.first() else {
            return Value::Null;
        };
        if time <= first.key_time() {
            return first.value();
        }
        for pair in frames.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if time <= next.key_time() {
                let span = next.key_time() - prev.key_time();
                let progress = if span > 0.0 {
                    ((time - prev.key_time()) / span) as f32
                } else {
                    1.0
                };
                let eased = next.easing().ease(progress) as f64;
                return lerp(&prev.value(), &next.value(), eased);
            }
        }
        frames.last().map(KeyFrame::value).unwrap_or_default()
    }
}

impl Default for KeyFrameAnimation {
    fn default() -> Self {
        Self::new()
    }
}

fn lerp(from: &Value, to: &Value, t: f64) -> Value {
    match (from.as_float(), to.as_float()) {
        (Some(a), Some(b)) => Value::Float(a + (b - a) * t),
        _ if t >= 1.0 => to.clone(),
        _ => from.clone(),
    }
}

/// A single key frame: a value reached at `KeyTime` through `Easing`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFrame(CoreObject);

impl KeyFrame {
    pub fn new(key_time: f64, value: impl Into<Value>, easing: Easing) -> Self {
        let object = CoreObject::new(&KEY_FRAME);
        let key_frame = Self(object);
        key_frame.set_key_time(key_time);
        key_frame.set_value(value);
        key_frame.set_easing(easing);
        key_frame
    }

    pub fn from_object(object: CoreObject) -> Option<Self> {
        std::ptr::eq(object.descriptor(), &*KEY_FRAME).then_some(Self(object))
    }

    pub fn as_object(&self) -> &CoreObject {
        &self.0
    }

    pub fn into_object(self) -> CoreObject {
        self.0
    }

    pub fn value(&self) -> Value {
        self.0.get("Value").unwrap_or_default()
    }

    pub fn set_value(&self, value: impl Into<Value>) {
        // `Value` accepts any kind, so this cannot fail.
        let _ = self.0.set("Value", value);
    }

    pub fn key_time(&self) -> f64 {
        self.0.get_as::<f64>("KeyTime").unwrap_or_default()
    }

    pub fn set_key_time(&self, key_time: f64) {
        let _ = self.0.set("KeyTime", key_time);
    }

    pub fn easing(&self) -> Easing {
        self.0.get_as::<Easing>("Easing").unwrap_or(Easing::Linear)
    }

    pub fn set_easing(&self, easing: Easing) {
        let _ = self.0.set("Easing", easing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::SplineEasing;

    fn ramp() -> KeyFrameAnimation {
        let animation = KeyFrameAnimation::new();
        animation.add_key_frame(KeyFrame::new(1.0, 10.0, Easing::Linear));
        animation.add_key_frame(KeyFrame::new(3.0, 30.0, Easing::Linear));
        animation
    }

    #[test]
    fn interpolate_clamps_outside_range() {
        let animation = ramp();
        assert_eq!(animation.interpolate(0.0), Value::Float(10.0));
        assert_eq!(animation.interpolate(5.0), Value::Float(30.0));
    }

    #[test]
    fn interpolate_linear_between_frames() {
        let animation = ramp();
        assert_eq!(animation.interpolate(2.0), Value::Float(20.0));
    }

    #[test]
    fn interpolate_uses_later_frame_easing() {
        let animation = KeyFrameAnimation::new();
        animation.add_key_frame(KeyFrame::new(0.0, 0.0, Easing::Linear));
        let ease_in = SplineEasing::new(0.42, 0.0, 1.0, 1.0);
        animation.add_key_frame(KeyFrame::new(1.0, 1.0, Easing::Spline(ease_in)));

        let mid = animation.interpolate(0.5).as_float().unwrap();
        assert!(mid < 0.5);
    }

    #[test]
    fn non_numeric_values_step() {
        let animation = KeyFrameAnimation::new();
        animation.add_key_frame(KeyFrame::new(0.0, "a", Easing::Linear));
        animation.add_key_frame(KeyFrame::new(1.0, "b", Easing::Linear));
        assert_eq!(animation.interpolate(0.5), Value::from("a"));
        assert_eq!(animation.interpolate(1.0), Value::from("b"));
    }

    #[test]
    fn key_frames_are_parented_to_animation() {
        let animation = ramp();
        let first = animation.key_frames().get(0).unwrap();
        assert_eq!(
            first.as_object().unwrap().parent(),
            Some(animation.as_object().clone())
        );
    }

    #[test]
    fn from_object_checks_type() {
        let key_frame = KeyFrame::new(0.0, 1, Easing::Linear);
        assert!(KeyFrameAnimation::from_object(key_frame.as_object().clone()).is_none());
        assert!(KeyFrame::from_object(key_frame.into_object()).is_some());
        assert!(KeyFrameAnimation::from_object(KeyFrameAnimation::new().into_object()).is_some());
    }

    #[test]
    fn empty_animation_yields_null() {
        assert_eq!(KeyFrameAnimation::new().interpolate(1.0), Value::Null);
    }
}
