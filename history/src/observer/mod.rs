//! Observer tree mirroring the live object graph.
//!
//! Each observer watches exactly one live slot and turns every mutation it
//! sees into a path-qualified [`ChangeOperation`] pushed to its single
//! downstream [`OperationSink`]:
//!
//! - [`CoreObjectObserver`] — core properties of an object, composing the
//!   observers below for nested values
//! - [`CollectionObserver`] — a list and one child observer per item
//! - [`EnginePropertyObserver`] — value, animation and expression slots
//! - [`NodeItemObserver`] — a node item's port value and animation
//! - [`SplineEasingObserver`] — spline control points
//!
//! Children publish through their parent's stream, so the root observer's
//! sink sees every operation of the tree. Observers rewire children even
//! while [`PublishingSuppression`] is active; only publishing is skipped.
//!
//! Dropping an observer disposes it: listeners are removed, children are
//! disposed depth-first, then the sink receives `on_completed`.

mod collection;
mod core_object;
mod engine_property;
mod node_item;
mod spline_easing;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use strata_core::{CoreObject, Easing, Value};

use crate::operation::ChangeOperation;
use crate::path::{self, TrackedPaths};
use crate::sequence::OperationSequenceGenerator;
use crate::suppression::PublishingSuppression;

pub use collection::CollectionObserver;
pub use core_object::CoreObjectObserver;
pub use engine_property::EnginePropertyObserver;
pub use node_item::NodeItemObserver;
pub use spline_easing::SplineEasingObserver;

/// Single-consumer push interface receiving operations from an observer.
pub trait OperationSink {
    fn on_next(&self, operation: Box<dyn ChangeOperation>);

    /// The observer was disposed and will publish nothing more.
    fn on_completed(&self) {}
}

/// Common handle surface of all observers.
pub trait OperationObserver {
    /// Attaches the downstream sink, replacing any previous one.
    fn subscribe(&self, sink: Rc<dyn OperationSink>);

    /// Stops observing and completes the downstream sink. Idempotent.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// The outgoing side of an observer.
pub(crate) struct OperationStream {
    sink: RefCell<Option<Rc<dyn OperationSink>>>,
    completed: Cell<bool>,
}

impl OperationStream {
    pub(crate) fn new(sink: Option<Rc<dyn OperationSink>>) -> Rc<Self> {
        Rc::new(Self {
            sink: RefCell::new(sink),
            completed: Cell::new(false),
        })
    }

    pub(crate) fn attach(&self, sink: Rc<dyn OperationSink>) {
        if !self.completed.get() {
            *self.sink.borrow_mut() = Some(sink);
        }
    }

    pub(crate) fn publish(&self, operation: Box<dyn ChangeOperation>) {
        if self.completed.get() {
            return;
        }
        let sink = self.sink.borrow().clone();
        if let Some(sink) = sink {
            sink.on_next(operation);
        }
    }

    pub(crate) fn complete(&self) {
        if self.completed.replace(true) {
            return;
        }
        let sink = self.sink.borrow_mut().take();
        if let Some(sink) = sink {
            sink.on_completed();
        }
    }

    /// A sink forwarding into this stream, for child observers.
    pub(crate) fn relay(self: &Rc<Self>) -> Rc<dyn OperationSink> {
        Rc::new(Relay(Rc::downgrade(self)))
    }
}

/// Forwards a child's operations into its parent's stream. A child
/// completing does not complete the parent.
struct Relay(Weak<OperationStream>);

impl OperationSink for Relay {
    fn on_next(&self, operation: Box<dyn ChangeOperation>) {
        if let Some(stream) = self.0.upgrade() {
            stream.publish(operation);
        }
    }
}

/// Settings shared by every observer of one tree.
#[derive(Clone)]
pub(crate) struct ObserverContext {
    pub(crate) sequence: OperationSequenceGenerator,
    pub(crate) tracked_paths: Option<TrackedPaths>,
}

impl ObserverContext {
    pub(crate) fn new(sequence: OperationSequenceGenerator, tracked_paths: Option<TrackedPaths>) -> Self {
        Self {
            sequence,
            tracked_paths,
        }
    }

    pub(crate) fn is_tracked(&self, path: &str) -> bool {
        path::is_tracked(self.tracked_paths.as_ref(), path)
    }

    /// Whether an operation at `path` should be built and published now.
    pub(crate) fn should_publish(&self, path: &str) -> bool {
        !PublishingSuppression::is_suppressed() && self.is_tracked(path)
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.next()
    }
}

/// The observer a composite value needs, chosen once per value.
pub(crate) enum ChildObserver {
    Object(CoreObjectObserver),
    Collection(CollectionObserver),
    Spline(SplineEasingObserver),
}

impl ChildObserver {
    /// Builds the observer for `value` at `path`, or `None` for values with
    /// nothing to observe.
    ///
    /// `holder` is the object whose slot holds the value: it owns lists and
    /// is recorded as the parent of spline easings.
    pub(crate) fn for_value(
        value: &Value,
        holder: &CoreObject,
        path: &str,
        sink: Rc<dyn OperationSink>,
        ctx: &ObserverContext,
    ) -> Option<Self> {
        if !ctx.is_tracked(path) {
            return None;
        }
        match value {
            Value::Object(object) => Some(Self::Object(CoreObjectObserver::with_context(
                Some(sink),
                object.clone(),
                path.to_owned(),
                ctx.clone(),
            ))),
            Value::List(list) => Some(Self::Collection(CollectionObserver::with_context(
                Some(sink),
                list.clone(),
                holder.clone(),
                path.to_owned(),
                ctx.clone(),
            ))),
            Value::Easing(Easing::Spline(spline)) => {
                Some(Self::Spline(SplineEasingObserver::with_context(
                    Some(sink),
                    spline.clone(),
                    Some(holder.clone()),
                    path.to_owned(),
                    ctx.clone(),
                )))
            }
            _ => None,
        }
    }

    pub(crate) fn dispose(&self) {
        match self {
            Self::Object(observer) => observer.dispose(),
            Self::Collection(observer) => observer.dispose(),
            Self::Spline(observer) => observer.dispose(),
        }
    }
}

/// Replaces the child held in `slot` with one for `value`.
///
/// The old child is disposed outside the borrow so that its completion
/// cannot observe the slot mid-update.
pub(crate) fn rewire(
    slot: &RefCell<Option<ChildObserver>>,
    value: &Value,
    holder: &CoreObject,
    path: &str,
    sink: Rc<dyn OperationSink>,
    ctx: &ObserverContext,
) {
    let old = slot.borrow_mut().take();
    if let Some(old) = old {
        old.dispose();
    }
    let new = ChildObserver::for_value(value, holder, path, sink, ctx);
    *slot.borrow_mut() = new;
}
