use std::cell::Cell;
use std::rc::{Rc, Weak};

use strata_core::{CoreObject, EasingChange, ListenerId, SplineEasing};

use super::{ObserverContext, OperationObserver, OperationSink, OperationStream};
use crate::operation::UpdateSplineEasingOperation;
use crate::path::{self, TrackedPaths};
use crate::sequence::OperationSequenceGenerator;

/// Observes the four control points of a spline easing.
///
/// Spline notifications carry only the new value, so the observer keeps a
/// snapshot of all control points to supply the old one. The snapshot is
/// refreshed on every change, published or not.
pub struct SplineEasingObserver(Rc<SplineObserverInner>);

struct SplineObserverInner {
    easing: SplineEasing,
    parent: Option<CoreObject>,
    path: String,
    ctx: ObserverContext,
    stream: Rc<OperationStream>,
    snapshot: Cell<[f32; 4]>,
    listener: Cell<Option<ListenerId>>,
    disposed: Cell<bool>,
}

impl SplineEasingObserver {
    pub fn new(
        sink: Option<Rc<dyn OperationSink>>,
        easing: SplineEasing,
        sequence: OperationSequenceGenerator,
        parent: Option<CoreObject>,
        path: impl Into<String>,
        tracked_paths: Option<TrackedPaths>,
    ) -> Self {
        Self::with_context(
            sink,
            easing,
            parent,
            path.into(),
            ObserverContext::new(sequence, tracked_paths),
        )
    }

    pub(crate) fn with_context(
        sink: Option<Rc<dyn OperationSink>>,
        easing: SplineEasing,
        parent: Option<CoreObject>,
        path: String,
        ctx: ObserverContext,
    ) -> Self {
        let inner = Rc::new(SplineObserverInner {
            snapshot: Cell::new(easing.points()),
            easing,
            parent,
            path,
            ctx,
            stream: OperationStream::new(sink),
            listener: Cell::new(None),
            disposed: Cell::new(false),
        });
        let weak: Weak<SplineObserverInner> = Rc::downgrade(&inner);
        let id = inner
            .easing
            .changed()
            .subscribe(move |change: &EasingChange| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_changed(change);
                }
            });
        inner.listener.set(Some(id));
        Self(inner)
    }

    pub fn easing(&self) -> &SplineEasing {
        &self.0.easing
    }
}

impl OperationObserver for SplineEasingObserver {
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

impl Drop for SplineEasingObserver {
    fn drop(&mut self) {
        self.0.dispose();
    }
}

impl SplineObserverInner {
    fn on_changed(&self, change: &EasingChange) {
        if self.disposed.get() {
            return;
        }
        let old_value = self.snapshot.get()[change.field.index()];
        self.snapshot.set(self.easing.points());

        let field_path = path::join(&self.path, change.field.name());
        if self.ctx.should_publish(&field_path) {
            let operation = UpdateSplineEasingOperation::new(
                self.easing.clone(),
                field_path,
                change.new_value,
                old_value,
                self.ctx.next_sequence(),
            )
            .with_parent(self.parent.clone());
            self.stream.publish(Box::new(operation));
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some(id) = self.listener.take() {
            self.easing.changed().unsubscribe(id);
        }
        self.stream.complete();
    }
}
