//! # Strata Core
//!
//! The tracked object model that the history crate observes and replays
//! changes against.
//!
//! - [`CoreObject`] — reference-counted object described by a static
//!   [`TypeDescriptor`], firing [`PropertyChange`] notifications
//! - [`EngineProperty`] — value slot with optional animation and expression
//! - [`CoreList`] — observable ordered collection owned by an object
//! - [`KeyFrameAnimation`] / [`KeyFrame`] — animation objects
//! - [`Easing`] / [`SplineEasing`] — easing curves, splines being mutable
//! - [`NodeItem`] / [`NodePort`] — node graph items exposing a single port
//!
//! Everything here is single-threaded: handles are `Rc`-backed, clone
//! cheaply, and compare by identity where they denote shared state.

mod animation;
mod descriptor;
mod easing;
mod engine;
mod error;
mod event;
mod expression;
mod id;
mod list;
mod node;
mod object;
mod value;

pub use animation::{KeyFrame, KeyFrameAnimation};
pub use descriptor::{PropertyDescriptor, PropertyKind, TypeDescriptor, TypeDescriptorBuilder};
pub use easing::{Easing, EasingChange, SplineEasing, SplineField};
pub use engine::{EngineProperty, SlotChange, ValueChange};
pub use error::{ModelError, ModelResult};
pub use event::{ListenerId, ListenerSet};
pub use expression::Expression;
pub use id::ObjectId;
pub use list::{CoreList, ListChange, ResetBehavior};
pub use node::{NodeItem, NodePort};
pub use object::{CoreObject, HIERARCHICAL_PARENT, PropertyChange};
pub use value::{FromValue, Value, ValueKind};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
