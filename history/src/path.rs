//! Dotted property paths.
//!
//! A path is a dot-joined sequence of property names relative to the tracking
//! root, e.g. `Items.Opacity.Animation`. A trailing `Animation` or
//! `Expression` segment after an engine property name addresses that
//! property's auxiliary slot.

use std::collections::HashSet;
use std::rc::Rc;

/// Segment addressing an animatable property's animation slot.
pub const ANIMATION: &str = "Animation";
/// Segment addressing an animatable property's expression slot.
pub const EXPRESSION: &str = "Expression";
/// Segment naming a node item's port value.
pub const NODE_PROPERTY: &str = "Property";

/// Auxiliary slot of an animatable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxSlot {
    Animation,
    Expression,
}

/// Appends `name` to `base`. An empty base yields `name` alone.
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else {
        format!("{base}.{name}")
    }
}

/// The final segment of a path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Splits off an auxiliary slot suffix.
///
/// Returns the property name the path addresses and, if the last segment is
/// `Animation`/`Expression` and a property name precedes it, the slot.
/// Callers still have to check that the named property is animatable.
pub fn split_slot(path: &str) -> (&str, Option<AuxSlot>) {
    let mut segments = path.rsplit('.');
    let last = segments.next().unwrap_or(path);
    let aux = match last {
        ANIMATION => Some(AuxSlot::Animation),
        EXPRESSION => Some(AuxSlot::Expression),
        _ => None,
    };
    match (aux, segments.next()) {
        (Some(aux), Some(property)) => (property, Some(aux)),
        _ => (last, None),
    }
}

/// A set of paths restricting what an observer tree records.
///
/// A path is included if it is in the set or is a proper prefix (on segment
/// boundaries) of a path in the set, so observers keep descending toward
/// every tracked leaf.
#[derive(Debug, Clone, Default)]
pub struct TrackedPaths(Rc<HashSet<String>>);

impl TrackedPaths {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Rc::new(paths.into_iter().map(Into::into).collect()))
    }

    pub fn includes(&self, path: &str) -> bool {
        self.0.contains(path)
            || self.0.iter().any(|tracked| {
                tracked
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
            })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for TrackedPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// `true` when there is no filter or the filter includes `path`.
pub(crate) fn is_tracked(filter: Option<&TrackedPaths>, path: &str) -> bool {
    filter.is_none_or(|paths| paths.includes(path))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn join_skips_empty_base() {
        assert_eq!(join("", "Name"), "Name");
        assert_eq!(join("Items", "Name"), "Items.Name");
    }

    #[rstest]
    #[case("Opacity", "Opacity", None)]
    #[case("Layer.Opacity", "Opacity", None)]
    #[case("Opacity.Animation", "Opacity", Some(AuxSlot::Animation))]
    #[case("Layer.Opacity.Expression", "Opacity", Some(AuxSlot::Expression))]
    #[case("Animation", "Animation", None)]
    fn split_slot_cases(
        #[case] path: &str,
        #[case] property: &str,
        #[case] aux: Option<AuxSlot>,
    ) {
        assert_eq!(split_slot(path), (property, aux));
    }

    #[test]
    fn last_segment_of_paths() {
        assert_eq!(last_segment("A.B.C"), "C");
        assert_eq!(last_segment("A"), "A");
    }

    #[rstest]
    #[case("Items", true)]
    #[case("Items.Title", true)]
    #[case("Items.Title.Text", false)]
    #[case("Item", false)]
    #[case("Opacity", false)]
    fn tracked_paths_prefixes(#[case] path: &str, #[case] expected: bool) {
        let tracked = TrackedPaths::new(["Items.Title"]);
        assert_eq!(tracked.includes(path), expected);
    }

    #[test]
    fn no_filter_tracks_everything() {
        assert!(is_tracked(None, "Anything"));
        let tracked: TrackedPaths = ["Name"].into_iter().collect();
        assert!(!is_tracked(Some(&tracked), "Other"));
    }
}
