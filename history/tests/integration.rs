use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use rstest::rstest;
use strata_core::{
    CoreList, CoreObject, Easing, KeyFrame, KeyFrameAnimation, SplineEasing, SplineField,
    TypeDescriptor, Value, ValueKind,
};
use strata_history::{
    CoreObjectObserver, HistoryError, HistoryManager, HistoryState, OperationObserver,
    OperationSequenceGenerator, PublishingSuppression, TrackedPaths,
};

static LAYER: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::builder("Layer")
        .property("Title", ValueKind::Str, || Value::from(""))
        .build()
});

static DOCUMENT: LazyLock<TypeDescriptor> = LazyLock::new(|| {
    TypeDescriptor::builder("Document")
        .property("Name", ValueKind::Str, || Value::from(""))
        .property("Count", ValueKind::Int, || Value::Int(0))
        .property("Active", ValueKind::Object, || Value::Null)
        .property("Layers", ValueKind::List, || Value::List(CoreList::new()))
        .untracked_property("Selection", ValueKind::Any, || Value::Null)
        .animatable_property("Opacity", ValueKind::Float, || Value::Float(1.0))
        .build()
});

fn init_logging() {
    let _ = env_logger::Builder::new().is_test(true).try_init();
}

/// A document root with an observer tree feeding a history manager.
struct Editor {
    root: CoreObject,
    history: HistoryManager,
    observer: CoreObjectObserver,
}

impl Editor {
    fn new() -> Self {
        Self::with_tracked(None)
    }

    fn with_tracked(tracked: Option<TrackedPaths>) -> Self {
        init_logging();
        let root = CoreObject::new(&DOCUMENT);
        let sequence = OperationSequenceGenerator::new();
        let history = HistoryManager::new(root.clone(), sequence.clone());
        let observer = CoreObjectObserver::new(None, root.clone(), sequence, "", tracked);
        history.subscribe(&observer);
        Self {
            root,
            history,
            observer,
        }
    }

    fn count(&self) -> i64 {
        self.root.get_as::<i64>("Count").unwrap()
    }

    fn layers(&self) -> CoreList {
        self.root.get_as::<CoreList>("Layers").unwrap()
    }
}

fn strings(list: &CoreList) -> Vec<String> {
    list.to_vec()
        .iter()
        .filter_map(|v| v.as_str().map(str::to_owned))
        .collect()
}

fn layer(title: &str) -> CoreObject {
    let layer = CoreObject::new(&LAYER);
    layer.set("Title", title).unwrap();
    layer
}

// ---------------------------------------------------------------------------
// Recording and replay
// ---------------------------------------------------------------------------

#[test]
fn undo_restores_and_redo_reapplies() {
    let editor = Editor::new();
    editor.root.set("Name", "Draft").unwrap();
    editor.root.set("Count", 3).unwrap();
    editor.history.commit("Edit").unwrap();

    assert!(editor.history.undo().unwrap());
    assert_eq!(editor.root.get_as::<String>("Name").unwrap(), "");
    assert_eq!(editor.count(), 0);

    assert!(editor.history.redo().unwrap());
    assert_eq!(editor.root.get_as::<String>("Name").unwrap(), "Draft");
    assert_eq!(editor.count(), 3);
}

#[test]
fn repeated_writes_merge_into_one_step() {
    let editor = Editor::new();
    for value in [10, 20, 30] {
        editor.root.set("Count", value).unwrap();
    }
    assert_eq!(editor.history.pending_count(), 1);
    editor.history.commit("Drag").unwrap();

    editor.history.undo().unwrap();
    assert_eq!(editor.count(), 0);
    editor.history.redo().unwrap();
    assert_eq!(editor.count(), 30);
}

#[test]
fn replay_is_not_recorded() {
    let editor = Editor::new();
    editor.root.set("Count", 1).unwrap();
    editor.history.commit("One").unwrap();

    editor.history.undo().unwrap();
    assert_eq!(editor.history.pending_count(), 0);
    editor.history.redo().unwrap();
    assert_eq!(editor.history.pending_count(), 0);
    assert_eq!(
        (editor.history.undo_count(), editor.history.redo_count()),
        (1, 0)
    );
}

#[test]
fn new_commit_discards_redo() {
    let editor = Editor::new();
    for (value, name) in [(1, "One"), (2, "Two")] {
        editor.root.set("Count", value).unwrap();
        editor.history.commit(name).unwrap();
    }
    editor.history.undo().unwrap();
    assert!(editor.history.can_redo());

    editor.root.set("Name", "Branch").unwrap();
    editor.history.commit("Branch").unwrap();

    assert!(!editor.history.can_redo());
    assert_eq!(editor.history.undo_descriptions(), vec!["Branch", "One"]);
}

#[test]
fn empty_commit_keeps_stacks() {
    let editor = Editor::new();
    editor.root.set("Count", 1).unwrap();
    editor.history.commit("One").unwrap();
    editor.history.undo().unwrap();

    editor.history.commit("Nothing").unwrap();

    assert_eq!(editor.history.undo_count(), 0);
    assert_eq!(editor.history.redo_count(), 1);
}

#[test]
fn suppressed_changes_are_not_recorded() {
    let editor = Editor::new();
    {
        let _guard = PublishingSuppression::enter();
        editor.root.set("Count", 5).unwrap();
    }
    editor.history.commit("Nothing").unwrap();

    assert!(!editor.history.can_undo());
    assert_eq!(editor.count(), 5);
}

#[test]
fn untracked_properties_are_not_recorded() {
    let editor = Editor::new();
    editor.root.set("Selection", 4).unwrap();
    assert_eq!(editor.history.pending_count(), 0);
}

#[test]
fn tracked_paths_limit_recording() {
    let editor = Editor::with_tracked(Some(TrackedPaths::new(["Name"])));
    editor.root.set("Count", 2).unwrap();
    editor.root.set("Name", "Kept").unwrap();
    editor.history.commit("Edit").unwrap();

    editor.history.undo().unwrap();
    assert_eq!(editor.root.get_as::<String>("Name").unwrap(), "");
    assert_eq!(editor.count(), 2);
}

#[test]
fn rollback_restores_graph() {
    let editor = Editor::new();
    editor.root.set("Count", 1).unwrap();
    editor.history.commit("One").unwrap();

    editor.root.set("Count", 2).unwrap();
    editor.root.set("Name", "Scratch").unwrap();
    editor.history.rollback().unwrap();

    assert_eq!(editor.count(), 1);
    assert_eq!(editor.root.get_as::<String>("Name").unwrap(), "");
    assert_eq!(editor.history.pending_count(), 0);
    assert_eq!(editor.history.undo_count(), 1);
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[test]
fn collection_insert_round_trip() {
    let editor = Editor::new();
    let layers = editor.layers();
    {
        let _guard = PublishingSuppression::enter();
        layers.extend(["A", "B", "C"]);
    }

    layers.insert(1, "X").unwrap();
    editor.history.commit("Insert").unwrap();
    assert_eq!(strings(&layers), vec!["A", "X", "B", "C"]);

    editor.history.undo().unwrap();
    assert_eq!(strings(&layers), vec!["A", "B", "C"]);
    editor.history.redo().unwrap();
    assert_eq!(strings(&layers), vec!["A", "X", "B", "C"]);
}

#[rstest]
#[case::to_end(0, 3, &["B", "C", "D", "A"])]
#[case::to_front(3, 0, &["D", "A", "B", "C"])]
#[case::adjacent(1, 2, &["A", "C", "B", "D"])]
fn collection_move_round_trip(#[case] from: usize, #[case] to: usize, #[case] moved: &[&str]) {
    let editor = Editor::new();
    let layers = editor.layers();
    {
        let _guard = PublishingSuppression::enter();
        layers.extend(["A", "B", "C", "D"]);
    }

    layers.move_item(from, to).unwrap();
    editor.history.commit("Move").unwrap();
    assert_eq!(strings(&layers), moved);

    editor.history.undo().unwrap();
    assert_eq!(strings(&layers), vec!["A", "B", "C", "D"]);
    editor.history.redo().unwrap();
    assert_eq!(strings(&layers), moved);
}

#[test]
fn collection_item_edits_are_recorded() {
    let editor = Editor::new();
    let layers = editor.layers();
    let first = layer("Background");
    layers.push(first.clone());
    editor.history.commit("Add layer").unwrap();

    first.set("Title", "Sky").unwrap();
    editor.history.commit("Rename layer").unwrap();

    editor.history.undo().unwrap();
    assert_eq!(first.get_as::<String>("Title").unwrap(), "Background");
    editor.history.undo().unwrap();
    assert!(layers.is_empty());

    editor.history.redo().unwrap();
    editor.history.redo().unwrap();
    assert_eq!(first.get_as::<String>("Title").unwrap(), "Sky");
    assert!(layers.contains(&Value::Object(first)));
}

#[test]
fn nested_list_round_trip() {
    let editor = Editor::new();
    let layers = editor.layers();
    let group = CoreList::from_values(["a"]);
    layers.push(group.clone());
    editor.history.commit("Add group").unwrap();

    group.push("b");
    editor.history.commit("Grow group").unwrap();

    editor.history.undo().unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(strings(&group), vec!["a"]);

    editor.history.redo().unwrap();
    assert_eq!(strings(&group), vec!["a", "b"]);
    assert!(layers.contains(&Value::List(group)));
}

#[test]
fn removed_item_is_no_longer_observed() {
    let editor = Editor::new();
    let layers = editor.layers();
    let item = layer("Temp");
    layers.push(item.clone());
    layers.remove(&Value::Object(item.clone()));
    editor.history.commit("Add and remove").unwrap();

    item.set("Title", "Detached").unwrap();
    assert_eq!(editor.history.pending_count(), 0);
}

// ---------------------------------------------------------------------------
// Child observers
// ---------------------------------------------------------------------------

#[test]
fn child_observer_follows_replacement() {
    let editor = Editor::new();
    let first = layer("First");
    let second = layer("Second");

    editor.root.set("Active", first.clone()).unwrap();
    editor.history.commit("Activate first").unwrap();
    editor.root.set("Active", second.clone()).unwrap();
    editor.history.commit("Activate second").unwrap();

    first.set("Title", "Ignored").unwrap();
    assert_eq!(editor.history.pending_count(), 0);

    second.set("Title", "Edited").unwrap();
    assert_eq!(editor.history.pending_count(), 1);
    editor.history.commit("Edit second").unwrap();

    // Undo back to `first`; its observer is rebuilt during replay.
    editor.history.undo().unwrap();
    editor.history.undo().unwrap();
    first.set("Title", "Tracked again").unwrap();
    assert_eq!(editor.history.pending_count(), 1);
}

#[test]
fn animation_edits_round_trip() {
    let editor = Editor::new();
    let opacity = editor.root.engine_property("Opacity").unwrap();

    opacity.set_value(0.5).unwrap();
    editor.history.commit("Fade").unwrap();

    let animation = KeyFrameAnimation::new();
    opacity.set_animation(Some(animation.clone()));
    animation.add_key_frame(KeyFrame::new(0.0, 0.2, Easing::Linear));
    editor.history.commit("Animate").unwrap();

    editor.history.undo().unwrap();
    assert!(opacity.animation().is_none());
    assert!(animation.key_frames().is_empty());

    editor.history.undo().unwrap();
    assert_eq!(opacity.current_value(), Value::Float(1.0));

    editor.history.redo().unwrap();
    editor.history.redo().unwrap();
    assert_eq!(opacity.current_value(), Value::Float(0.5));
    assert_eq!(opacity.animation().unwrap().key_frames().len(), 1);
}

#[test]
fn spline_control_points_round_trip() {
    let editor = Editor::new();
    let animation = KeyFrameAnimation::new();
    let spline = SplineEasing::new(0.0, 0.0, 1.0, 1.0);
    animation.add_key_frame(KeyFrame::new(0.0, 0.2, Easing::Spline(spline.clone())));
    {
        let _guard = PublishingSuppression::enter();
        let opacity = editor.root.engine_property("Opacity").unwrap();
        opacity.set_animation(Some(animation));
    }

    spline.set(SplineField::X1, 0.4);
    spline.set(SplineField::Y2, 0.6);
    editor.history.commit("Curve").unwrap();

    editor.history.undo().unwrap();
    assert_eq!(spline.points(), [0.0, 0.0, 1.0, 1.0]);
    editor.history.redo().unwrap();
    assert_eq!(spline.points(), [0.4, 0.0, 1.0, 0.6]);
}

// ---------------------------------------------------------------------------
// Transactions and scopes
// ---------------------------------------------------------------------------

#[test]
fn execute_in_transaction_commits_on_success() {
    let editor = Editor::new();
    let result: Result<i64, HistoryError> = editor.history.execute_in_transaction(
        || {
            editor.root.set("Count", 8)?;
            Ok(8)
        },
        "Script",
    );

    assert_eq!(result, Ok(8));
    assert_eq!(editor.history.peek_undo().unwrap().name, "Script");
}

#[test]
fn execute_in_transaction_rolls_back_on_error() {
    let editor = Editor::new();
    let result: Result<(), HistoryError> = editor.history.execute_in_transaction(
        || {
            editor.root.set("Count", 8)?;
            editor.root.set("Name", "Half done")?;
            Err(HistoryError::InvalidArgument("aborted".into()))
        },
        "Script",
    );

    assert!(result.is_err());
    assert_eq!(editor.count(), 0);
    assert_eq!(editor.root.get_as::<String>("Name").unwrap(), "");
    assert!(!editor.history.can_undo());
}

#[test]
fn recording_scope_captures_external_state() {
    let editor = Editor::new();
    let zoom = Rc::new(RefCell::new(1.0_f64));

    let (read, write) = (Rc::clone(&zoom), Rc::clone(&zoom));
    let scope = editor
        .history
        .begin_recording_scope(move || *read.borrow(), move |v| *write.borrow_mut() = v, "Zoom")
        .unwrap();
    *zoom.borrow_mut() = 2.5;
    scope.complete().unwrap();
    editor.root.set("Count", 4).unwrap();
    editor.history.commit("Zoom and count").unwrap();

    assert_eq!(editor.history.undo_count(), 1);
    editor.history.undo().unwrap();
    assert_eq!(editor.count(), 0);
    assert_eq!(*zoom.borrow(), 1.0);
    editor.history.redo().unwrap();
    assert_eq!(*zoom.borrow(), 2.5);
}

// ---------------------------------------------------------------------------
// Notifications and lifecycle
// ---------------------------------------------------------------------------

#[test]
fn state_changes_are_published() {
    let editor = Editor::new();
    let states = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&states);
    editor
        .history
        .state_changed()
        .subscribe(move |state: &HistoryState| sink.borrow_mut().push(*state));

    editor.root.set("Count", 1).unwrap();
    editor.history.commit("One").unwrap();
    editor.history.undo().unwrap();

    let states = states.borrow();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].undo_count, 1);
    assert!(states[1].can_redo && !states[1].can_undo);
}

#[test]
fn disposed_observer_stops_recording() {
    let editor = Editor::new();
    editor.observer.dispose();

    editor.root.set("Count", 1).unwrap();
    assert_eq!(editor.history.pending_count(), 0);
}

#[test]
fn disposed_history_ignores_graph_changes() {
    let editor = Editor::new();
    editor.history.dispose();

    editor.root.set("Count", 1).unwrap();

    assert_eq!(editor.count(), 1);
    assert_eq!(editor.history.commit("x"), Err(HistoryError::Disposed));
    assert_eq!(editor.history.undo(), Err(HistoryError::Disposed));
}
