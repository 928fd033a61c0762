//! Easing curves.
//!
//! [`Easing::Linear`] is immutable. [`SplineEasing`] is a shared, mutable
//! cubic-bezier curve whose control points fire [`EasingChange`] when they
//! change. The notification carries only the new value; observers that
//! need the previous one keep their own snapshot.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::event::ListenerSet;

/// An easing function over `[0, 1]`.
#[derive(Clone, PartialEq)]
pub enum Easing {
    Linear,
    Spline(SplineEasing),
}

impl Easing {
    /// Maps linear progress `t` to eased progress.
    pub fn ease(&self, t: f32) -> f32 {
        match self {
            Self::Linear => t.clamp(0.0, 1.0),
            Self::Spline(spline) => spline.ease(t),
        }
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("Linear"),
            Self::Spline(spline) => fmt::Debug::fmt(spline, f),
        }
    }
}

/// A control-point coordinate of a [`SplineEasing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplineField {
    X1,
    Y1,
    X2,
    Y2,
}

impl SplineField {
    pub const ALL: [SplineField; 4] = [Self::X1, Self::Y1, Self::X2, Self::Y2];

    pub fn name(self) -> &'static str {
        match self {
            Self::X1 => "X1",
            Self::Y1 => "Y1",
            Self::X2 => "X2",
            Self::Y2 => "Y2",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Position of the field in [`SplineEasing::points`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Notification fired when a spline control point changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EasingChange {
    pub field: SplineField,
    pub new_value: f32,
}

struct SplineInner {
    points: Cell<[f32; 4]>,
    changed: ListenerSet<EasingChange>,
}

/// Shared handle to a cubic-bezier easing with control points
/// `(x1, y1)` and `(x2, y2)`.
#[derive(Clone)]
pub struct SplineEasing(Rc<SplineInner>);

impl SplineEasing {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self(Rc::new(SplineInner {
            points: Cell::new([x1, y1, x2, y2]),
            changed: ListenerSet::new(),
        }))
    }

    pub fn get(&self, field: SplineField) -> f32 {
        self.0.points.get()[field.index()]
    }

    /// Writes a control point. Unchanged values fire nothing.
    pub fn set(&self, field: SplineField, value: f32) {
        let mut points = self.0.points.get();
        if points[field.index()] == value {
            return;
        }
        points[field.index()] = value;
        self.0.points.set(points);
        self.0.changed.emit(&EasingChange {
            field,
            new_value: value,
        });
    }

    /// All control points as `[x1, y1, x2, y2]`.
    pub fn points(&self) -> [f32; 4] {
        self.0.points.get()
    }

    pub fn x1(&self) -> f32 {
        self.get(SplineField::X1)
    }

    pub fn y1(&self) -> f32 {
        self.get(SplineField::Y1)
    }

    pub fn x2(&self) -> f32 {
        self.get(SplineField::X2)
    }

    pub fn y2(&self) -> f32 {
        self.get(SplineField::Y2)
    }

    pub fn changed(&self) -> &ListenerSet<EasingChange> {
        &self.0.changed
    }

    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }

    pub fn ptr_eq(&self, other: &SplineEasing) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Evaluates the curve at progress `t`.
    ///
    /// Solves `x(s) = t` for the curve parameter with Newton iterations,
    /// falling back to bisection, then returns `y(s)`.
    pub fn ease(&self, t: f32) -> f32 {
        let [x1, y1, x2, y2] = self.points();
        let t = t.clamp(0.0, 1.0);
        let s = solve_parameter(x1, x2, t);
        bezier(y1, y2, s)
    }
}

fn bezier(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_slope(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

fn solve_parameter(x1: f32, x2: f32, x: f32) -> f32 {
    const EPSILON: f32 = 1e-6;

    let mut s = x;
    for _ in 0..8 {
        let error = bezier(x1, x2, s) - x;
        if error.abs() < EPSILON {
            return s;
        }
        let slope = bezier_slope(x1, x2, s);
        if slope.abs() < EPSILON {
            break;
        }
        s -= error / slope;
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    s = x;
    for _ in 0..32 {
        let value = bezier(x1, x2, s);
        if (value - x).abs() < EPSILON {
            break;
        }
        if value < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) * 0.5;
    }
    s
}

impl PartialEq for SplineEasing {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for SplineEasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x1, y1, x2, y2] = self.points();
        write!(f, "Spline({x1}, {y1}, {x2}, {y2})")
    }
}
