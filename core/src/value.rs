//! Dynamically typed property values.

use std::fmt;

use crate::animation::KeyFrameAnimation;
use crate::easing::{Easing, SplineEasing};
use crate::expression::Expression;
use crate::list::CoreList;
use crate::object::CoreObject;

/// A property value.
///
/// Scalars compare by value. Objects, lists, spline easings and expressions
/// are shared handles and compare by identity, so two structurally equal
/// but distinct lists are never equal.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(CoreObject),
    List(CoreList),
    Easing(Easing),
    Expression(Expression),
}

/// The declared kind of a property slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Accepts any value.
    Any,
    Bool,
    Int,
    Float,
    Str,
    Object,
    List,
    Easing,
    Expression,
}

impl Value {
    /// Returns the kind of this value, or `None` for [`Value::Null`].
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Str(_) => Some(ValueKind::Str),
            Self::Object(_) => Some(ValueKind::Object),
            Self::List(_) => Some(ValueKind::List),
            Self::Easing(_) => Some(ValueKind::Easing),
            Self::Expression(_) => Some(ValueKind::Expression),
        }
    }

    /// Returns `true` if the value can be stored in a slot of `kind`.
    ///
    /// `Null` fits every slot.
    pub fn conforms_to(&self, kind: ValueKind) -> bool {
        match self.kind() {
            None => true,
            Some(own) => kind == ValueKind::Any || own == kind,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&CoreObject> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&CoreList> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_easing(&self) -> Option<&Easing> {
        match self {
            Self::Easing(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the spline if this value is a spline easing.
    pub fn as_spline(&self) -> Option<&SplineEasing> {
        match self {
            Self::Easing(Easing::Spline(spline)) => Some(spline),
            _ => None,
        }
    }

    /// Address of the shared state behind an object, list or spline value.
    ///
    /// Scalars, linear easings and expressions have no observable state and
    /// yield `None`.
    pub fn identity(&self) -> Option<*const ()> {
        match self {
            Self::Object(v) => Some(v.as_ptr()),
            Self::List(v) => Some(v.as_ptr()),
            Self::Easing(Easing::Spline(v)) => Some(v.as_ptr()),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Self::Expression(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Easing(a), Self::Easing(b)) => a == b,
            (Self::Expression(a), Self::Expression(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Object(v) => write!(f, "Object({v:?})"),
            Self::List(v) => write!(f, "List({v:?})"),
            Self::Easing(v) => write!(f, "Easing({v:?})"),
            Self::Expression(v) => write!(f, "Expression({v:?})"),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Float,
    String => Str,
    &str => Str,
    CoreObject => Object,
    CoreList => List,
    Easing => Easing,
    Expression => Expression,
}

impl From<SplineEasing> for Value {
    fn from(value: SplineEasing) -> Self {
        Self::Easing(Easing::Spline(value))
    }
}

impl From<KeyFrameAnimation> for Value {
    fn from(value: KeyFrameAnimation) -> Self {
        Self::Object(value.into_object())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Conversion out of a [`Value`].
pub trait FromValue: Sized {
    /// Returns `None` if the value has a different kind.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_float().map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for CoreObject {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl FromValue for CoreList {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_list().cloned()
    }
}

impl FromValue for Easing {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_easing().cloned()
    }
}

impl FromValue for Expression {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_expression().cloned()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
