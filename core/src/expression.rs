use std::fmt;
use std::rc::Rc;

/// An opaque expression bound to an engine property.
///
/// Expressions are immutable and compare by identity: two expressions with
/// the same source text are still different bindings.
#[derive(Clone)]
pub struct Expression(Rc<str>);

impl Expression {
    pub fn new(source: impl Into<String>) -> Self {
        Self(Rc::from(source.into()))
    }

    pub fn source(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({:?})", self.source())
    }
}
