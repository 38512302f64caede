use std::{cell::{Ref, RefCell, RefMut}, fmt, rc::Rc};

use crate::{ast::Literal, errors, Loc, MinikError};

use super::{Callable, Instance, Namespace};

/// The heap box a value lives in, shared by every alias of that value.
#[derive(Clone)]
pub struct Slot(Rc<RefCell<Value>>);

impl Slot {
    pub fn new(value: Value) -> Self {
        Slot(Rc::new(RefCell::new(value)))
    }

    pub fn nil() -> Self {
        Slot::new(Value::Nil)
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    pub fn borrow(&self) -> Ref<'_, Value> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Value> {
        self.0.borrow_mut()
    }

    pub fn is_truthy(&self) -> bool {
        self.0.borrow().is_truthy()
    }

    pub fn ptr_eq(&self, other: &Slot) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The box a new binding receives: lists keep their box, everything else is copied.
    pub fn share(&self) -> Slot {
        if matches!(*self.0.borrow(), Value::List(_)) {
            self.clone()
        } else {
            Slot::new(self.get())
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::new(value)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0.borrow())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.borrow())
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Slot>),
    Callable(Callable),
    Instance(Rc<Instance>),
    Namespace(Rc<Namespace>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            _ => true,
        }
    }

    /// Strings only compare against strings; unlike kinds fall back to comparing truthiness.
    pub fn equals(&self, other: &Value) -> Result<bool, MinikError> {
        match (self, other) {
            (Value::Nil, Value::Nil) => Ok(true),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::String(_), _) | (_, Value::String(_)) => Err(errors::runtime(
                Loc::Native,
                "Cannot compare a string with a non-string type.",
                "Convert the other operand with `to_str` before comparing it to a string.",
            )),
            (a, b) => Ok(a.is_truthy() == b.is_truthy()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Callable(_) => "callable",
            Value::Instance(_) => "instance",
            Value::Namespace(_) => "namespace",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "<list>")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "</list size={}>", items.len())
            },
            Value::Callable(callable) => write!(f, "{}", callable),
            Value::Instance(instance) => write!(f, "{}", instance),
            Value::Namespace(namespace) => write!(f, "{}", namespace),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            other => write!(f, "{}", other),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: &[f64]) -> Value {
        Value::List(values.iter().map(|n| Slot::new(Value::Number(*n))).collect())
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(-0.5).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(list(&[]).is_truthy());
    }

    #[test]
    fn equality_by_kind() {
        assert!(Value::Nil.equals(&Value::Nil).unwrap());
        assert!(Value::from(1.0).equals(&Value::from(1.0)).unwrap());
        assert!(!Value::from(1.0).equals(&Value::from(2.0)).unwrap());
        assert!(Value::from("a").equals(&Value::from("a")).unwrap());
        assert!(!Value::from(true).equals(&Value::from(false)).unwrap());
    }

    #[test]
    fn equality_falls_back_to_truthiness() {
        assert!(Value::Nil.equals(&Value::from(false)).unwrap());
        assert!(Value::Nil.equals(&Value::from(0.0)).unwrap());
        assert!(Value::from(true).equals(&Value::from(3.0)).unwrap());
        assert!(list(&[]).equals(&Value::from(true)).unwrap());
        assert!(!list(&[1.0]).equals(&Value::Nil).unwrap());
    }

    #[test]
    fn strings_only_compare_with_strings() {
        let err = Value::from("1").equals(&Value::from(1.0)).unwrap_err();
        assert_eq!(err.description(), "Cannot compare a string with a non-string type.");
        assert!(Value::Nil.equals(&Value::from("nil")).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::from(1.0).to_string(), "1");
        assert_eq!(Value::from(0.5).to_string(), "0.5");
        assert_eq!(Value::from(-3.25).to_string(), "-3.25");
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(list(&[1.0, 2.5]).to_string(), "<list>1, 2.5</list size=2>");
        assert_eq!(list(&[]).to_string(), "<list></list size=0>");
    }

    #[test]
    fn share_keeps_lists_and_copies_scalars() {
        let number = Slot::new(Value::from(1.0));
        let copy = number.share();
        assert!(!copy.ptr_eq(&number));
        copy.set(Value::from(2.0));
        assert_eq!(number.get().as_number(), Some(1.0));

        let items = Slot::new(list(&[1.0]));
        assert!(items.share().ptr_eq(&items));
    }
}
