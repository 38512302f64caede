use std::{cell::RefCell, fmt::{Debug, Display}, rc::Rc};

use fnv::FnvHashMap;

use crate::{errors, lexer::Token, MinikError};

use super::{Slot, Value};

/// Name of the namespace which is active outside of any namespaced function.
pub const GLOBAL: &str = "GLOBAL";

pub struct Namespace {
    name: String,
    fields: RefCell<FnvHashMap<String, Slot>>,
    parent: Option<Rc<Namespace>>,
}

impl Namespace {
    pub fn new<S: Into<String>>(name: S, parent: Option<Rc<Namespace>>) -> Self {
        Self { name: name.into(), fields: Default::default(), parent }
    }

    pub fn global() -> Rc<Self> {
        Rc::new(Self::new(GLOBAL, None))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks `name` up here and then in the parent chain. A miss is not an error:
    /// callers fall back to lexical and global lookup.
    pub fn get(&self, name: &str) -> Option<Slot> {
        self.local(name).or_else(|| self.parent.as_ref().and_then(|parent| parent.get(name)))
    }

    pub fn local(&self, name: &str) -> Option<Slot> {
        self.fields.borrow().get(name).cloned()
    }

    /// Adds or replaces a member; re-opened namespaces merge into the existing fields.
    pub fn define<S: Into<String>>(&self, name: S, slot: Slot) {
        self.fields.borrow_mut().insert(name.into(), slot);
    }

    pub fn member(&self, name: &Token) -> Result<Slot, MinikError> {
        self.local(name.lexeme()).ok_or_else(|| errors::runtime(
            name.location(),
            format!("Couldn't find field '{}' in namespace '{}'.", name.lexeme(), self.name),
            format!("Declare '{}' inside `namespace {} {{ ... }}`.", name.lexeme(), self.name),
        ))
    }

    pub fn assign(&self, name: &Token, value: Value) -> Result<(), MinikError> {
        self.member(name)?.set(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.borrow().is_empty()
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<namespace {}>", self.name)
    }
}

impl Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<namespace {}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_fall_back_to_the_parent() {
        let global = Namespace::global();
        global.define("a", Slot::new(Value::Number(1.0)));
        let inner = Namespace::new("inner", Some(global.clone()));
        inner.define("b", Slot::new(Value::Number(2.0)));

        assert_eq!(inner.get("a").and_then(|slot| slot.get().as_number()), Some(1.0));
        assert_eq!(inner.get("b").and_then(|slot| slot.get().as_number()), Some(2.0));
        assert!(inner.get("c").is_none());
        assert!(inner.local("a").is_none());
    }

    #[test]
    fn members_are_local_and_assigned_in_place() {
        let ns = Namespace::new("config", None);
        let slot = Slot::new(Value::Number(1.0));
        ns.define("level", slot.clone());

        ns.assign(&Token::identifier("level"), Value::Number(5.0)).unwrap();
        assert_eq!(slot.get().as_number(), Some(5.0));

        let err = ns.member(&Token::identifier("missing")).unwrap_err();
        assert_eq!(err.description(), "Couldn't find field 'missing' in namespace 'config'.");
        assert!(ns.assign(&Token::identifier("missing"), Value::Nil).is_err());
    }

    #[test]
    fn redefinition_merges() {
        let ns = Namespace::new("ns", None);
        ns.define("a", Slot::new(Value::Number(1.0)));
        ns.define("b", Slot::new(Value::Number(2.0)));
        ns.define("a", Slot::new(Value::Number(3.0)));

        assert_eq!(ns.len(), 2);
        assert_eq!(ns.get("a").and_then(|slot| slot.get().as_number()), Some(3.0));
        assert_eq!(Namespace::global().to_string(), "<namespace GLOBAL>");
    }
}
