use std::{cell::RefCell, rc::Rc};

use fnv::FnvHashMap;

use crate::{errors, lexer::Token, MinikError};

use super::Slot;

#[derive(Clone, Debug, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

#[derive(Debug, Default)]
pub struct Scope {
    values: FnvHashMap<String, Symbol>,
    parent: Option<Environment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Undefined,
    Defined,
}

#[derive(Debug, Clone)]
struct Symbol {
    state: State,
    slot: Slot,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(&self) -> Environment {
        let child = Scope {
            parent: Some(self.clone()),
            ..Default::default()
        };

        Environment(Rc::new(RefCell::new(child)))
    }

    /// Inserts `name` ahead of its definition so that it can be referenced early.
    /// A name which is already defined in this frame is left alone.
    pub fn predefine(&self, name: &Token, slot: Slot) {
        let mut scope = self.0.borrow_mut();
        if let Some(Symbol { state: State::Defined, .. }) = scope.values.get(name.lexeme()) {
            return;
        }

        scope.values.insert(name.lexeme().to_string(), Symbol { state: State::Undefined, slot });
    }

    pub fn define(&self, name: &Token, slot: Slot) -> Result<(), MinikError> {
        let mut scope = self.0.borrow_mut();
        match scope.values.get_mut(name.lexeme()) {
            Some(Symbol { state: State::Defined, .. }) => Err(errors::runtime(
                name.location(),
                format!("Redefinition of '{}'.", name.lexeme()),
                format!("Assign to the existing variable with `{} = ...` instead.", name.lexeme()),
            )),
            Some(symbol) => {
                symbol.state = State::Defined;
                if !symbol.slot.ptr_eq(&slot) {
                    let value = slot.get();
                    symbol.slot.set(value);
                }
                Ok(())
            },
            None => {
                scope.values.insert(name.lexeme().to_string(), Symbol { state: State::Defined, slot });
                Ok(())
            },
        }
    }

    /// Host-side definition which replaces whatever the frame held under `name`.
    pub fn insert<K: Into<String>>(&self, name: K, slot: Slot) {
        self.0.borrow_mut().values.insert(name.into(), Symbol { state: State::Defined, slot });
    }

    pub fn get(&self, name: &Token) -> Result<Slot, MinikError> {
        self.lookup(name.lexeme()).ok_or_else(|| errors::runtime(
            name.location(),
            format!("Undefined variable '{}'.", name.lexeme()),
            format!("Declare it first with `{} := ...;`.", name.lexeme()),
        ))
    }

    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Slot, MinikError> {
        self.ancestor(distance)
            .and_then(|env| env.0.borrow().values.get(name.lexeme()).map(|symbol| symbol.slot.clone()))
            .ok_or_else(|| errors::runtime(
                name.location(),
                format!("Couldn't resolve '{}' at scope distance {}.", name.lexeme(), distance),
                "This is a bug in the interpreter, please report it with example code.",
            ))
    }

    /// Whether this frame itself holds `name`, defined or not.
    pub fn has(&self, name: &str) -> bool {
        self.0.borrow().values.contains_key(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        matches!(self.0.borrow().values.get(name), Some(Symbol { state: State::Defined, .. }))
    }

    fn lookup(&self, name: &str) -> Option<Slot> {
        let scope = self.0.borrow();
        match scope.values.get(name) {
            Some(symbol) => Some(symbol.slot.clone()),
            None => scope.parent.as_ref().and_then(|parent| parent.lookup(name)),
        }
    }

    fn ancestor(&self, distance: usize) -> Option<Environment> {
        let mut env = self.clone();
        for _ in 0..distance {
            let parent = env.0.borrow().parent.clone()?;
            env = parent;
        }

        Some(env)
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::Value;

    use super::*;

    fn id(name: &str) -> Token {
        Token::identifier(name)
    }

    fn number(env: &Environment, name: &str) -> Option<f64> {
        env.get(&id(name)).ok().and_then(|slot| slot.get().as_number())
    }

    #[test]
    fn test_global() {
        let env = Environment::new();
        env.define(&id("a"), Slot::new(Value::Number(1.0))).unwrap();
        env.define(&id("b"), Slot::new(Value::Number(2.0))).unwrap();

        assert_eq!(number(&env, "a"), Some(1.0));
        assert_eq!(number(&env, "b"), Some(2.0));
        let err = env.get(&id("c")).unwrap_err();
        assert_eq!(err.description(), "Undefined variable 'c'.");
    }

    #[test]
    fn test_scoped() {
        let global = Environment::new();
        global.define(&id("a"), Slot::new(Value::Number(1.0))).unwrap();
        global.define(&id("b"), Slot::new(Value::Number(2.0))).unwrap();
        let env = global.branch();

        assert_eq!(number(&env, "a"), Some(1.0));

        env.define(&id("a"), Slot::new(Value::Number(3.0))).unwrap();
        env.define(&id("c"), Slot::new(Value::Number(4.0))).unwrap();

        assert_eq!(number(&global, "a"), Some(1.0));
        assert_eq!(number(&env, "a"), Some(3.0));
        assert_eq!(number(&env, "b"), Some(2.0));
        assert_eq!(number(&env, "c"), Some(4.0));
        assert!(env.get(&id("d")).is_err());
    }

    #[test]
    fn redefinition_fails() {
        let env = Environment::new();
        env.define(&id("a"), Slot::new(Value::Nil)).unwrap();
        let err = env.define(&id("a"), Slot::new(Value::Nil)).unwrap_err();
        assert_eq!(err.description(), "Redefinition of 'a'.");
    }

    #[test]
    fn predefine_then_define_keeps_the_box() {
        let env = Environment::new();
        let early = Slot::new(Value::Nil);
        env.predefine(&id("f"), early.clone());
        assert!(env.has("f"));
        assert!(!env.is_defined("f"));

        env.define(&id("f"), Slot::new(Value::Number(7.0))).unwrap();
        assert!(env.is_defined("f"));
        assert_eq!(early.get().as_number(), Some(7.0));
        assert!(env.define(&id("f"), Slot::new(Value::Nil)).is_err());
    }

    #[test]
    fn get_at_walks_exactly_distance_frames() {
        let global = Environment::new();
        global.define(&id("a"), Slot::new(Value::Number(1.0))).unwrap();
        let middle = global.branch();
        middle.define(&id("a"), Slot::new(Value::Number(2.0))).unwrap();
        let inner = middle.branch();

        assert_eq!(inner.get_at(1, &id("a")).unwrap().get().as_number(), Some(2.0));
        assert_eq!(inner.get_at(2, &id("a")).unwrap().get().as_number(), Some(1.0));
        assert!(inner.get_at(0, &id("a")).is_err());
        assert!(inner.get_at(5, &id("a")).is_err());
    }

    #[test]
    fn has_only_checks_the_local_frame() {
        let global = Environment::new();
        global.insert("ns", Slot::nil());
        let child = global.branch();
        assert!(global.has("ns"));
        assert!(!child.has("ns"));
    }
}
