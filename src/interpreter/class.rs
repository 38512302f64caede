use std::{fmt::{Debug, Display}, rc::Rc};

use fnv::FnvHashMap;

use crate::{ast::ClassDecl, errors, lexer::Token, Loc, MinikError};

use super::{env::Environment, Arity, Callable, Function, Interpreter, Namespace, Slot, Value};

pub struct Class {
    decl: Rc<ClassDecl>,
    methods: FnvHashMap<String, Rc<Function>>,
    closure: Environment,
    namespace: Option<Rc<Namespace>>,
}

impl Class {
    pub fn new(decl: Rc<ClassDecl>, closure: Environment, namespace: Option<Rc<Namespace>>) -> Self {
        let methods = decl.methods.iter().map(|method| {
            let fun = if method.name.lexeme() == decl.name.lexeme() {
                Function::initializer(method.clone(), closure.clone(), namespace.clone())
            } else {
                Function::new(method.clone(), closure.clone(), namespace.clone())
            };

            (method.name.lexeme().to_string(), Rc::new(fun))
        }).collect();

        Self { decl, methods, closure, namespace }
    }

    pub fn name(&self) -> &str {
        self.decl.name.lexeme()
    }

    pub fn find_method(&self, name: &str) -> Option<&Rc<Function>> {
        self.methods.get(name)
    }

    fn initializer(&self) -> Option<&Rc<Function>> {
        self.find_method(self.name())
    }

    pub fn arity(&self) -> Arity {
        self.initializer().map(|init| init.arity()).unwrap_or(Arity::Exactly(0))
    }

    pub fn call(self: &Rc<Self>, interpreter: &mut Interpreter, args: Vec<Slot>) -> Result<Slot, MinikError> {
        let decl = self.decl.clone();
        let fields = interpreter.call_frame(self.namespace.clone(), |interpreter| {
            interpreter.with_env(self.closure.clone(), |interpreter| {
                decl.members.iter().map(|(member, init)| {
                    let slot = match init {
                        Some(init) => interpreter.evaluate(init)?.share(),
                        None => Slot::nil(),
                    };

                    Ok((member.lexeme().to_string(), slot))
                }).collect::<Result<FnvHashMap<_, _>, MinikError>>()
            })
        })?;

        let instance = Rc::new(Instance::new(InstanceOf::Script(self.clone()), fields));
        if let Some(initializer) = self.initializer() {
            initializer.bind(&instance).call(interpreter, args)?;
        }

        Ok(Slot::new(Value::Instance(instance)))
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<class {}>", self.name())
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<class {}>", self.name())
    }
}

/// A host-defined class: a fixed list of fields filled positionally on construction,
/// plus native methods which are looked up unbound.
pub struct NativeClass {
    name: String,
    fields: Vec<String>,
    methods: FnvHashMap<String, Callable>,
}

impl NativeClass {
    pub fn new<S: Into<String>>(name: S, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
            methods: Default::default(),
        }
    }

    pub fn with_method<S: Into<String>>(mut self, name: S, method: Callable) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        Arity::Any
    }

    pub fn find_method(&self, name: &str) -> Option<&Callable> {
        self.methods.get(name)
    }

    pub fn call(self: &Rc<Self>, _interpreter: &mut Interpreter, args: Vec<Slot>) -> Result<Slot, MinikError> {
        if args.len() > self.fields.len() {
            return Err(errors::runtime(
                Loc::Native,
                format!("Expected at most {} arguments but got {}.", self.fields.len(), args.len()),
                format!("'{}' takes its fields ({}) in order.", self.name, self.fields.join(", ")),
            ));
        }

        let mut args = args.into_iter();
        let fields = self.fields.iter()
            .map(|field| (field.clone(), args.next().map(|arg| arg.share()).unwrap_or_else(Slot::nil)))
            .collect();

        Ok(Slot::new(Value::Instance(Rc::new(Instance::new(InstanceOf::Native(self.clone()), fields)))))
    }
}

pub enum InstanceOf {
    Script(Rc<Class>),
    Native(Rc<NativeClass>),
}

/// An object whose set of fields is fixed when it is constructed.
pub struct Instance {
    of: InstanceOf,
    fields: FnvHashMap<String, Slot>,
}

impl Instance {
    pub fn new(of: InstanceOf, fields: FnvHashMap<String, Slot>) -> Self {
        Self { of, fields }
    }

    pub fn class_name(&self) -> &str {
        match &self.of {
            InstanceOf::Script(class) => class.name(),
            InstanceOf::Native(class) => class.name(),
        }
    }

    pub fn field(&self, name: &str) -> Option<Slot> {
        self.fields.get(name).cloned()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Slot)> {
        self.fields.iter().map(|(name, slot)| (name.as_str(), slot.clone()))
    }

    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Slot, MinikError> {
        if let Some(slot) = self.field(name.lexeme()) {
            return Ok(slot);
        }

        let method = match &self.of {
            InstanceOf::Script(class) => class.find_method(name.lexeme())
                .map(|method| Callable::Function(Rc::new(method.bind(self)))),
            InstanceOf::Native(class) => class.find_method(name.lexeme()).cloned(),
        };

        method.map(|method| Slot::new(Value::Callable(method))).ok_or_else(|| errors::runtime(
            name.location(),
            format!("Undefined property '{}' in '{}'.", name.lexeme(), self.class_name()),
            format!("Declare '{}' as a member or method of '{}'.", name.lexeme(), self.class_name()),
        ))
    }

    pub fn set(&self, name: &Token, value: Value) -> Result<(), MinikError> {
        match self.fields.get(name.lexeme()) {
            Some(slot) => {
                slot.set(value);
                Ok(())
            },
            None => Err(errors::runtime(
                name.location(),
                format!("Couldn't find field '{}' in instance.", name.lexeme()),
                format!("Declare '{}' as a member of '{}' to be able to assign to it.", name.lexeme(), self.class_name()),
            )),
        }
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<instance of {}>", self.class_name())
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<instance of {}>", self.class_name())
    }
}
