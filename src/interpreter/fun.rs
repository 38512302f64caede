use std::{fmt::{Debug, Display}, rc::Rc};

use crate::{ast::FunDecl, lexer::Token, MinikError};

use super::{class::{Class, NativeClass}, env::Environment, inter::Flow, Instance, Interpreter, Namespace, Slot, Value};

/// Number of arguments a callable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Any,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => *n == count,
            Arity::Any => true,
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    Class(Rc<Class>),
    NativeClass(Rc<NativeClass>),
}

impl Callable {
    pub fn native<T: Fn(&mut Interpreter, Vec<Slot>) -> Result<Slot, MinikError> + 'static, S: Into<String>>(name: S, arity: Arity, fun: T) -> Self {
        Callable::Native(Rc::new(NativeFunction::new(name, arity, fun)))
    }

    pub fn name(&self) -> &str {
        match self {
            Callable::Function(fun) => fun.name(),
            Callable::Native(fun) => fun.name(),
            Callable::Class(class) => class.name(),
            Callable::NativeClass(class) => class.name(),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Callable::Function(fun) => fun.arity(),
            Callable::Native(fun) => fun.arity(),
            Callable::Class(class) => class.arity(),
            Callable::NativeClass(class) => class.arity(),
        }
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Slot>) -> Result<Slot, MinikError> {
        match self {
            Callable::Function(fun) => fun.call(interpreter, args),
            Callable::Native(fun) => fun.call(interpreter, args),
            Callable::Class(class) => class.call(interpreter, args),
            Callable::NativeClass(class) => class.call(interpreter, args),
        }
    }
}

impl Display for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Callable::Function(fun) => write!(f, "{}", fun),
            Callable::Native(fun) => write!(f, "<native fn {}>", fun.name()),
            Callable::Class(class) => write!(f, "<class {}>", class.name()),
            Callable::NativeClass(class) => write!(f, "<native class {}>", class.name()),
        }
    }
}

impl Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

pub type NativeFn = dyn Fn(&mut Interpreter, Vec<Slot>) -> Result<Slot, MinikError>;

pub struct NativeFunction {
    name: String,
    arity: Arity,
    fun: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new<T: Fn(&mut Interpreter, Vec<Slot>) -> Result<Slot, MinikError> + 'static, S: Into<String>>(name: S, arity: Arity, fun: T) -> Self {
        Self { name: name.into(), arity, fun: Box::new(fun) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Slot>) -> Result<Slot, MinikError> {
        (self.fun)(interpreter, args)
    }
}

#[derive(Clone)]
enum Body {
    Script(Rc<FunDecl>),
    Native(Rc<NativeFunction>),
}

/// A script function closed over the frame it was declared in, or a native delegate
/// installed into a namespace.
#[derive(Clone)]
pub struct Function {
    body: Body,
    closure: Environment,
    is_initializer: bool,
    namespace: Option<Rc<Namespace>>,
}

impl Function {
    pub fn new(decl: Rc<FunDecl>, closure: Environment, namespace: Option<Rc<Namespace>>) -> Self {
        Self { body: Body::Script(decl), closure, is_initializer: false, namespace }
    }

    pub fn initializer(decl: Rc<FunDecl>, closure: Environment, namespace: Option<Rc<Namespace>>) -> Self {
        Self { body: Body::Script(decl), closure, is_initializer: true, namespace }
    }

    pub fn delegate(native: NativeFunction, namespace: Option<Rc<Namespace>>) -> Self {
        Self { body: Body::Native(Rc::new(native)), closure: Environment::new(), is_initializer: false, namespace }
    }

    pub fn name(&self) -> &str {
        match &self.body {
            Body::Script(decl) => decl.name.lexeme(),
            Body::Native(native) => native.name(),
        }
    }

    pub fn arity(&self) -> Arity {
        match &self.body {
            Body::Script(decl) => Arity::Exactly(decl.params.len()),
            Body::Native(native) => native.arity(),
        }
    }

    pub fn namespace(&self) -> Option<&Rc<Namespace>> {
        self.namespace.as_ref()
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Slot>) -> Result<Slot, MinikError> {
        let decl = match &self.body {
            Body::Script(decl) => decl,
            Body::Native(native) => return native.call(interpreter, args),
        };

        let env = self.closure.branch();
        for (param, arg) in decl.params.iter().zip(args) {
            env.define(param, arg)?;
        }

        if let Some(namespace) = &self.namespace {
            env.insert("namespace", Slot::new(Value::Namespace(namespace.clone())));
        }

        let flow = interpreter.call_frame(self.namespace.clone(), |interpreter| interpreter.execute_block(&decl.body, env))?;

        match flow {
            Flow::Return(value) if !self.is_initializer => Ok(value),
            Flow::Normal if !self.is_initializer => Ok(Slot::nil()),
            Flow::Return(_) | Flow::Normal => self.closure.get_at(0, &Token::identifier("this")),
            stray => Err(stray.into_error()),
        }
    }

    /// A copy of this function closed over a frame holding `this` and the instance's fields.
    pub fn bind(&self, instance: &Rc<Instance>) -> Function {
        if let Body::Native(_) = self.body {
            return self.clone();
        }

        let closure = self.closure.branch();
        closure.insert("this", Slot::new(Value::Instance(instance.clone())));
        for (name, slot) in instance.fields() {
            closure.insert(name, slot);
        }

        Self { closure, ..self.clone() }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.body {
            Body::Script(decl) => write!(f, "<fn {}>", decl.name.lexeme()),
            Body::Native(native) => write!(f, "<native fn {}>", native.name()),
        }
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
