use std::rc::Rc;

use tracing::{debug, trace};

use crate::{
    analysis::{analyze, Bindings},
    ast::{Expr, ExprVisitor, Import, Stmt, StmtVisitor},
    errors,
    lexer::Token,
    packages::{Package, PackageRegistry},
    Loc, MinikError,
};

use super::{env::Environment, natives, Callable, Class, Function, Namespace, Slot, Value};

const MAX_CALL_DEPTH: usize = 256;

/// Headroom kept free before a call frame runs; the stack is grown on the heap below it.
const RED_ZONE: usize = 128 * 1024;

/// Size of each stack segment allocated when the red zone is reached.
const STACK_SEGMENT: usize = 1024 * 1024;

/// How a statement finished. Everything but `Normal` unwinds until something consumes it.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Slot),
    Break(Option<Token>),
    Continue(Option<Token>),
    Goto(Token),
}

impl Flow {
    /// The error reported when a jump escapes every construct which could consume it.
    pub(super) fn into_error(self) -> MinikError {
        match self {
            Flow::Break(Some(label)) | Flow::Continue(Some(label)) | Flow::Goto(label) => errors::runtime(
                label.location(),
                format!("Couldn't find label '{}'.", label.lexeme()),
                "Jumps can only target labels declared in an enclosing block of the same function.",
            ),
            Flow::Break(None) | Flow::Continue(None) => errors::runtime(
                Loc::Native,
                "Couldn't find a loop to jump out of.",
                "Only use `break` and `continue` inside of a loop.",
            ),
            Flow::Normal | Flow::Return(_) => errors::runtime(
                Loc::Native,
                "Unexpected control flow at the top level.",
                "This is a bug in the interpreter, please report it with example code.",
            ),
        }
    }
}

pub struct Interpreter {
    pub(super) globals: Environment,
    pub(super) env: Environment,
    pub(super) namespace: Rc<Namespace>,
    global_namespace: Rc<Namespace>,
    pub(super) locals: Bindings,
    pub(super) deferred: Vec<Vec<Rc<Stmt>>>,
    pub(super) packages: PackageRegistry,
    depth: usize,
    pub output: Box<dyn std::io::Write>,
}

impl Interpreter {
    /// Resolves and runs a program. Returns every resolve error, or the first runtime error.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Vec<MinikError> {
        let (resolution, errs) = analyze(stmts);
        if !errs.is_empty() {
            return errs;
        }

        // Bindings inside function and class bodies outlive the run; the rest are dropped after it.
        self.locals.extend(resolution.bindings);
        self.env = self.globals.clone();
        self.namespace = self.global_namespace.clone();
        self.deferred.clear();
        self.depth = 0;

        debug!(statements = stmts.len(), "running program");
        let result = self.predefine(stmts).and_then(|_| self.execute_statements(stmts));
        self.env = self.globals.clone();
        for id in &resolution.transient {
            self.locals.remove(id);
        }

        match result {
            Ok(Flow::Normal) | Ok(Flow::Return(_)) => {
                debug!("program finished");
                vec![]
            },
            Ok(stray) => vec![stray.into_error()],
            Err(err) => {
                debug!(error = %err, "program failed");
                vec![err]
            },
        }
    }

    pub fn with_output(self, output: Box<dyn std::io::Write>) -> Self {
        Self {
            output,
            ..self
        }
    }

    pub fn with_package(mut self, package: Box<dyn Package>) -> Self {
        self.packages.register(package);
        self
    }

    pub fn into_output(self) -> Box<dyn std::io::Write> {
        self.output
    }

    /// Looks a global binding up by name, as a host would after a run.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(&Token::identifier(name)).ok().map(|slot| slot.get())
    }

    pub(super) fn evaluate(&mut self, expr: &Expr) -> Result<Slot, MinikError> {
        self.visit_expr(expr)
    }

    pub(super) fn execute(&mut self, stmt: &Stmt) -> Result<Flow, MinikError> {
        self.visit_stmt(stmt)
    }

    /// Runs `stmts` in `env`, then every statement deferred against this block in
    /// reverse order, whatever way the block was left.
    pub(super) fn execute_block(&mut self, stmts: &[Stmt], env: Environment) -> Result<Flow, MinikError> {
        let previous = std::mem::replace(&mut self.env, env);
        self.deferred.push(Vec::new());

        let mut result = self.predefine(stmts).and_then(|_| self.execute_statements(stmts));

        let deferred = self.deferred.pop().unwrap_or_default();
        for stmt in deferred.iter().rev() {
            trace!("running deferred statement");
            let outcome = self.execute(stmt);
            result = match (result, outcome) {
                (Err(err), _) => Err(err),
                (_, Err(err)) => Err(err),
                (Ok(Flow::Normal), Ok(flow)) => Ok(flow),
                (Ok(flow), Ok(_)) => Ok(flow),
            };
        }

        self.env = previous;
        result
    }

    /// Executes statements in order, resolving gotos against the labels of this list.
    pub(super) fn execute_statements(&mut self, stmts: &[Stmt]) -> Result<Flow, MinikError> {
        let mut pc = 0;
        while pc < stmts.len() {
            match self.execute(&stmts[pc])? {
                Flow::Normal => pc += 1,
                Flow::Goto(label) => match find_label(stmts, &label) {
                    Some(target) => {
                        trace!(label = label.lexeme(), target, "resuming at label");
                        pc = target;
                    },
                    None => return Ok(Flow::Goto(label)),
                },
                flow => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    /// Makes the functions, classes and namespaces of a block visible before any of it runs.
    pub(super) fn predefine(&mut self, stmts: &[Stmt]) -> Result<(), MinikError> {
        for stmt in stmts {
            match stmt {
                Stmt::Function(decl) => {
                    let fun = Function::new(decl.clone(), self.env.clone(), self.declaring_namespace());
                    self.env.predefine(&decl.name, Slot::new(Value::Callable(Callable::Function(Rc::new(fun)))));
                },
                Stmt::Class(decl) => {
                    let class = Class::new(decl.clone(), self.env.clone(), self.declaring_namespace());
                    self.env.predefine(&decl.name, Slot::new(Value::Callable(Callable::Class(Rc::new(class)))));
                },
                Stmt::Namespace(name, body) => {
                    let namespace = self.open_namespace(name)?;
                    self.predefine_members(&namespace, body);
                },
                Stmt::Import(_, Import::File { stmts, .. }) => self.predefine(stmts)?,
                _ => {},
            }
        }

        Ok(())
    }

    fn predefine_members(&mut self, namespace: &Rc<Namespace>, body: &[Stmt]) {
        for stmt in body {
            match stmt {
                Stmt::Function(decl) => {
                    let fun = Function::new(decl.clone(), self.env.clone(), Some(namespace.clone()));
                    namespace.define(decl.name.lexeme(), Slot::new(Value::Callable(Callable::Function(Rc::new(fun)))));
                },
                Stmt::Class(decl) => {
                    let class = Class::new(decl.clone(), self.env.clone(), Some(namespace.clone()));
                    namespace.define(decl.name.lexeme(), Slot::new(Value::Callable(Callable::Class(Rc::new(class)))));
                },
                Stmt::Namespace(name, body) => {
                    let inner = nested_namespace(namespace, name);
                    self.predefine_members(&inner, body);
                },
                _ => {},
            }
        }
    }

    /// Finds the namespace `name` already declared in this frame, or predefines a new one.
    pub(super) fn open_namespace(&mut self, name: &Token) -> Result<Rc<Namespace>, MinikError> {
        if self.env.has(name.lexeme()) {
            if let Value::Namespace(namespace) = self.env.get(name)?.get() {
                debug!(namespace = name.lexeme(), "re-opening namespace");
                return Ok(namespace);
            }
        }

        let namespace = Rc::new(Namespace::new(name.lexeme(), Some(self.namespace.clone())));
        self.env.predefine(name, Slot::new(Value::Namespace(namespace.clone())));
        Ok(namespace)
    }

    /// Evaluates a namespace body into its fields, with the namespace as the active one.
    pub(super) fn populate_namespace(&mut self, namespace: &Rc<Namespace>, body: &[Stmt]) -> Result<(), MinikError> {
        let previous = std::mem::replace(&mut self.namespace, namespace.clone());
        let result = self.namespace_members(namespace, body);
        self.namespace = previous;
        result
    }

    fn namespace_members(&mut self, namespace: &Rc<Namespace>, body: &[Stmt]) -> Result<(), MinikError> {
        for stmt in body {
            match stmt {
                Stmt::Var(name, init) => {
                    let slot = match init {
                        Some(init) => self.evaluate(init)?.share(),
                        None => Slot::nil(),
                    };
                    namespace.define(name.lexeme(), slot);
                },
                Stmt::Function(decl) => {
                    let fun = Function::new(decl.clone(), self.env.clone(), Some(namespace.clone()));
                    namespace.define(decl.name.lexeme(), Slot::new(Value::Callable(Callable::Function(Rc::new(fun)))));
                },
                Stmt::Class(decl) => {
                    let class = Class::new(decl.clone(), self.env.clone(), Some(namespace.clone()));
                    namespace.define(decl.name.lexeme(), Slot::new(Value::Callable(Callable::Class(Rc::new(class)))));
                },
                Stmt::Namespace(name, body) => {
                    let inner = nested_namespace(namespace, name);
                    self.populate_namespace(&inner, body)?;
                },
                other => {
                    return Err(errors::runtime(
                        statement_location(other),
                        "Only declarations are allowed inside of a namespace.",
                        "Move the statement into a function of the namespace.",
                    ))
                },
            }
        }

        Ok(())
    }

    /// The namespace that functions and classes declared at this point belong to:
    /// the active one, unless that is the global namespace.
    pub(super) fn declaring_namespace(&self) -> Option<Rc<Namespace>> {
        (!Rc::ptr_eq(&self.namespace, &self.global_namespace)).then(|| self.namespace.clone())
    }

    /// Runs `f` as a call frame with `namespace` (or the global namespace) active.
    pub(super) fn call_frame<T, F>(&mut self, namespace: Option<Rc<Namespace>>, f: F) -> Result<T, MinikError>
    where
        F: FnOnce(&mut Self) -> Result<T, MinikError>,
    {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(errors::runtime(
                Loc::Native,
                "Stack overflow.",
                format!("Calls may only be nested {} deep; check for unbounded recursion.", MAX_CALL_DEPTH),
            ));
        }

        let namespace = namespace.unwrap_or_else(|| self.global_namespace.clone());
        let previous = std::mem::replace(&mut self.namespace, namespace);
        self.depth += 1;
        let result = stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || f(self));
        self.depth -= 1;
        self.namespace = previous;
        result
    }

    pub(super) fn with_env<T, F>(&mut self, env: Environment, f: F) -> Result<T, MinikError>
    where
        F: FnOnce(&mut Self) -> Result<T, MinikError>,
    {
        let previous = std::mem::replace(&mut self.env, env);
        let result = f(self);
        self.env = previous;
        result
    }

    /// Installs the registered package `name` into a fresh namespace called `alias`.
    pub(super) fn import_package(&mut self, name: &Token, alias: &Token) -> Result<(), MinikError> {
        let package = self.packages.get(name.lexeme()).ok_or_else(|| errors::runtime(
            name.location(),
            format!("Unknown package '{}'.", name.lexeme()),
            format!("The available packages are: {}.", self.packages.names().join(", ")),
        ))?;

        let namespace = Rc::new(Namespace::new(alias.lexeme(), None));
        package.install(&namespace);
        debug!(package = name.lexeme(), alias = alias.lexeme(), members = namespace.len(), "installed package");

        self.env.define(alias, Slot::new(Value::Namespace(namespace)))
    }
}

fn nested_namespace(parent: &Rc<Namespace>, name: &Token) -> Rc<Namespace> {
    if let Some(Value::Namespace(existing)) = parent.local(name.lexeme()).map(|slot| slot.get()) {
        return existing;
    }

    let namespace = Rc::new(Namespace::new(name.lexeme(), Some(parent.clone())));
    parent.define(name.lexeme(), Slot::new(Value::Namespace(namespace.clone())));
    namespace
}

fn find_label(stmts: &[Stmt], label: &Token) -> Option<usize> {
    stmts.iter().position(|stmt| matches!(stmt, Stmt::Label(name, _) if name.lexeme() == label.lexeme()))
}

fn statement_location(stmt: &Stmt) -> Loc {
    match stmt {
        Stmt::Block(loc, _) | Stmt::Break(loc, _) | Stmt::Continue(loc, _) | Stmt::Defer(loc, _)
        | Stmt::Import(loc, _) | Stmt::Return(loc, _) => *loc,
        Stmt::Class(decl) => decl.name.location(),
        Stmt::Expression(expr) | Stmt::If(expr, ..) => expr.location(),
        Stmt::For(lp) => lp.loc,
        Stmt::Function(decl) => decl.name.location(),
        Stmt::Goto(name) | Stmt::Label(name, _) | Stmt::Namespace(name, _) | Stmt::Var(name, _) => name.location(),
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        let globals = Environment::new();
        natives::install(&globals);

        let global_namespace = Namespace::global();

        Self {
            env: globals.clone(),
            globals,
            namespace: global_namespace.clone(),
            global_namespace,
            locals: Default::default(),
            deferred: Vec::new(),
            packages: PackageRegistry::builtin(),
            depth: 0,
            output: Box::new(std::io::stdout()),
        }
    }
}
