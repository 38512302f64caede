use std::rc::Rc;

use fnv::FnvHashMap;

use crate::{
    ast::{ClassDecl, Expr, ExprId, ExprVisitor, FunDecl, Import, Literal, Loop, Stmt, StmtVisitor},
    errors,
    lexer::Token,
    Loc, MinikError,
};

/// Maps each resolved variable-use site to the number of scopes between it and its definition.
pub type Bindings = FnvHashMap<ExprId, usize>;

/// The binding table of one program, split by how long its entries stay useful.
#[derive(Debug, Default)]
pub struct Resolution {
    pub bindings: Bindings,
    /// Use sites outside every function and class body. Nothing can run them again
    /// once the program has finished.
    pub transient: Vec<ExprId>,
}

#[derive(Debug, PartialEq, Copy, Clone)]
enum Symbol {
    Declared,
    Defined,
    Namespace,
    Label,
}

#[derive(Debug, PartialEq, Copy, Clone)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, PartialEq, Copy, Clone)]
enum ClassType {
    None,
    Class,
}

/// The static pass run before execution.
///
/// The bottom scope stands for the globals: names found there are left unbound and
/// are looked up by name at run time, which keeps state shared between successive runs.
#[derive(Debug)]
pub struct Resolver {
    scopes: Vec<FnvHashMap<String, Symbol>>,
    bindings: Bindings,
    transient: Vec<ExprId>,
    /// How many function or class bodies enclose the current node.
    bodies: usize,
    loops: usize,
    /// Labels naming the loops which enclose the current statement.
    loop_labels: Vec<String>,
    blocks: usize,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            scopes: vec![FnvHashMap::default()],
            bindings: Bindings::default(),
            transient: Vec::new(),
            bodies: 0,
            loops: 0,
            loop_labels: Vec::new(),
            blocks: 0,
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }
}

impl Resolver {
    pub fn resolve(mut self, stmts: &[Stmt]) -> (Resolution, Vec<MinikError>) {
        let errs = self.resolve_statements(stmts);
        (Resolution { bindings: self.bindings, transient: self.transient }, errs)
    }

    fn declare(&mut self, name: &Token, state: Symbol) -> Option<MinikError> {
        let scope = self.scopes.last_mut()?;

        let err = scope.contains_key(name.lexeme()).then(|| errors::resolve(
            name.location(),
            format!("Variable with name '{}' already exists in this scope.", name.lexeme()),
            "Pick a different name, or remove one of the declarations.",
        ));

        scope.insert(name.lexeme().to_string(), state);
        err
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Symbol::Defined);
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (distance, scope) in self.scopes.iter().skip(1).rev().enumerate() {
            match scope.get(name) {
                None | Some(Symbol::Label) => continue,
                Some(_) => {
                    self.bindings.insert(id, distance);
                    if self.bodies == 0 {
                        self.transient.push(id);
                    }
                    return;
                }
            }
        }
    }

    fn with_scope<F: FnOnce(&mut Self) -> Vec<MinikError>>(&mut self, f: F) -> Vec<MinikError> {
        self.scopes.push(FnvHashMap::default());
        let errs = f(self);
        self.scopes.pop();
        errs
    }

    /// Declares the functions, classes and namespaces of a statement list up front so that
    /// they can be referenced before their declaration.
    fn hoist(&mut self, stmts: &[Stmt]) -> Vec<MinikError> {
        let mut errs = Vec::new();

        for stmt in stmts {
            match stmt {
                Stmt::Function(decl) => errs.extend(self.declare(&decl.name, Symbol::Defined)),
                Stmt::Class(decl) => errs.extend(self.declare(&decl.name, Symbol::Defined)),
                Stmt::Namespace(name, _) => {
                    let reopened = self.scopes.last().and_then(|s| s.get(name.lexeme())) == Some(&Symbol::Namespace);
                    if !reopened {
                        errs.extend(self.declare(name, Symbol::Namespace));
                    }
                },
                Stmt::Import(_, Import::File { stmts, .. }) => errs.append(&mut self.hoist(stmts)),
                _ => {}
            }
        }

        errs
    }

    fn resolve_statements(&mut self, stmts: &[Stmt]) -> Vec<MinikError> {
        let mut errs = self.hoist(stmts);
        for stmt in stmts {
            errs.append(&mut self.visit_stmt(stmt));
        }

        errs
    }

    fn resolve_block(&mut self, stmts: &[Stmt]) -> Vec<MinikError> {
        self.blocks += 1;
        let errs = self.with_scope(|this| this.resolve_statements(stmts));
        self.blocks -= 1;
        errs
    }

    fn resolve_function(&mut self, decl: &FunDecl, kind: FunctionType) -> Vec<MinikError> {
        let enclosing_function = std::mem::replace(&mut self.current_function, kind);
        let enclosing_loops = std::mem::take(&mut self.loops);
        let enclosing_labels = std::mem::take(&mut self.loop_labels);
        let enclosing_blocks = std::mem::replace(&mut self.blocks, 1);
        self.bodies += 1;

        let errs = self.with_scope(|this| {
            let mut errs: Vec<MinikError> = decl.params
                .iter()
                .filter_map(|param| this.declare(param, Symbol::Defined))
                .collect();

            errs.append(&mut this.resolve_statements(&decl.body));
            errs
        });

        self.bodies -= 1;
        self.blocks = enclosing_blocks;
        self.loop_labels = enclosing_labels;
        self.loops = enclosing_loops;
        self.current_function = enclosing_function;
        errs
    }

    fn resolve_class(&mut self, decl: &ClassDecl) -> Vec<MinikError> {
        self.bodies += 1;

        // Member initializers run in the scope the class is declared in.
        let mut errs: Vec<MinikError> = decl.members
            .iter()
            .filter_map(|(_, init)| init.as_ref())
            .flat_map(|init| self.visit_expr(init))
            .collect();

        let enclosing_class = std::mem::replace(&mut self.current_class, ClassType::Class);

        errs.append(&mut self.with_scope(|this| {
            let mut errs = Vec::new();

            this.define("this");
            for (member, _) in &decl.members {
                errs.extend(this.declare(member, Symbol::Defined));
            }

            for method in &decl.methods {
                let kind = if method.name.lexeme() == decl.name.lexeme() {
                    FunctionType::Initializer
                } else {
                    FunctionType::Method
                };

                errs.append(&mut this.resolve_function(method, kind));
            }

            errs
        }));

        self.current_class = enclosing_class;
        self.bodies -= 1;
        errs
    }

    fn resolve_loop(&mut self, lp: &Loop) -> Vec<MinikError> {
        self.loops += 1;

        let errs = self.with_scope(|this| {
            let mut errs = Vec::new();

            if let Some(init) = &lp.initializer {
                errs.append(&mut this.visit_stmt(init));
            }

            if let Some(cond) = &lp.condition {
                errs.append(&mut this.visit_expr(cond));
            }

            if let Some(incr) = &lp.increment {
                errs.append(&mut this.visit_expr(incr));
            }

            errs.append(&mut this.resolve_block(&lp.body));
            errs
        });

        self.loops -= 1;
        errs
    }

    fn check_jump(&self, keyword: &str, loc: &Loc, label: Option<&Token>) -> Vec<MinikError> {
        let mut errs = Vec::new();

        if self.loops == 0 {
            errs.push(errors::resolve(
                *loc,
                format!("Invalid '{0}' statement: '{0}' can only be used inside a loop.", keyword),
                format!("Move the `{}` into the body of a `for` or `while` loop.", keyword),
            ));
        }

        if let Some(label) = label {
            if !self.loop_labels.iter().any(|name| name == label.lexeme()) {
                errs.push(errors::resolve(
                    label.location(),
                    format!("Invalid '{}' label: The label '{}' does not name an enclosing loop.", keyword, label.lexeme()),
                    "Name a loop with `label name for (...) { ... }` before jumping out of it.",
                ));
            }
        }

        errs
    }
}

impl ExprVisitor<Vec<MinikError>> for Resolver {
    fn visit_array(&mut self, _loc: &Loc, elements: &[Expr]) -> Vec<MinikError> {
        elements.iter().flat_map(|element| self.visit_expr(element)).collect()
    }

    fn visit_assign(&mut self, id: ExprId, ident: &Token, value: &Expr) -> Vec<MinikError> {
        let errs = self.visit_expr(value);
        self.resolve_local(id, ident.lexeme());
        errs
    }

    fn visit_binary(&mut self, left: &Expr, _op: &Token, right: &Expr) -> Vec<MinikError> {
        vec![
            self.visit_expr(left),
            self.visit_expr(right),
        ].into_iter().flatten().collect()
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], _close: &Token) -> Vec<MinikError> {
        vec![
            self.visit_expr(callee),
            args.iter().flat_map(|arg| self.visit_expr(arg)).collect(),
        ].into_iter().flatten().collect()
    }

    fn visit_get(&mut self, object: &Expr, _property: &Token) -> Vec<MinikError> {
        self.visit_expr(object)
    }

    fn visit_grouping(&mut self, expr: &Expr) -> Vec<MinikError> {
        self.visit_expr(expr)
    }

    fn visit_literal(&mut self, _loc: &Loc, _value: &Literal) -> Vec<MinikError> {
        Vec::new()
    }

    fn visit_logical(&mut self, left: &Expr, _op: &Token, right: &Expr) -> Vec<MinikError> {
        vec![
            self.visit_expr(left),
            self.visit_expr(right)
        ].into_iter().flatten().collect()
    }

    fn visit_set(&mut self, object: &Expr, _property: &Token, value: &Expr) -> Vec<MinikError> {
        vec![
            self.visit_expr(value),
            self.visit_expr(object),
        ].into_iter().flatten().collect()
    }

    fn visit_set_subscript(&mut self, object: &Expr, index: &Expr, value: &Expr, _bracket: &Token) -> Vec<MinikError> {
        vec![
            self.visit_expr(object),
            self.visit_expr(index),
            self.visit_expr(value),
        ].into_iter().flatten().collect()
    }

    fn visit_sized_array(&mut self, _loc: &Loc, size: &Expr) -> Vec<MinikError> {
        self.visit_expr(size)
    }

    fn visit_subscript(&mut self, object: &Expr, index: &Expr, _bracket: &Token) -> Vec<MinikError> {
        vec![
            self.visit_expr(object),
            self.visit_expr(index),
        ].into_iter().flatten().collect()
    }

    fn visit_this(&mut self, id: ExprId, loc: &Loc) -> Vec<MinikError> {
        if self.current_class == ClassType::None {
            return vec![errors::resolve(
                *loc,
                "Cannot use 'this' outside of a class.",
                "You can only access `this` within a class method.",
            )];
        }

        self.resolve_local(id, "this");
        Vec::new()
    }

    fn visit_unary(&mut self, _op: &Token, expr: &Expr) -> Vec<MinikError> {
        self.visit_expr(expr)
    }

    fn visit_var_ref(&mut self, id: ExprId, name: &Token) -> Vec<MinikError> {
        if self.scopes.last().and_then(|s| s.get(name.lexeme())) == Some(&Symbol::Declared) {
            return vec![errors::resolve(
                name.location(),
                format!("Cannot read local variable '{}' in its own initializer.", name.lexeme()),
                "Make sure you are not masking a variable with the same name and try using a different name for this variable if you are.",
            )];
        }

        self.resolve_local(id, name.lexeme());
        Vec::new()
    }
}

impl StmtVisitor<Vec<MinikError>> for Resolver {
    fn visit_block(&mut self, _loc: &Loc, stmts: &[Stmt]) -> Vec<MinikError> {
        self.resolve_block(stmts)
    }

    fn visit_break(&mut self, loc: &Loc, label: Option<&Token>) -> Vec<MinikError> {
        self.check_jump("break", loc, label)
    }

    fn visit_class(&mut self, decl: &Rc<ClassDecl>) -> Vec<MinikError> {
        self.resolve_class(decl)
    }

    fn visit_continue(&mut self, loc: &Loc, label: Option<&Token>) -> Vec<MinikError> {
        self.check_jump("continue", loc, label)
    }

    fn visit_defer(&mut self, loc: &Loc, stmt: &Rc<Stmt>) -> Vec<MinikError> {
        if self.blocks == 0 {
            return vec![errors::resolve(
                *loc,
                "'defer' can only be used inside a block.",
                "Move the `defer` into a function body or a `{ ... }` block.",
            )];
        }

        self.visit_stmt(stmt)
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Vec<MinikError> {
        self.visit_expr(expr)
    }

    fn visit_for(&mut self, lp: &Loop) -> Vec<MinikError> {
        self.resolve_loop(lp)
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> Vec<MinikError> {
        self.resolve_function(decl, FunctionType::Function)
    }

    fn visit_goto(&mut self, _label: &Token) -> Vec<MinikError> {
        Vec::new()
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &[Stmt], else_branch: Option<&[Stmt]>) -> Vec<MinikError> {
        let mut errs = self.visit_expr(cond);
        errs.append(&mut self.resolve_block(then_branch));
        if let Some(else_branch) = else_branch {
            errs.append(&mut self.resolve_block(else_branch));
        }

        errs
    }

    fn visit_import(&mut self, loc: &Loc, import: &Import) -> Vec<MinikError> {
        match import {
            Import::Package { name, alias } => self.declare(alias.as_ref().unwrap_or(name), Symbol::Defined).into_iter().collect(),
            Import::File { path, stmts } => {
                if self.scopes.len() > 1 || self.blocks > 0 || self.current_function != FunctionType::None {
                    return vec![errors::resolve(
                        *loc,
                        format!("Cannot import the file '{}' here: file imports are only allowed at the top level of a program.", path),
                        "Move the `import` to the top level of your program.",
                    )];
                }

                // Names declared by the file were hoisted alongside the importing program's.
                stmts.iter().flat_map(|stmt| self.visit_stmt(stmt)).collect()
            }
        }
    }

    fn visit_label(&mut self, name: &Token, lp: Option<&Loop>) -> Vec<MinikError> {
        let mut errs: Vec<MinikError> = self.declare(name, Symbol::Label).into_iter().collect();

        if let Some(lp) = lp {
            self.loop_labels.push(name.lexeme().to_string());
            errs.append(&mut self.resolve_loop(lp));
            self.loop_labels.pop();
        }

        errs
    }

    fn visit_namespace(&mut self, name: &Token, body: &[Stmt]) -> Vec<MinikError> {
        let mut errs = Vec::new();

        for stmt in body {
            match stmt {
                Stmt::Var(_, Some(init)) => errs.append(&mut self.visit_expr(init)),
                Stmt::Var(_, None) => {},
                Stmt::Function(decl) => errs.append(&mut self.resolve_function(decl, FunctionType::Function)),
                Stmt::Class(decl) => errs.append(&mut self.resolve_class(decl)),
                Stmt::Namespace(inner, body) => errs.append(&mut self.visit_namespace(inner, body)),
                _ => errs.push(errors::resolve(
                    name.location(),
                    format!("Only declarations are allowed inside of the namespace '{}'.", name.lexeme()),
                    "Move the statement into a function of the namespace.",
                )),
            }
        }

        errs
    }

    fn visit_return(&mut self, loc: &Loc, expr: Option<&Expr>) -> Vec<MinikError> {
        let mut errs = Vec::new();

        if self.current_function == FunctionType::None {
            errs.push(errors::resolve(
                *loc,
                "Cannot return from outside of functions.",
                "Remove the `return`, or move it into a function body.",
            ));
        }

        if let Some(expr) = expr {
            errs.append(&mut self.visit_expr(expr));
        }

        errs
    }

    fn visit_var_def(&mut self, name: &Token, expr: Option<&Expr>) -> Vec<MinikError> {
        let mut errs: Vec<MinikError> = self.declare(name, Symbol::Declared).into_iter().collect();

        if let Some(expr) = expr {
            errs.append(&mut self.visit_expr(expr));
        }

        self.define(name.lexeme());
        errs
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Stmt;

    use super::*;

    fn resolve(source: &str) -> (Vec<Stmt>, Bindings, Vec<MinikError>) {
        let (stmts, errs) = crate::parse(source);
        assert!(errs.is_empty(), "the source should parse: {:?}", errs);

        let (resolution, errs) = Resolver::default().resolve(&stmts);
        (stmts, resolution.bindings, errs)
    }

    fn assert_resolves(source: &str) {
        let (_, _, errs) = resolve(source);
        assert!(errs.is_empty(), "expected no resolve errors, got {:?}", errs);
    }

    fn assert_rejects(source: &str, message: &str) {
        let (_, _, errs) = resolve(source);
        assert!(
            errs.iter().any(|e| e.is_resolve() && e.description().contains(message)),
            "expected an error containing '{}', got {:?}", message, errs
        );
    }

    #[test]
    fn globals_are_left_unbound() {
        let (_, bindings, errs) = resolve("x := 1; print(x);");
        assert!(errs.is_empty());
        assert!(bindings.is_empty());
    }

    #[test]
    fn locals_record_their_distance() {
        let (stmts, bindings, errs) = resolve("{ x := 1; { print(x); } }");
        assert!(errs.is_empty());

        let Stmt::Block(_, outer) = &stmts[0] else { panic!("expected a block") };
        let Stmt::Block(_, inner) = &outer[1] else { panic!("expected a block") };
        let Stmt::Expression(Expr::Call(_, args, _)) = &inner[0] else { panic!("expected a call") };
        let Expr::Var(id, _) = &args[0] else { panic!("expected a variable") };

        assert_eq!(bindings.get(id), Some(&1));
    }

    #[test]
    fn shadowing_resolves_to_the_inner_variable() {
        let (stmts, bindings, _) = resolve("{ x := 1; { x := 2; x; } }");

        let Stmt::Block(_, outer) = &stmts[0] else { panic!("expected a block") };
        let Stmt::Block(_, inner) = &outer[1] else { panic!("expected a block") };
        let Stmt::Expression(Expr::Var(id, _)) = &inner[1] else { panic!("expected a variable") };

        assert_eq!(bindings.get(id), Some(&0));
    }

    #[test]
    fn forward_references_inside_blocks() {
        assert_resolves("{ a:() { return b(); } b:() { return 1; } a(); }");
    }

    #[test]
    fn self_referencing_initializer() {
        assert_rejects("{ x := 1; { x := x + 1; } }", "in its own initializer");
    }

    #[test]
    fn duplicate_declarations() {
        assert_rejects("{ x := 1; x := 2; }", "already exists in this scope");
        assert_rejects("f:(a, a) {}", "already exists in this scope");
    }

    #[test]
    fn namespaces_may_be_reopened() {
        assert_resolves("namespace ns { a := 1; } namespace ns { b := 2; }");
    }

    #[test]
    fn return_placement() {
        assert_rejects("return 1;", "Cannot return from outside of functions.");
        assert_resolves("f:() { return 1; }");
        assert_resolves("class A { A:() { return; } }");
    }

    #[test]
    fn this_placement() {
        assert_rejects("print(this);", "Cannot use 'this' outside of a class.");
        assert_resolves("class A { x:; get:() { return this.x; } }");
    }

    #[test]
    fn break_and_continue_placement() {
        assert_rejects("break;", "'break' can only be used inside a loop");
        assert_rejects("continue;", "'continue' can only be used inside a loop");
        assert_rejects("while (true) { break nowhere; }", "The label 'nowhere' does not name an enclosing loop");
        assert_rejects("label done; while (true) { break done; }", "The label 'done' does not name an enclosing loop");
        assert_rejects("label first for (;;) { break first; } while (true) { continue first; }", "does not name an enclosing loop");
        assert_rejects("label outer for (;;) { f:() { while (true) { break outer; } } }", "does not name an enclosing loop");
        assert_rejects("while (true) { f:() { break; } }", "'break' can only be used inside a loop");
        assert_resolves("label outer for (;;) { while (true) { break outer; } }");
    }

    #[test]
    fn defer_placement() {
        assert_rejects("defer print(1);", "'defer' can only be used inside a block.");
        assert_resolves("{ defer print(1); }");
        assert_resolves("f:() { defer print(1); }");
    }

    #[test]
    fn duplicate_labels() {
        assert_rejects("{ label a; label a; }", "already exists in this scope");
    }

    #[test]
    fn only_bindings_outside_bodies_are_transient() {
        let (stmts, errs) = crate::parse("{ x := 1; print(x); } f:() { y := 2; return y; } class C { n := 0; get:() { return n; } }");
        assert!(errs.is_empty());

        let (resolution, errs) = Resolver::default().resolve(&stmts);
        assert!(errs.is_empty());
        assert_eq!(resolution.bindings.len(), 3);
        assert_eq!(resolution.transient.len(), 1);

        let Stmt::Block(_, block) = &stmts[0] else { panic!("expected a block") };
        let Stmt::Expression(Expr::Call(_, args, _)) = &block[1] else { panic!("expected a call") };
        let Expr::Var(id, _) = &args[0] else { panic!("expected a variable") };
        assert_eq!(resolution.transient, vec![*id]);
    }

    #[test]
    fn namespace_bodies_only_hold_declarations() {
        let loc = Loc::new(1);
        let body = vec![
            Stmt::Var(Token::Identifier(loc, "a".to_string()), None),
            Stmt::Expression(Expr::Literal(loc, Literal::Nil)),
        ];
        let stmts = vec![Stmt::Namespace(Token::Identifier(loc, "ns".to_string()), body)];

        let (_, errs) = Resolver::default().resolve(&stmts);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].is_resolve());
        assert_eq!(errs[0].description(), "Only declarations are allowed inside of the namespace 'ns'.");
    }

    #[test]
    fn methods_see_members() {
        let (stmts, bindings, errs) = resolve("class Counter { count:=0; inc:() { count = count + 1; } }");
        assert!(errs.is_empty());

        let Stmt::Class(decl) = &stmts[0] else { panic!("expected a class") };
        let Stmt::Expression(Expr::Assign(id, _, _)) = &decl.methods[0].body[0] else { panic!("expected an assignment") };

        assert_eq!(bindings.get(id), Some(&1));
    }
}
