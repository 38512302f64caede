use std::rc::Rc;

use crate::{lexer::Token, Loc};

use super::Expr;

#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Token,
    pub methods: Vec<Rc<FunDecl>>,
    /// Per-instance fields, in declaration order, with their optional initializers.
    pub members: Vec<(Token, Option<Expr>)>,
}

/// Both `for` and `while` loops; a `while` has neither initializer nor increment.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub loc: Loc,
    pub initializer: Option<Box<Stmt>>,
    pub condition: Option<Expr>,
    pub increment: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Import {
    Package { name: Token, alias: Option<Token> },
    /// `stmts` stays empty until the import is expanded by a source loader.
    File { path: String, stmts: Vec<Stmt> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Loc, Vec<Stmt>),
    Break(Loc, Option<Token>),
    Class(Rc<ClassDecl>),
    Continue(Loc, Option<Token>),
    Defer(Loc, Rc<Stmt>),
    Expression(Expr),
    For(Box<Loop>),
    Function(Rc<FunDecl>),
    Goto(Token),
    If(Expr, Vec<Stmt>, Option<Vec<Stmt>>),
    Import(Loc, Import),
    Label(Token, Option<Box<Loop>>),
    Namespace(Token, Vec<Stmt>),
    Return(Loc, Option<Expr>),
    Var(Token, Option<Expr>),
}

pub trait StmtVisitor<T> {
    fn visit_stmt(&mut self, stmt: &Stmt) -> T {
        match stmt {
            Stmt::Block(loc, stmts) => self.visit_block(loc, stmts),
            Stmt::Break(loc, label) => self.visit_break(loc, label.as_ref()),
            Stmt::Class(decl) => self.visit_class(decl),
            Stmt::Continue(loc, label) => self.visit_continue(loc, label.as_ref()),
            Stmt::Defer(loc, stmt) => self.visit_defer(loc, stmt),
            Stmt::Expression(expr) => self.visit_expr_stmt(expr),
            Stmt::For(lp) => self.visit_for(lp),
            Stmt::Function(decl) => self.visit_fun_def(decl),
            Stmt::Goto(label) => self.visit_goto(label),
            Stmt::If(cond, then_branch, else_branch) => self.visit_if(cond, then_branch, else_branch.as_deref()),
            Stmt::Import(loc, import) => self.visit_import(loc, import),
            Stmt::Label(name, lp) => self.visit_label(name, lp.as_deref()),
            Stmt::Namespace(name, body) => self.visit_namespace(name, body),
            Stmt::Return(loc, expr) => self.visit_return(loc, expr.as_ref()),
            Stmt::Var(name, expr) => self.visit_var_def(name, expr.as_ref()),
        }
    }

    fn visit_block(&mut self, loc: &Loc, stmts: &[Stmt]) -> T;

    fn visit_break(&mut self, loc: &Loc, label: Option<&Token>) -> T;

    fn visit_class(&mut self, decl: &Rc<ClassDecl>) -> T;

    fn visit_continue(&mut self, loc: &Loc, label: Option<&Token>) -> T;

    fn visit_defer(&mut self, loc: &Loc, stmt: &Rc<Stmt>) -> T;

    fn visit_expr_stmt(&mut self, expr: &Expr) -> T;

    fn visit_for(&mut self, lp: &Loop) -> T;

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> T;

    fn visit_goto(&mut self, label: &Token) -> T;

    fn visit_if(&mut self, cond: &Expr, then_branch: &[Stmt], else_branch: Option<&[Stmt]>) -> T;

    fn visit_import(&mut self, loc: &Loc, import: &Import) -> T;

    fn visit_label(&mut self, name: &Token, lp: Option<&Loop>) -> T;

    fn visit_namespace(&mut self, name: &Token, body: &[Stmt]) -> T;

    fn visit_return(&mut self, loc: &Loc, expr: Option<&Expr>) -> T;

    fn visit_var_def(&mut self, name: &Token, expr: Option<&Expr>) -> T;
}
