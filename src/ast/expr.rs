use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{lexer::Token, Loc};

/// A constant written directly in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Literal::Nil => f.write_str("nil"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => f.write_str(s),
        }
    }
}

/// Identifies a variable-use site so that the resolver's binding table can refer to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Array(Loc, Vec<Expr>),
    Assign(ExprId, Token, Box<Expr>),
    Binary(Box<Expr>, Token, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>, Token),
    Get(Box<Expr>, Token),
    Grouping(Box<Expr>),
    Literal(Loc, Literal),
    Logical(Box<Expr>, Token, Box<Expr>),
    Set(Box<Expr>, Token, Box<Expr>),
    SetSubscript(Box<Expr>, Box<Expr>, Box<Expr>, Token),
    SizedArray(Loc, Box<Expr>),
    Subscript(Box<Expr>, Box<Expr>, Token),
    This(ExprId, Loc),
    Unary(Token, Box<Expr>),
    Var(ExprId, Token),
}

impl Expr {
    pub fn location(&self) -> Loc {
        match self {
            Expr::Array(loc, _) | Expr::Literal(loc, _) | Expr::SizedArray(loc, _) | Expr::This(_, loc) => *loc,
            Expr::Assign(_, name, _) | Expr::Var(_, name) => name.location(),
            Expr::Binary(left, ..) | Expr::Logical(left, ..) => left.location(),
            Expr::Call(_, _, token) | Expr::Get(_, token) | Expr::Set(_, token, _) | Expr::Subscript(_, _, token) | Expr::SetSubscript(_, _, _, token) => token.location(),
            Expr::Grouping(expr) => expr.location(),
            Expr::Unary(op, _) => op.location(),
        }
    }
}

pub trait ExprVisitor<T> {
    fn visit_expr(&mut self, expr: &Expr) -> T {
        match expr {
            Expr::Array(loc, elements) => {
                self.visit_array(loc, elements)
            },
            Expr::Assign(id, ident, value) => {
                self.visit_assign(*id, ident, value)
            },
            Expr::Binary(left, op, right) => {
                self.visit_binary(left, op, right)
            },
            Expr::Call(callee, args, close) => {
                self.visit_call(callee, args, close)
            },
            Expr::Get(obj, name) => {
                self.visit_get(obj, name)
            },
            Expr::Grouping(expr) => {
                self.visit_grouping(expr)
            },
            Expr::Logical(left, op, right) => {
                self.visit_logical(left, op, right)
            },
            Expr::Literal(loc, value) => {
                self.visit_literal(loc, value)
            },
            Expr::Set(obj, property, value) => {
                self.visit_set(obj, property, value)
            },
            Expr::SetSubscript(obj, index, value, bracket) => {
                self.visit_set_subscript(obj, index, value, bracket)
            },
            Expr::SizedArray(loc, size) => {
                self.visit_sized_array(loc, size)
            },
            Expr::Subscript(obj, index, bracket) => {
                self.visit_subscript(obj, index, bracket)
            },
            Expr::This(id, loc) => {
                self.visit_this(*id, loc)
            },
            Expr::Unary(op, expr) => {
                self.visit_unary(op, expr)
            },
            Expr::Var(id, name) => {
                self.visit_var_ref(*id, name)
            }
        }
    }

    fn visit_array(&mut self, loc: &Loc, elements: &[Expr]) -> T;

    fn visit_assign(&mut self, id: ExprId, ident: &Token, value: &Expr) -> T;

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> T;

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], close: &Token) -> T;

    fn visit_get(&mut self, obj: &Expr, property: &Token) -> T;

    fn visit_grouping(&mut self, expr: &Expr) -> T;

    fn visit_literal(&mut self, loc: &Loc, value: &Literal) -> T;

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> T;

    fn visit_set(&mut self, obj: &Expr, property: &Token, value: &Expr) -> T;

    fn visit_set_subscript(&mut self, obj: &Expr, index: &Expr, value: &Expr, bracket: &Token) -> T;

    fn visit_sized_array(&mut self, loc: &Loc, size: &Expr) -> T;

    fn visit_subscript(&mut self, obj: &Expr, index: &Expr, bracket: &Token) -> T;

    fn visit_this(&mut self, id: ExprId, loc: &Loc) -> T;

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> T;

    fn visit_var_ref(&mut self, id: ExprId, name: &Token) -> T;
}
