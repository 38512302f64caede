mod expr;
mod parser;
pub mod printer;
mod stmt;

pub use expr::{Expr, ExprId, ExprVisitor, Literal};
pub use parser::Parser;
pub use stmt::{ClassDecl, FunDecl, Import, Loop, Stmt, StmtVisitor};
