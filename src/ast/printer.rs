use std::rc::Rc;

use crate::{lexer::Token, Loc};

use super::{ClassDecl, Expr, ExprId, ExprVisitor, FunDecl, Import, Literal, Loop, Stmt, StmtVisitor};

/// Renders syntax trees as S-expressions.
pub struct AstPrinter{}

impl AstPrinter {
    fn list(&mut self, head: &str, exprs: &[Expr]) -> String {
        let mut s = format!("({}", head);
        for expr in exprs {
            s.push(' ');
            s.push_str(&self.visit_expr(expr));
        }
        s.push(')');
        s
    }

    fn function(&mut self, decl: &FunDecl) -> String {
        let mut result = String::new();
        result.push_str("(fun ");
        result.push_str(decl.name.lexeme());
        for param in &decl.params {
            result.push(' ');
            result.push_str(param.lexeme());
        }
        result.push(' ');
        result.push_str(&self.visit_block(&Loc::Native, &decl.body));
        result.push(')');
        result
    }

    fn jump(&mut self, keyword: &str, label: Option<&Token>) -> String {
        match label {
            Some(label) => format!("({} {})", keyword, label.lexeme()),
            None => format!("({})", keyword),
        }
    }
}

impl ExprVisitor<String> for AstPrinter {
    fn visit_array(&mut self, _loc: &Loc, elements: &[Expr]) -> String {
        self.list("list", elements)
    }

    fn visit_assign(&mut self, _id: ExprId, ident: &Token, value: &Expr) -> String {
        format!("(= {} {})", ident.lexeme(), self.visit_expr(value))
    }

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> String {
        format!("({} {} {})", op.lexeme(), self.visit_expr(left), self.visit_expr(right))
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], _close: &Token) -> String {
        let head = format!("call {}", self.visit_expr(callee));
        self.list(&head, args)
    }

    fn visit_get(&mut self, obj: &Expr, name: &Token) -> String {
        format!("{}.{}", self.visit_expr(obj), name.lexeme())
    }

    fn visit_grouping(&mut self, expr: &Expr) -> String {
        format!("(group {})", self.visit_expr(expr))
    }

    fn visit_literal(&mut self, _loc: &Loc, value: &Literal) -> String {
        match value {
            Literal::String(string) => format!("\"{}\"", string),
            other => other.to_string(),
        }
    }

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> String {
        format!("({} {} {})", op.lexeme(), self.visit_expr(left), self.visit_expr(right))
    }

    fn visit_set(&mut self, obj: &Expr, name: &Token, value: &Expr) -> String {
        format!("(set {}.{} {})", self.visit_expr(obj), name.lexeme(), self.visit_expr(value))
    }

    fn visit_set_subscript(&mut self, obj: &Expr, index: &Expr, value: &Expr, _bracket: &Token) -> String {
        format!("(set-index {} {} {})", self.visit_expr(obj), self.visit_expr(index), self.visit_expr(value))
    }

    fn visit_sized_array(&mut self, _loc: &Loc, size: &Expr) -> String {
        format!("(list-of {})", self.visit_expr(size))
    }

    fn visit_subscript(&mut self, obj: &Expr, index: &Expr, _bracket: &Token) -> String {
        format!("(index {} {})", self.visit_expr(obj), self.visit_expr(index))
    }

    fn visit_this(&mut self, _id: ExprId, _loc: &Loc) -> String {
        "this".to_string()
    }

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> String {
        format!("({} {})", op.lexeme(), self.visit_expr(expr))
    }

    fn visit_var_ref(&mut self, _id: ExprId, name: &Token) -> String {
        name.lexeme().to_string()
    }
}

impl StmtVisitor<String> for AstPrinter {
    fn visit_block(&mut self, _loc: &Loc, stmts: &[Stmt]) -> String {
        let mut result = String::new();
        result.push_str("(block");
        for stmt in stmts {
            result.push(' ');
            result.push_str(&self.visit_stmt(stmt));
        }
        result.push(')');
        result
    }

    fn visit_break(&mut self, _loc: &Loc, label: Option<&Token>) -> String {
        self.jump("break", label)
    }

    fn visit_class(&mut self, decl: &Rc<ClassDecl>) -> String {
        let mut result = String::new();
        result.push_str("(class ");
        result.push_str(decl.name.lexeme());
        for (member, init) in &decl.members {
            result.push_str(" (member ");
            result.push_str(member.lexeme());
            if let Some(init) = init {
                result.push(' ');
                result.push_str(&self.visit_expr(init));
            }
            result.push(')');
        }
        for method in &decl.methods {
            result.push(' ');
            result.push_str(&self.function(method));
        }
        result.push(')');
        result
    }

    fn visit_continue(&mut self, _loc: &Loc, label: Option<&Token>) -> String {
        self.jump("continue", label)
    }

    fn visit_defer(&mut self, _loc: &Loc, stmt: &Rc<Stmt>) -> String {
        format!("(defer {})", self.visit_stmt(stmt))
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> String {
        format!("({})", self.visit_expr(expr))
    }

    fn visit_for(&mut self, lp: &Loop) -> String {
        let init = lp.initializer.as_ref().map(|init| self.visit_stmt(init)).unwrap_or_default();
        let cond = lp.condition.as_ref().map(|cond| self.visit_expr(cond)).unwrap_or_default();
        let incr = lp.increment.as_ref().map(|incr| format!("{} ", self.visit_expr(incr))).unwrap_or_default();
        let body = self.visit_block(&lp.loc, &lp.body);

        format!("(for {}; {}; {}{})", init, cond, incr, body)
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> String {
        self.function(decl)
    }

    fn visit_goto(&mut self, label: &Token) -> String {
        format!("(goto {})", label.lexeme())
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &[Stmt], else_branch: Option<&[Stmt]>) -> String {
        let mut result = String::new();
        result.push_str("(if ");
        result.push_str(&self.visit_expr(cond));
        result.push(' ');
        result.push_str(&self.visit_block(&Loc::Native, then_branch));
        if let Some(else_branch) = else_branch {
            result.push(' ');
            result.push_str(&self.visit_block(&Loc::Native, else_branch));
        }
        result.push(')');
        result
    }

    fn visit_import(&mut self, _loc: &Loc, import: &Import) -> String {
        match import {
            Import::Package { name, alias: Some(alias) } => format!("(import {} {})", name.lexeme(), alias.lexeme()),
            Import::Package { name, alias: None } => format!("(import {})", name.lexeme()),
            Import::File { path, .. } => format!("(import \"{}\")", path),
        }
    }

    fn visit_label(&mut self, name: &Token, lp: Option<&Loop>) -> String {
        match lp {
            Some(lp) => format!("(label {} {})", name.lexeme(), self.visit_for(lp)),
            None => format!("(label {})", name.lexeme()),
        }
    }

    fn visit_namespace(&mut self, name: &Token, body: &[Stmt]) -> String {
        let mut result = format!("(namespace {}", name.lexeme());
        for stmt in body {
            result.push(' ');
            result.push_str(&self.visit_stmt(stmt));
        }
        result.push(')');
        result
    }

    fn visit_return(&mut self, _loc: &Loc, expr: Option<&Expr>) -> String {
        let mut result = String::new();
        result.push_str("(return");
        if let Some(expr) = expr {
            result.push(' ');
            result.push_str(&self.visit_expr(expr));
        }
        result.push(')');
        result
    }

    fn visit_var_def(&mut self, name: &Token, expr: Option<&Expr>) -> String {
        match expr {
            Some(expr) => format!("(var {} {})", name.lexeme(), self.visit_expr(expr)),
            None => format!("(var {})", name.lexeme()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{lexer::Token, Loc};

    use super::*;

    #[test]
    fn test_ast_printer() {
        let loc = Loc::new(1);
        let expr = Expr::Binary(
            Box::new(Expr::Unary(Token::Minus(loc), Box::new(Expr::Literal(loc, Literal::Number(123.))))),
            Token::Star(loc),
            Box::new(Expr::Grouping(Box::new(Expr::Literal(loc, Literal::Number(45.67))))),
        );

        let mut printer = AstPrinter{};
        let result = printer.visit_expr(&expr);
        assert_eq!(result, "(* (- 123) (group 45.67))");
    }
}
