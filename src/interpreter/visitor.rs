use std::rc::Rc;

use crate::{
    ast::{ClassDecl, Expr, ExprId, ExprVisitor, FunDecl, Import, Literal, Loop, Stmt, StmtVisitor},
    errors,
    lexer::Token,
    Loc, MinikError,
};

use super::{inter::Flow, Callable, Class, Function, Interpreter, Slot, Value};

impl Interpreter {
    /// The active namespace wins, then the resolved distance, then the globals.
    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Slot, MinikError> {
        if let Some(slot) = self.namespace.get(name.lexeme()) {
            return Ok(slot);
        }

        match self.locals.get(&id) {
            Some(distance) => self.env.get_at(*distance, name),
            None => self.globals.get(name),
        }
    }

    fn numbers(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<(f64, f64), MinikError> {
        let left = self.evaluate(left)?.get();
        let right = self.evaluate(right)?.get();
        match (left, right) {
            (Value::Number(left), Value::Number(right)) => Ok((left, right)),
            (left, right) => Err(invalid_operands(op, &left, &right)),
        }
    }

    fn run_loop(&mut self, lp: &Loop, label: Option<&Token>) -> Result<Flow, MinikError> {
        if let Some(initializer) = &lp.initializer {
            match self.execute(initializer)? {
                Flow::Normal => {},
                flow => return Ok(flow),
            }
        }

        loop {
            if let Some(condition) = &lp.condition {
                if !self.evaluate(condition)?.is_truthy() {
                    break;
                }
            }

            let body = self.env.branch();
            match self.execute_block(&lp.body, body)? {
                Flow::Normal | Flow::Continue(None) => {},
                Flow::Continue(Some(target)) if targets(label, &target) => {},
                Flow::Break(None) => break,
                Flow::Break(Some(target)) if targets(label, &target) => break,
                flow => return Ok(flow),
            }

            if let Some(increment) = &lp.increment {
                self.evaluate(increment)?;
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_loop(&mut self, lp: &Loop, label: Option<&Token>) -> Result<Flow, MinikError> {
        let env = self.env.branch();
        self.with_env(env, |interpreter| interpreter.run_loop(lp, label))
    }
}

fn targets(label: Option<&Token>, target: &Token) -> bool {
    label.map(|label| label.lexeme() == target.lexeme()).unwrap_or_default()
}

fn invalid_operands(op: &Token, left: &Value, right: &Value) -> MinikError {
    errors::runtime(
        op.location(),
        "Invalid operand to binary expression.",
        format!("The operator '{}' can't be applied to a {} and a {}.", op.lexeme(), left.type_name(), right.type_name()),
    )
}

fn index_of(index: &Value, len: usize, bracket: &Token, kind: &str) -> Result<usize, MinikError> {
    let index = match index {
        Value::Number(index) => *index,
        other => return Err(errors::runtime(
            bracket.location(),
            format!("{} indices must be numbers.", kind),
            format!("Use a number instead of a {} to index into a {}.", other.type_name(), kind.to_lowercase()),
        )),
    };

    if index < 0.0 || index >= len as f64 {
        return Err(errors::runtime(
            bracket.location(),
            format!(
                "{} index out of bounds. The index {} is outside the valid range of 0 to {}.",
                kind,
                index,
                len as i64 - 1,
            ),
            "Check the size of the value before indexing into it.",
        ));
    }

    Ok(index as usize)
}

impl ExprVisitor<Result<Slot, MinikError>> for Interpreter {
    fn visit_array(&mut self, _loc: &Loc, elements: &[Expr]) -> Result<Slot, MinikError> {
        let items = elements.iter()
            .map(|element| self.evaluate(element).map(|slot| Slot::new(slot.get())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Slot::new(Value::List(items)))
    }

    fn visit_assign(&mut self, id: ExprId, ident: &Token, value: &Expr) -> Result<Slot, MinikError> {
        let value = self.evaluate(value)?.get();
        let target = self.look_up_variable(id, ident)?;
        target.set(value);
        Ok(target)
    }

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Slot, MinikError> {
        let result = match op {
            Token::EqualEqual(_) | Token::BangEqual(_) => {
                let left = self.evaluate(left)?.get();
                let right = self.evaluate(right)?.get();
                let equal = left.equals(&right).map_err(|e| e.at(op.location()))?;
                Value::Bool(if let Token::EqualEqual(_) = op { equal } else { !equal })
            },
            Token::Plus(_) => {
                let left = self.evaluate(left)?.get();
                let right = self.evaluate(right)?.get();
                match (left, right) {
                    (Value::Number(left), Value::Number(right)) => Value::Number(left + right),
                    (Value::String(left), Value::String(right)) => Value::String(left + &right),
                    (left, right) => return Err(invalid_operands(op, &left, &right)),
                }
            },
            Token::Minus(_) => self.numbers(left, op, right).map(|(l, r)| Value::Number(l - r))?,
            Token::Star(_) => self.numbers(left, op, right).map(|(l, r)| Value::Number(l * r))?,
            Token::Slash(_) => self.numbers(left, op, right).map(|(l, r)| Value::Number(l / r))?,
            Token::Percent(_) => {
                let (l, r) = self.numbers(left, op, right)?;
                match (l as i64).checked_rem(r as i64) {
                    Some(remainder) => Value::Number(remainder as f64),
                    None => return Err(errors::runtime(
                        op.location(),
                        "Modulo by zero.",
                        "Make sure the right hand side of '%' is not between -1 and 1.",
                    )),
                }
            },
            Token::Greater(_) => self.numbers(left, op, right).map(|(l, r)| Value::Bool(l > r))?,
            Token::GreaterEqual(_) => self.numbers(left, op, right).map(|(l, r)| Value::Bool(l >= r))?,
            Token::Less(_) => self.numbers(left, op, right).map(|(l, r)| Value::Bool(l < r))?,
            Token::LessEqual(_) => self.numbers(left, op, right).map(|(l, r)| Value::Bool(l <= r))?,
            _ => return Err(errors::runtime(
                op.location(),
                format!("Unknown binary operator '{}'.", op.lexeme()),
                "This is a bug in the parser, please report it with example code.",
            )),
        };

        Ok(Slot::new(result))
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], close: &Token) -> Result<Slot, MinikError> {
        let callee = self.evaluate(callee)?.get();
        let args = args.iter()
            .map(|arg| self.evaluate(arg).map(|slot| slot.share()))
            .collect::<Result<Vec<_>, _>>()?;

        let callable = match callee {
            Value::Callable(callable) => callable,
            other => return Err(errors::runtime(
                close.location(),
                "Object is not callable.",
                format!("Only functions and classes can be called, not a {}.", other.type_name()),
            )),
        };

        if !callable.arity().accepts(args.len()) {
            return Err(errors::runtime(
                close.location(),
                format!("Expected {} arguments but got {}.", callable.arity(), args.len()),
                format!("Check the declaration of '{}'.", callable.name()),
            ));
        }

        callable.call(self, args).map_err(|e| e.at(close.location()))
    }

    fn visit_get(&mut self, obj: &Expr, property: &Token) -> Result<Slot, MinikError> {
        match self.evaluate(obj)?.get() {
            Value::Instance(instance) => instance.get(property),
            Value::Namespace(namespace) => namespace.member(property),
            other => Err(errors::runtime(
                property.location(),
                "Attempted to access property of a non-instance object.",
                format!("Only instances and namespaces have properties, not a {}.", other.type_name()),
            )),
        }
    }

    fn visit_grouping(&mut self, expr: &Expr) -> Result<Slot, MinikError> {
        self.evaluate(expr)
    }

    fn visit_literal(&mut self, _loc: &Loc, value: &Literal) -> Result<Slot, MinikError> {
        Ok(Slot::new(value.into()))
    }

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Slot, MinikError> {
        let left = self.evaluate(left)?;
        match op {
            Token::Or(_) if left.is_truthy() => Ok(left),
            Token::And(_) if !left.is_truthy() => Ok(left),
            _ => self.evaluate(right),
        }
    }

    fn visit_set(&mut self, obj: &Expr, property: &Token, value: &Expr) -> Result<Slot, MinikError> {
        let target = self.evaluate(obj)?.get();
        let value = self.evaluate(value)?;
        match target {
            Value::Instance(instance) => instance.set(property, value.get())?,
            Value::Namespace(namespace) => namespace.assign(property, value.get())?,
            other => return Err(errors::runtime(
                property.location(),
                "Attempted to access property of a non-instance object.",
                format!("Only instances and namespaces have fields, not a {}.", other.type_name()),
            )),
        }

        Ok(value)
    }

    fn visit_set_subscript(&mut self, obj: &Expr, index: &Expr, value: &Expr, bracket: &Token) -> Result<Slot, MinikError> {
        let target = self.evaluate(obj)?;
        let index = self.evaluate(index)?.get();
        let value = self.evaluate(value)?.get();

        let element = match &*target.borrow() {
            Value::List(items) => Some(items[index_of(&index, items.len(), bracket, "List")?].clone()),
            Value::String(_) => None,
            other => return Err(errors::runtime(
                bracket.location(),
                "Attempted to index a non-list or non-string type.",
                format!("A {} can't be indexed.", other.type_name()),
            )),
        };

        if let Some(element) = element {
            element.set(value);
            return Ok(target);
        }

        let text = value.to_string();
        let Some(replacement) = text.chars().next() else {
            return Err(errors::runtime(
                bracket.location(),
                "Cannot assign an empty string to a string index.",
                "Assign a string holding exactly one character.",
            ));
        };

        if let Value::String(string) = &mut *target.borrow_mut() {
            let at = index_of(&index, string.chars().count(), bracket, "String")?;
            *string = string.chars().enumerate().map(|(i, c)| if i == at { replacement } else { c }).collect();
        }

        Ok(target)
    }

    fn visit_sized_array(&mut self, loc: &Loc, size: &Expr) -> Result<Slot, MinikError> {
        let size = match self.evaluate(size)?.get() {
            Value::Number(size) if size >= 0.0 => size as usize,
            other => return Err(errors::runtime(
                *loc,
                "List size must be a non-negative number.",
                format!("Use a number like `[:10]` instead of {}.", other),
            )),
        };

        Ok(Slot::new(Value::List((0..size).map(|_| Slot::new(Value::Number(0.0))).collect())))
    }

    fn visit_subscript(&mut self, obj: &Expr, index: &Expr, bracket: &Token) -> Result<Slot, MinikError> {
        let target = self.evaluate(obj)?.get();
        let index = self.evaluate(index)?.get();

        match target {
            Value::List(items) => {
                let at = index_of(&index, items.len(), bracket, "List")?;
                Ok(items[at].clone())
            },
            Value::String(string) => {
                let at = index_of(&index, string.chars().count(), bracket, "String")?;
                let c = string.chars().nth(at).map(String::from).unwrap_or_default();
                Ok(Slot::new(Value::String(c)))
            },
            other => Err(errors::runtime(
                bracket.location(),
                "Attempted to index a non-list or non-string type.",
                format!("A {} can't be indexed.", other.type_name()),
            )),
        }
    }

    fn visit_this(&mut self, id: ExprId, loc: &Loc) -> Result<Slot, MinikError> {
        let this = Token::Identifier(*loc, "this".to_string());
        match self.locals.get(&id) {
            Some(distance) => self.env.get_at(*distance, &this),
            None => self.globals.get(&this),
        }
    }

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> Result<Slot, MinikError> {
        let operand = self.evaluate(expr)?;
        let number = operand.borrow().as_number();

        match (op, number) {
            (Token::Bang(_), _) => Ok(Slot::new(Value::Bool(!operand.is_truthy()))),
            (Token::Minus(_), Some(n)) => Ok(Slot::new(Value::Number(-n))),
            (Token::PlusPlus(_), Some(n)) => {
                operand.set(Value::Number(n + 1.0));
                Ok(operand)
            },
            (Token::MinusMinus(_), Some(n)) => {
                operand.set(Value::Number(n - 1.0));
                Ok(operand)
            },
            _ => Err(errors::runtime(
                op.location(),
                "Invalid argument type to unary expression.",
                format!("The operator '{}' expects a number, not a {}.", op.lexeme(), operand.borrow().type_name()),
            )),
        }
    }

    fn visit_var_ref(&mut self, id: ExprId, name: &Token) -> Result<Slot, MinikError> {
        self.look_up_variable(id, name)
    }
}

impl StmtVisitor<Result<Flow, MinikError>> for Interpreter {
    fn visit_block(&mut self, _loc: &Loc, stmts: &[Stmt]) -> Result<Flow, MinikError> {
        let env = self.env.branch();
        self.execute_block(stmts, env)
    }

    fn visit_break(&mut self, _loc: &Loc, label: Option<&Token>) -> Result<Flow, MinikError> {
        Ok(Flow::Break(label.cloned()))
    }

    fn visit_class(&mut self, decl: &Rc<ClassDecl>) -> Result<Flow, MinikError> {
        let class = Class::new(decl.clone(), self.env.clone(), self.declaring_namespace());
        self.env.define(&decl.name, Slot::new(Value::Callable(Callable::Class(Rc::new(class)))))?;
        Ok(Flow::Normal)
    }

    fn visit_continue(&mut self, _loc: &Loc, label: Option<&Token>) -> Result<Flow, MinikError> {
        Ok(Flow::Continue(label.cloned()))
    }

    fn visit_defer(&mut self, loc: &Loc, stmt: &Rc<Stmt>) -> Result<Flow, MinikError> {
        match self.deferred.last_mut() {
            Some(frame) => {
                frame.push(stmt.clone());
                Ok(Flow::Normal)
            },
            None => Err(errors::runtime(
                *loc,
                "'defer' can only be used inside a block.",
                "Wrap the deferred statement in a block or function body.",
            )),
        }
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Result<Flow, MinikError> {
        self.evaluate(expr)?;
        Ok(Flow::Normal)
    }

    fn visit_for(&mut self, lp: &Loop) -> Result<Flow, MinikError> {
        self.execute_loop(lp, None)
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> Result<Flow, MinikError> {
        let fun = Function::new(decl.clone(), self.env.clone(), self.declaring_namespace());
        self.env.define(&decl.name, Slot::new(Value::Callable(Callable::Function(Rc::new(fun)))))?;
        Ok(Flow::Normal)
    }

    fn visit_goto(&mut self, label: &Token) -> Result<Flow, MinikError> {
        Ok(Flow::Goto(label.clone()))
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &[Stmt], else_branch: Option<&[Stmt]>) -> Result<Flow, MinikError> {
        if self.evaluate(cond)?.is_truthy() {
            let env = self.env.branch();
            self.execute_block(then_branch, env)
        } else if let Some(else_branch) = else_branch {
            let env = self.env.branch();
            self.execute_block(else_branch, env)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn visit_import(&mut self, _loc: &Loc, import: &Import) -> Result<Flow, MinikError> {
        match import {
            Import::Package { name, alias } => {
                self.import_package(name, alias.as_ref().unwrap_or(name))?;
                Ok(Flow::Normal)
            },
            Import::File { stmts, .. } => self.execute_statements(stmts),
        }
    }

    fn visit_label(&mut self, name: &Token, lp: Option<&Loop>) -> Result<Flow, MinikError> {
        match lp {
            Some(lp) => self.execute_loop(lp, Some(name)),
            None => Ok(Flow::Normal),
        }
    }

    fn visit_namespace(&mut self, name: &Token, body: &[Stmt]) -> Result<Flow, MinikError> {
        let namespace = self.open_namespace(name)?;
        self.populate_namespace(&namespace, body)?;
        if !self.env.is_defined(name.lexeme()) {
            self.env.define(name, Slot::new(Value::Namespace(namespace)))?;
        }

        Ok(Flow::Normal)
    }

    fn visit_return(&mut self, _loc: &Loc, expr: Option<&Expr>) -> Result<Flow, MinikError> {
        let value = match expr {
            Some(expr) => self.evaluate(expr)?,
            None => Slot::nil(),
        };

        Ok(Flow::Return(value))
    }

    fn visit_var_def(&mut self, name: &Token, expr: Option<&Expr>) -> Result<Flow, MinikError> {
        let slot = match expr {
            Some(expr) => self.evaluate(expr)?.share(),
            None => Slot::nil(),
        };

        self.env.define(name, slot)?;
        Ok(Flow::Normal)
    }
}
