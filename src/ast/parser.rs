use std::{iter::Peekable, rc::Rc};

use crate::{errors, lexer::Token, Loc, MinikError};

use super::{ClassDecl, Expr, ExprId, FunDecl, Import, Literal, Loop, Stmt};

pub struct Parser;

// Macros which make it easier to implement certain common parts of the parser.
macro_rules! rd_term {
    ($name:ident := $token_id:ident => $ret:ty : $body:expr) => {
        fn $name<T: Iterator<Item = Token>>(
            $token_id: &mut Peekable<T>,
        ) -> Result<$ret, MinikError> {
            $body
        }
    };

    ($name:ident := $left:ident ( $($token:ident)|+ ) => binary) => {
        rd_term!($name := tokens => Expr : {
            let mut left = Self::$left(tokens)?;

            while let Some(op) = rd_matches!(tokens, $($token)|+) {
                let right = Self::$left(tokens)?;
                left = Expr::Binary(Box::new(left), op, Box::new(right));
            }

            Ok(left)
        });
    };

    ($name:ident := $left:ident ( $($token:ident)|+ ) => logical) => {
        rd_term!($name := tokens => Expr : {
            let mut left = Self::$left(tokens)?;

            while let Some(op) = rd_matches!(tokens, $($token)|+) {
                let right = Self::$left(tokens)?;
                left = Expr::Logical(Box::new(left), op, Box::new(right));
            }

            Ok(left)
        });
    };

    ($name:ident := ($($token:ident)|+) | $fallback:ident => unary) => {
        rd_term!($name := tokens => Expr : {
            match rd_matches!(tokens, $($token)|+) {
                Some(op) => {
                    let right = Self::$name(tokens)?;
                    Ok(Expr::Unary(op, Box::new(right)))
                },
                None => Self::$fallback(tokens),
            }
        });
    };
}

macro_rules! rd_matches {
    ($tokens:ident, $($token:ident)|+) => {
        $tokens.next_if(|t| matches!(t, $(Token::$token(..))|+))
    };
}

macro_rules! rd_consume {
    ($tokens:ident, $($id:ident@$token:ident)|+ => $ok:expr, $msg:expr, $advice:expr) => {
        match $tokens.next() {
            Some($($id@Token::$token(..))|+) => $ok,
            Some(other) => return Err(errors::language(
                other.location(),
                format!("{}, but got {} instead.", $msg, other),
                $advice
            )),
            None => return Err(errors::language(
                Loc::Native,
                format!("{}, but reached the end of the file instead.", $msg),
                $advice
            )),
        }
    };

    ($tokens:ident, $($token:ident)|+ => $ok:expr, $msg:expr, $advice:expr) => {
        match $tokens.next() {
            Some($(Token::$token(..))|+) => $ok,
            Some(other) => return Err(errors::language(
                other.location(),
                format!("{}, but got {} instead.", $msg, other),
                $advice
            )),
            None => return Err(errors::language(
                Loc::Native,
                format!("{}, but reached the end of the file instead.", $msg),
                $advice
            )),
        }
    };

    ($tokens:ident, $($token:ident)|+, $msg:expr, $advice:expr) => {
        rd_consume!($tokens, $($token)|+ => {}, $msg, $advice)
    };
}

impl Parser {
    pub fn parse<T: Iterator<Item = Token>>(
        tokens: &mut T,
    ) -> (Vec<Stmt>, Vec<MinikError>) {
        let mut tokens = tokens.peekable();
        let mut stmts = Vec::new();
        let mut errs = Vec::new();

        while tokens.peek().is_some() {
            match Self::declaration(&mut tokens) {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    Self::synchronize(&mut tokens);
                    errs.push(err);
                },
            }
        }

        (stmts, errs)
    }

    pub fn parse_expr<T: Iterator<Item = Token>>(
        tokens: &mut T,
    ) -> Result<Expr, MinikError> {
        let mut tokens = tokens.peekable();
        Self::expression(&mut tokens)
    }

    rd_term!(declaration := tokens => Stmt : {
        match tokens.peek() {
            Some(Token::Class(_)) => Self::class_declaration(tokens),
            Some(Token::Namespace(_)) => Self::namespace_declaration(tokens),
            Some(Token::Import(_)) => Self::import_declaration(tokens),
            Some(Token::Label(_)) => Self::label_declaration(tokens),
            Some(Token::Identifier(..)) => Self::binding(tokens),
            _ => Self::statement(tokens),
        }
    });

    rd_term!(binding := tokens => Stmt : {
        let expr = Self::expression(tokens)?;

        if let Expr::Var(_, name) = &expr {
            if rd_matches!(tokens, ColonEqual).is_some() {
                let init = Self::expression(tokens)?;
                return rd_consume!(
                    tokens,
                    Semicolon => Ok(Stmt::Var(name.clone(), Some(init))),
                    "Expected ';' after variable declaration",
                    "Make sure that you have a semicolon after the variable declaration.");
            }

            if rd_matches!(tokens, Colon).is_some() {
                if rd_matches!(tokens, Semicolon).is_some() {
                    return Ok(Stmt::Var(name.clone(), None));
                }

                return Ok(Stmt::Function(Rc::new(Self::function(tokens, name.clone())?)));
            }
        }

        rd_consume!(tokens, Semicolon => Ok(Stmt::Expression(expr)), "Expected ';' after expression", "Make sure that you have a semicolon at the end of your previous expression.")
    });

    fn function<T: Iterator<Item = Token>>(tokens: &mut Peekable<T>, name: Token) -> Result<FunDecl, MinikError> {
        rd_consume!(tokens, LeftParen, format!("Expected an opening parenthesis `(` after `{}:`", name.lexeme()), "Declare a function as `name : (params) { body }`.");

        let mut params = Vec::new();
        if rd_matches!(tokens, RightParen).is_none() {
            loop {
                params.push(rd_consume!(tokens, param@Identifier => param, "Expected a parameter name", "Function parameters must be plain identifiers."));

                if rd_matches!(tokens, Comma).is_none() {
                    break;
                }
            }

            rd_consume!(tokens, RightParen, "Expected a closing parenthesis `)` after the parameter list", "Make sure you close the parameter list with a `)`.");
        }

        let body = Self::block(tokens)?;

        Ok(FunDecl { name, params, body })
    }

    rd_term!(class_declaration := tokens => Stmt : {
        rd_consume!(tokens, Class, "Expected the `class` keyword", "Declare a class as `class Name { members }`.");
        let name = rd_consume!(tokens, name@Identifier => name, "Expected a class name after the `class` keyword", "Provide a name for your class.");
        rd_consume!(tokens, LeftBrace, "Expected an opening brace `{` after the class name", "Declare a class as `class Name { members }`.");

        let mut methods = Vec::new();
        let mut members = Vec::new();

        while !matches!(tokens.peek(), Some(Token::RightBrace(_)) | None) {
            let member = rd_consume!(tokens, member@Identifier => member, "Expected a member or method name", "Class bodies may only contain `name := value;`, `name:;` and `name : (params) { body }` declarations.");

            match tokens.next() {
                Some(Token::ColonEqual(_)) => {
                    let init = Self::expression(tokens)?;
                    rd_consume!(tokens, Semicolon, "Expected ';' after member declaration", "Make sure that you have a semicolon after the member declaration.");
                    members.push((member, Some(init)));
                },
                Some(Token::Colon(_)) if rd_matches!(tokens, Semicolon).is_some() => {
                    members.push((member, None));
                },
                Some(Token::Colon(_)) => {
                    methods.push(Rc::new(Self::function(tokens, member)?));
                },
                Some(other) => return Err(errors::language(
                    other.location(),
                    format!("Expected `:` or `:=` after the member name '{}', but got {} instead.", member.lexeme(), other),
                    "Class bodies may only contain `name := value;`, `name:;` and `name : (params) { body }` declarations.",
                )),
                None => return Err(errors::language(
                    member.location(),
                    "Reached the end of the file while reading a class member.",
                    "Make sure you have closed the class body with a `}`.",
                )),
            }
        }

        rd_consume!(tokens, RightBrace => Ok(Stmt::Class(Rc::new(ClassDecl { name, methods, members }))), "Expected a closing brace `}` after the class body", "Make sure you have a closing brace `}` after the class body.")
    });

    rd_term!(namespace_declaration := tokens => Stmt : {
        rd_consume!(tokens, Namespace, "Expected the `namespace` keyword", "Declare a namespace as `namespace Name { declarations }`.");
        let name = rd_consume!(tokens, name@Identifier => name, "Expected a namespace name after the `namespace` keyword", "Provide a name for your namespace.");
        rd_consume!(tokens, LeftBrace, "Expected an opening brace `{` after the namespace name", "Declare a namespace as `namespace Name { declarations }`.");

        let mut body = Vec::new();
        while !matches!(tokens.peek(), Some(Token::RightBrace(_)) | None) {
            match Self::declaration(tokens)? {
                stmt @ (Stmt::Var(..) | Stmt::Function(_) | Stmt::Class(_) | Stmt::Namespace(..)) => body.push(stmt),
                _ => return Err(errors::language(
                    name.location(),
                    format!("Only variables, functions, classes and namespaces may be declared inside the namespace '{}'.", name.lexeme()),
                    "Move statements out of the namespace body and into a function.",
                )),
            }
        }

        rd_consume!(tokens, RightBrace => Ok(Stmt::Namespace(name, body)), "Expected a closing brace `}` after the namespace body", "Make sure you have a closing brace `}` after the namespace body.")
    });

    rd_term!(import_declaration := tokens => Stmt : {
        let loc = rd_consume!(tokens, kw@Import => kw.location(), "Expected the `import` keyword", "Import a package with `import name;` or a file with `import \"path\";`.");

        let import = match tokens.next() {
            Some(name @ Token::Identifier(..)) => {
                let alias = if rd_matches!(tokens, As).is_some() {
                    Some(rd_consume!(tokens, alias@Identifier => alias, "Expected an alias after `as`", "Write `import name as alias;`."))
                } else {
                    None
                };

                Import::Package { name, alias }
            },
            Some(Token::String(_, lexeme)) => Import::File {
                path: unquote(&lexeme).to_string(),
                stmts: Vec::new(),
            },
            Some(other) => return Err(errors::language(
                other.location(),
                format!("Expected a package name or a file path after `import`, but got {} instead.", other),
                "Import a package with `import name;` or a file with `import \"path\";`.",
            )),
            None => return Err(errors::language(
                loc,
                "Reached the end of the file while reading an import.",
                "Import a package with `import name;` or a file with `import \"path\";`.",
            )),
        };

        rd_consume!(tokens, Semicolon => Ok(Stmt::Import(loc, import)), "Expected ';' after the import", "Make sure that you have a semicolon after the import.")
    });

    rd_term!(label_declaration := tokens => Stmt : {
        rd_consume!(tokens, Label, "Expected the `label` keyword", "Declare a label as `label name;`.");
        let name = rd_consume!(tokens, name@Identifier => name, "Expected a label name after the `label` keyword", "Provide a name for your label.");

        match tokens.peek() {
            Some(Token::For(_)) => Ok(Stmt::Label(name, Some(Box::new(Self::for_loop(tokens)?)))),
            Some(Token::While(_)) => Ok(Stmt::Label(name, Some(Box::new(Self::while_loop(tokens)?)))),
            _ => rd_consume!(tokens, Semicolon => Ok(Stmt::Label(name, None)), "Expected ';', `for` or `while` after the label name", "A label either marks a position (`label name;`) or names a loop (`label name for (...) {}`)."),
        }
    });

    rd_term!(statement := tokens => Stmt : {
        match tokens.peek() {
            Some(Token::For(_)) => Ok(Stmt::For(Box::new(Self::for_loop(tokens)?))),
            Some(Token::While(_)) => Ok(Stmt::For(Box::new(Self::while_loop(tokens)?))),
            Some(Token::If(_)) => Self::if_statement(tokens),
            Some(Token::LeftBrace(loc)) => {
                let loc = *loc;
                Ok(Stmt::Block(loc, Self::block(tokens)?))
            },
            Some(Token::Break(_)) => Self::break_statement(tokens),
            Some(Token::Continue(_)) => Self::continue_statement(tokens),
            Some(Token::Return(_)) => Self::return_statement(tokens),
            Some(Token::Defer(_)) => {
                let loc = rd_consume!(tokens, kw@Defer => kw.location(), "Expected the `defer` keyword", "Write `defer statement;`.");
                Ok(Stmt::Defer(loc, Rc::new(Self::statement(tokens)?)))
            },
            Some(Token::Goto(_)) => {
                rd_consume!(tokens, Goto, "Expected the `goto` keyword", "Write `goto label;`.");
                let label = rd_consume!(tokens, label@Identifier => label, "Expected a label name after `goto`", "Write `goto label;`.");
                rd_consume!(tokens, Semicolon => Ok(Stmt::Goto(label)), "Expected ';' after the goto", "Make sure that you have a semicolon after the goto.")
            },
            _ => {
                let expr = Self::expression(tokens)?;
                rd_consume!(tokens, Semicolon => Ok(Stmt::Expression(expr)), "Expected ';' after expression", "Make sure that you have a semicolon at the end of your previous expression.")
            }
        }
    });

    rd_term!(if_statement := tokens => Stmt : {
        rd_consume!(tokens, If, "Expected the `if` keyword", "Write `if (condition) { ... }`.");
        rd_consume!(tokens, LeftParen, "Expected an opening parenthesis `(` after the `if` keyword", "Make sure you have an opening parenthesis `(` after the `if` keyword.");

        let condition = Self::expression(tokens)?;

        rd_consume!(tokens, RightParen, "Expected a closing parenthesis `)` after the `if` keyword's condition", "Make sure you have a closing parenthesis `)` after the `if` keyword's condition.");

        let then_branch = Self::block(tokens)?;

        let else_branch = if rd_matches!(tokens, Else).is_some() {
            if matches!(tokens.peek(), Some(Token::If(_))) {
                Some(vec![Self::if_statement(tokens)?])
            } else {
                Some(Self::block(tokens)?)
            }
        } else {
            None
        };

        Ok(Stmt::If(condition, then_branch, else_branch))
    });

    rd_term!(for_loop := tokens => Loop : {
        let loc = rd_consume!(tokens, kw@For => kw.location(), "Expected the `for` keyword", "Write `for (init; condition; increment) { ... }`.");
        rd_consume!(tokens, LeftParen, "Expected an opening parenthesis `(` after the `for` keyword", "Make sure you have an opening parenthesis `(` after the `for` keyword.");

        let initializer = if rd_matches!(tokens, Semicolon).is_some() {
            None
        } else {
            match Self::binding(tokens)? {
                stmt @ (Stmt::Var(..) | Stmt::Expression(_)) => Some(Box::new(stmt)),
                _ => return Err(errors::language(
                    loc,
                    "Expected a variable declaration or an expression as the loop initializer.",
                    "Write `for (i := 0; i < n; ++i) { ... }`.",
                )),
            }
        };

        let condition = if rd_matches!(tokens, Semicolon).is_some() {
            None
        } else {
            let cond = Self::expression(tokens)?;
            rd_consume!(tokens, Semicolon, "Expected a semicolon after the condition", "Make sure you have a semicolon after the condition.");
            Some(cond)
        };

        let increment = if rd_matches!(tokens, RightParen).is_some() {
            None
        } else {
            let incr = Self::expression(tokens)?;
            rd_consume!(tokens, RightParen, "Expected a closing parenthesis `)` after the `for` keyword's increment", "Make sure you have a closing parenthesis `)` after the `for` keyword's increment.");
            Some(incr)
        };

        let body = Self::block(tokens)?;

        Ok(Loop { loc, initializer, condition, increment, body })
    });

    rd_term!(while_loop := tokens => Loop : {
        let loc = rd_consume!(tokens, kw@While => kw.location(), "Expected the `while` keyword", "Write `while (condition) { ... }`.");
        rd_consume!(tokens, LeftParen, "Expected an opening parenthesis `(` after the `while` keyword", "Make sure you have an opening parenthesis `(` after the `while` keyword.");

        let condition = Self::expression(tokens)?;

        rd_consume!(tokens, RightParen, "Expected a closing parenthesis `)` after the `while` keyword's condition", "Make sure you have a closing parenthesis `)` after the `while` keyword's condition.");

        let body = Self::block(tokens)?;

        Ok(Loop { loc, initializer: None, condition: Some(condition), increment: None, body })
    });

    rd_term!(break_statement := tokens => Stmt : {
        let loc = rd_consume!(tokens, kw@Break => kw.location(), "Expected the `break` keyword", "Write `break;` or `break label;`.");
        let label = rd_matches!(tokens, Identifier);
        rd_consume!(tokens, Semicolon => Ok(Stmt::Break(loc, label)), "Expected ';' after `break`", "Write `break;` or `break label;`.")
    });

    rd_term!(continue_statement := tokens => Stmt : {
        let loc = rd_consume!(tokens, kw@Continue => kw.location(), "Expected the `continue` keyword", "Write `continue;` or `continue label;`.");
        let label = rd_matches!(tokens, Identifier);
        rd_consume!(tokens, Semicolon => Ok(Stmt::Continue(loc, label)), "Expected ';' after `continue`", "Write `continue;` or `continue label;`.")
    });

    rd_term!(return_statement := tokens => Stmt : {
        let loc = rd_consume!(tokens, kw@Return => kw.location(), "Expected the `return` keyword", "Write `return;` or `return value;`.");

        let value = if matches!(tokens.peek(), Some(Token::Semicolon(_))) {
            None
        } else {
            Some(Self::expression(tokens)?)
        };

        rd_consume!(tokens, Semicolon => Ok(Stmt::Return(loc, value)), "Expected ';' after the return value", "Make sure that you have a semicolon after the return statement.")
    });

    rd_term!(block := tokens => Vec<Stmt> : {
        rd_consume!(tokens, LeftBrace, "Expected an opening brace `{` to start a block", "Wrap the body in braces `{ ... }`.");

        let mut stmts = Vec::new();

        while !matches!(tokens.peek(), Some(Token::RightBrace(_)) | None) {
            stmts.push(Self::declaration(tokens)?);
        }

        rd_consume!(tokens, RightBrace => Ok(stmts), "Expected a closing brace `}` after the block", "Make sure you have a closing brace `}` after the block.")
    });

    rd_term!(expression := tokens => Expr : Self::assignment(tokens));

    rd_term!(assignment := tokens => Expr : {
        let expr = Self::or(tokens)?;

        if let Some(equals) = rd_matches!(tokens, Equal) {
            let value = Box::new(Self::assignment(tokens)?);

            match expr {
                Expr::Var(_, name) => Ok(Expr::Assign(ExprId::fresh(), name, value)),
                Expr::Get(obj, name) => Ok(Expr::Set(obj, name, value)),
                Expr::Subscript(obj, index, bracket) => Ok(Expr::SetSubscript(obj, index, value, bracket)),
                _ => Err(errors::language(
                    equals.location(),
                    "Invalid assignment target.",
                    "You can only assign to variables, properties and list or string elements.",
                )),
            }
        } else {
            Ok(expr)
        }
    });

    rd_term!(or := and (Or) => logical);

    rd_term!(and := equality (And) => logical);

    rd_term!(equality := comparison (BangEqual | EqualEqual) => binary);

    rd_term!(comparison := term (Greater | GreaterEqual | Less | LessEqual) => binary);

    rd_term!(term := factor (Minus | Plus) => binary);

    rd_term!(factor := unary (Star | Slash | Percent) => binary);

    rd_term!(unary := (Bang | Minus | PlusPlus | MinusMinus) | call => unary);

    rd_term!(call := tokens => Expr : {
        let mut expr = Self::primary(tokens)?;

        loop {
            if rd_matches!(tokens, LeftParen).is_some() {
                let mut args = Vec::new();
                if !matches!(tokens.peek(), Some(Token::RightParen(_))) {
                    loop {
                        args.push(Self::expression(tokens)?);

                        if rd_matches!(tokens, Comma).is_none() {
                            break;
                        }
                    }
                }

                let close = rd_consume!(tokens, close@RightParen => close, "Expected a closing parenthesis `)` after the call arguments", "Make sure you close the argument list with a `)`.");
                expr = Expr::Call(Box::new(expr), args, close);
            } else if rd_matches!(tokens, Dot).is_some() {
                let name = rd_consume!(tokens, name@Identifier => name, "Expected a property name after `.`", "Write `object.property`.");
                expr = Expr::Get(Box::new(expr), name);
            } else if let Some(bracket) = rd_matches!(tokens, LeftBracket) {
                let index = Self::expression(tokens)?;
                rd_consume!(tokens, RightBracket, "Expected a closing bracket `]` after the index", "Write `value[index]`.");
                expr = Expr::Subscript(Box::new(expr), Box::new(index), bracket);
            } else {
                break;
            }
        }

        Ok(expr)
    });

    rd_term!(primary := tokens => Expr : {
        match tokens.next() {
            Some(Token::False(loc)) => Ok(Expr::Literal(loc, Literal::Bool(false))),
            Some(Token::True(loc)) => Ok(Expr::Literal(loc, Literal::Bool(true))),
            Some(Token::Nil(loc)) => Ok(Expr::Literal(loc, Literal::Nil)),

            Some(Token::Number(loc, lexeme)) => {
                let value = lexeme.parse().map_err(|_| errors::language(
                    loc,
                    format!("Unable to parse number '{}'.", lexeme),
                    "Make sure you have provided a valid number within the bounds of a 64-bit floating point number.",
                ))?;
                Ok(Expr::Literal(loc, Literal::Number(value)))
            },
            Some(Token::String(loc, lexeme)) => {
                Ok(Expr::Literal(loc, Literal::String(unquote(&lexeme).to_string())))
            },
            Some(Token::This(loc)) => Ok(Expr::This(ExprId::fresh(), loc)),
            Some(Token::LeftParen(_)) => {
                let expr = Self::expression(tokens)?;
                rd_consume!(tokens, RightParen => Ok(Expr::Grouping(Box::new(expr))), "Expected a closing parenthesis `)` after the expression", "Make sure you have a closing parenthesis `)` after the expression.")
            },
            Some(Token::LeftBracket(loc)) => {
                if rd_matches!(tokens, Colon).is_some() {
                    let size = Self::expression(tokens)?;
                    return rd_consume!(tokens, RightBracket => Ok(Expr::SizedArray(loc, Box::new(size))), "Expected a closing bracket `]` after the list size", "Write `[:size]` to create a list of zeroes.");
                }

                let mut elements = Vec::new();
                if !matches!(tokens.peek(), Some(Token::RightBracket(_))) {
                    loop {
                        elements.push(Self::expression(tokens)?);

                        if rd_matches!(tokens, Comma).is_none() {
                            break;
                        }
                    }
                }

                rd_consume!(tokens, RightBracket => Ok(Expr::Array(loc, elements)), "Expected a closing bracket `]` after the list elements", "Make sure you close the list with a `]`.")
            },
            Some(var @ Token::Identifier(..)) => {
                Ok(Expr::Var(ExprId::fresh(), var))
            },
            Some(t) => Err(errors::language(
                t.location(),
                format!("Encountered an unexpected {} while waiting for one of ['true', 'false', 'nil', 'this', number, string, identifier, '(', '['].", t),
                "Make sure that you are providing a primary value at this location.",
            )),
            None => Err(errors::language(
                Loc::Native,
                "Reached the end of the input while waiting for one of ['true', 'false', 'nil', 'this', number, string, identifier, '(', '['].",
                "Make sure that you have provided a valid expression.")),
        }
    });

    fn synchronize<T: Iterator<Item = Token>>(tokens: &mut Peekable<T>) {
        loop {
            match tokens.peek() {
                None => break,
                // If we reach a semicolon, we can stop because the next token will be the start of a new statement
                Some(Token::Semicolon(_)) => {
                    tokens.next();
                    break
                },
                // If the next token is the start of a new statement, we can stop
                Some(
                    Token::Class(_)
                    | Token::Namespace(_)
                    | Token::Import(_)
                    | Token::Label(_)
                    | Token::For(_)
                    | Token::If(_)
                    | Token::While(_)
                    | Token::Defer(_)
                    | Token::Goto(_)
                    | Token::Return(_),
                ) => break,
                _ => {
                    tokens.next();
                }
            }
        }
    }
}

fn unquote(lexeme: &str) -> &str {
    lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme)
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{printer::AstPrinter, StmtVisitor, ExprVisitor},
        lexer::Scanner,
    };

    use super::Parser;

    fn test_parse_expr(source: &str, expected: &str) {
        let lexer = Scanner::new(source);
        let expr = Parser::parse_expr(&mut lexer.filter_map(|x| x.ok())).expect("no errors");
        assert_eq!(
            AstPrinter {}.visit_expr(&expr),
            expected,
            "the expression should be parsed correctly"
        );
    }

    fn test_parse(source: &str, expected: &str) {
        let lexer = Scanner::new(source);
        let (tree, errs) = Parser::parse(&mut lexer.filter_map(|x| x.ok()));
        assert!(errs.is_empty(), "no errors should be returned: {:?}", errs);

        assert_eq!(
            AstPrinter {}.visit_stmt(tree.first().expect("a statement")),
            expected,
            "the statement should be parsed correctly"
        );
    }

    fn test_parse_err(source: &str) {
        let lexer = Scanner::new(source);
        let (_, errs) = Parser::parse(&mut lexer.filter_map(|x| x.ok()));
        assert!(!errs.is_empty(), "an error should be returned for {}", source);
    }

    #[test]
    fn parse_basic_expression() {
        test_parse_expr("1 + 2", "(+ 1 2)");
        test_parse_expr("10 - 5 / (2 * 3)", "(- 10 (/ 5 (group (* 2 3))))");
        test_parse_expr("7 % 3", "(% 7 3)");
    }

    #[test]
    fn parse_left_associative() {
        test_parse_expr("1 - 2 - 3", "(- (- 1 2) 3)");
        test_parse_expr("a or b or c", "(or (or a b) c)");
    }

    #[test]
    fn parse_unary() {
        test_parse_expr("!-x", "(! (- x))");
        test_parse_expr("++i", "(++ i)");
    }

    #[test]
    fn parse_call_chain() {
        test_parse_expr("a.b(1, 2)[0]", "(index (call a.b 1 2) 0)");
        test_parse_expr("f()", "(call f)");
    }

    #[test]
    fn parse_lists() {
        test_parse_expr("[1, \"a\", nil]", "(list 1 \"a\" nil)");
        test_parse_expr("[]", "(list)");
        test_parse_expr("[:5]", "(list-of 5)");
    }

    #[test]
    fn parse_assignment_targets() {
        test_parse_expr("a = 1", "(= a 1)");
        test_parse_expr("a.b = 1", "(set a.b 1)");
        test_parse_expr("a[0] = 1", "(set-index a 0 1)");
    }

    #[test]
    fn parse_block() {
        test_parse("{ 10; 20; 30; }", "(block (10) (20) (30))");
    }

    #[test]
    fn parse_var_def() {
        test_parse("a := 10;", "(var a 10)");
        test_parse("a:;", "(var a)");
    }

    #[test]
    fn parse_fun_def() {
        test_parse("add : (a, b) { return a + b; }", "(fun add a b (block (return (+ a b))))");
        test_parse("noop:() {}", "(fun noop (block))");
    }

    #[test]
    fn parse_class() {
        test_parse(
            "class Counter { Counter:() {} count:=0; inc:() { count = count + 1; } }",
            "(class Counter (member count 0) (fun Counter (block)) (fun inc (block ((= count (+ count 1))))))",
        );
    }

    #[test]
    fn parse_namespace() {
        test_parse("namespace ns { x := 1; f:() {} }", "(namespace ns (var x 1) (fun f (block)))");
    }

    #[test]
    fn parse_if() {
        test_parse("if (x > 5) { 10; } else { 20; }", "(if (> x 5) (block (10)) (block (20)))");
        test_parse("if (x) { 1; } else if (y) { 2; }", "(if x (block (1)) (block (if y (block (2)))))");
    }

    #[test]
    fn parse_while() {
        test_parse("while (x > 5) { 10; }", "(for ; (> x 5); (block (10)))");
    }

    #[test]
    fn parse_for() {
        test_parse("for (i := 0; i < 10; ++i) { 10; }", "(for (var i 0); (< i 10); (++ i) (block (10)))");
    }

    #[test]
    fn parse_labels_and_jumps() {
        test_parse("label outer for (;;) { break outer; }", "(label outer (for ; ; (block (break outer))))");
        test_parse("label here;", "(label here)");
        test_parse("goto here;", "(goto here)");
        test_parse("while (true) { continue; }", "(for ; true; (block (continue)))");
    }

    #[test]
    fn parse_defer_and_import() {
        test_parse("defer print(1);", "(defer ((call print 1)))");
        test_parse("import math as m;", "(import math m)");
        test_parse("import \"lib.mn\";", "(import \"lib.mn\")");
    }

    #[test]
    fn parse_errors() {
        test_parse_err("1 +;");
        test_parse_err("a + b = c;");
        test_parse_err("if (x) 1;");
        test_parse_err("namespace ns { print(1); }");
    }

    #[test]
    fn parse_recovers_after_error() {
        let lexer = Scanner::new("a := ; while (false) {}");
        let (tree, errs) = Parser::parse(&mut lexer.filter_map(|x| x.ok()));
        assert_eq!(errs.len(), 1);
        assert_eq!(tree.len(), 1);
    }
}
