use crate::Loc;

macro_rules! tokens {
    ($($name:ident => $text:literal,)*) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Token {
            $($name(Loc),)*
            Identifier(Loc, String),
            /// The raw lexeme, quotes included.
            String(Loc, String),
            Number(Loc, String),
        }

        impl Token {
            pub fn lexeme(&self) -> &str {
                match self {
                    $(Token::$name(..) => $text,)*
                    Token::Identifier(_, lexeme) | Token::String(_, lexeme) | Token::Number(_, lexeme) => lexeme,
                }
            }

            pub fn location(&self) -> Loc {
                match self {
                    $(Token::$name(loc) => *loc,)*
                    Token::Identifier(loc, _) | Token::String(loc, _) | Token::Number(loc, _) => *loc,
                }
            }
        }
    };
}

tokens! {
    LeftParen => "(",
    RightParen => ")",
    LeftBrace => "{",
    RightBrace => "}",
    LeftBracket => "[",
    RightBracket => "]",
    Comma => ",",
    Dot => ".",
    Minus => "-",
    MinusMinus => "--",
    Plus => "+",
    PlusPlus => "++",
    Semicolon => ";",
    Slash => "/",
    Star => "*",
    Percent => "%",
    Colon => ":",
    ColonEqual => ":=",

    Bang => "!",
    BangEqual => "!=",
    Equal => "=",
    EqualEqual => "==",
    Greater => ">",
    GreaterEqual => ">=",
    Less => "<",
    LessEqual => "<=",

    And => "and",
    As => "as",
    Break => "break",
    Class => "class",
    Continue => "continue",
    Defer => "defer",
    Else => "else",
    False => "false",
    For => "for",
    Goto => "goto",
    If => "if",
    Import => "import",
    Label => "label",
    Namespace => "namespace",
    Nil => "nil",
    Or => "or",
    Return => "return",
    This => "this",
    True => "true",
    While => "while",
}

impl Token {
    /// Builds the identifier used for host-side lookups such as `this`.
    pub fn identifier<S: Into<String>>(name: S) -> Self {
        Token::Identifier(Loc::Native, name.into())
    }

    pub fn keyword(lexeme: &str, loc: Loc) -> Option<Token> {
        Some(match lexeme {
            "and" => Token::And(loc),
            "as" => Token::As(loc),
            "break" => Token::Break(loc),
            "class" => Token::Class(loc),
            "continue" => Token::Continue(loc),
            "defer" => Token::Defer(loc),
            "else" => Token::Else(loc),
            "false" => Token::False(loc),
            "for" => Token::For(loc),
            "goto" => Token::Goto(loc),
            "if" => Token::If(loc),
            "import" => Token::Import(loc),
            "label" => Token::Label(loc),
            "namespace" => Token::Namespace(loc),
            "nil" => Token::Nil(loc),
            "or" => Token::Or(loc),
            "return" => Token::Return(loc),
            "this" => Token::This(loc),
            "true" => Token::True(loc),
            "while" => Token::While(loc),
            _ => return None,
        })
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "'{}' at {}", self.lexeme(), self.location())
    }
}
