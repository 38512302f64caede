use crate::{core::Loc, errors, MinikError};

use super::Token;

#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
}

#[allow(clippy::while_let_on_iterator)]
impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
        }
    }

    fn location(&self) -> Loc {
        Loc::Line { line: self.line }
    }

    fn match_char(&mut self, next: char) -> bool {
        if let Some((_, c)) = self.chars.peek() {
            if *c == next {
                self.chars.next();
                return true
            }
        }

        false
    }

    /// Consumes characters while `f` holds and returns the byte offset just past the last one.
    fn advance_while_fn<F: Fn(char) -> bool>(&mut self, start: usize, f: F) -> usize {
        let mut end = start;
        while let Some((loc, c)) = self.chars.peek() {
            if !f(*c) {
                break;
            }

            if *c == '\n' {
                self.line += 1;
            }

            end = *loc + c.len_utf8();
            self.chars.next();
        }

        end
    }

    fn read_token(&mut self) -> Option<Result<Token, MinikError>> {
        while let Some((loc, char)) = self.chars.next() {
            let location = self.location();

            match char {
                ' ' | '\r' | '\t' => continue,
                '\n' => {
                    self.line += 1;
                },
                '(' => return Some(Ok(Token::LeftParen(location))),
                ')' => return Some(Ok(Token::RightParen(location))),
                '{' => return Some(Ok(Token::LeftBrace(location))),
                '}' => return Some(Ok(Token::RightBrace(location))),
                '[' => return Some(Ok(Token::LeftBracket(location))),
                ']' => return Some(Ok(Token::RightBracket(location))),
                ',' => return Some(Ok(Token::Comma(location))),
                '.' => return Some(Ok(Token::Dot(location))),
                ';' => return Some(Ok(Token::Semicolon(location))),
                '*' => return Some(Ok(Token::Star(location))),
                '%' => return Some(Ok(Token::Percent(location))),

                '-' if self.match_char('-') => return Some(Ok(Token::MinusMinus(location))),
                '-' => return Some(Ok(Token::Minus(location))),
                '+' if self.match_char('+') => return Some(Ok(Token::PlusPlus(location))),
                '+' => return Some(Ok(Token::Plus(location))),
                ':' if self.match_char('=') => return Some(Ok(Token::ColonEqual(location))),
                ':' => return Some(Ok(Token::Colon(location))),
                '!' if self.match_char('=') => return Some(Ok(Token::BangEqual(location))),
                '!' => return Some(Ok(Token::Bang(location))),
                '=' if self.match_char('=') => return Some(Ok(Token::EqualEqual(location))),
                '=' => return Some(Ok(Token::Equal(location))),
                '>' if self.match_char('=') => return Some(Ok(Token::GreaterEqual(location))),
                '>' => return Some(Ok(Token::Greater(location))),
                '<' if self.match_char('=') => return Some(Ok(Token::LessEqual(location))),
                '<' => return Some(Ok(Token::Less(location))),

                '/' if self.match_char('/') => {
                    while let Some((_, c)) = self.chars.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                },
                '/' if self.match_char('*') => {
                    if let Err(err) = self.skip_block_comment(location) {
                        return Some(Err(err));
                    }
                },
                '/' => return Some(Ok(Token::Slash(location))),

                '"' => return Some(self.read_string(loc)),

                c if c.is_ascii_digit() => return Some(self.read_number(loc)),
                c if c.is_alphabetic() || c == '_' => return Some(self.read_identifier(loc)),

                c => return Some(Err(errors::language(
                    location,
                    format!("We found an unexpected character '{}' where we were expecting one of: [whitespace, parenthesis, brace, bracket, operator, identifier, number, string, comment]", c),
                    "Make sure you have entered valid code and have not accidentally closed a string.",
                )))
            }
        }

        None
    }

    fn skip_block_comment(&mut self, location: Loc) -> Result<(), MinikError> {
        let mut depth = 1;
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\n' => self.line += 1,
                '/' if self.match_char('*') => depth += 1,
                '*' if self.match_char('/') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                },
                _ => {}
            }
        }

        Err(errors::language(
            location,
            "Reached the end of the file without finding the end of a block comment.",
            "Make sure that every `/*` has a matching `*/`.",
        ))
    }

    fn read_string(&mut self, start: usize) -> Result<Token, MinikError> {
        let location = self.location();

        while let Some((loc, c)) = self.chars.next() {
            match c {
                '\n' => self.line += 1,
                '"' => return Ok(Token::String(location, self.source[start..loc + 1].to_string())),
                _ => {}
            }
        }

        Err(errors::language(
            location,
            "Reached the end of the file without finding the closing quote for a string.",
            "Make sure that you have terminated your string with a '\"' character.",
        ))
    }

    fn read_number(&mut self, start: usize) -> Result<Token, MinikError> {
        let location = self.location();

        let mut end = self.advance_while_fn(start + 1, |c| c.is_ascii_digit());

        let mut lookahead = self.chars.clone();
        if let (Some((_, '.')), Some((_, next))) = (lookahead.next(), lookahead.next()) {
            if next.is_ascii_digit() {
                self.chars.next();
                end = self.advance_while_fn(end + 1, |c| c.is_ascii_digit());
            }
        }

        Ok(Token::Number(location, self.source[start..end].to_string()))
    }

    fn read_identifier(&mut self, start: usize) -> Result<Token, MinikError> {
        let location = self.location();

        let first = self.source[start..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        let end = self.advance_while_fn(start + first, |c| c.is_alphanumeric() || c == '_');
        let lexeme = &self.source[start..end];

        Ok(Token::keyword(lexeme, location).unwrap_or_else(|| Token::Identifier(location, lexeme.to_string())))
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, MinikError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operators() {
        let mut lexer = Scanner::new("+ - * / % ++ --");

        assert_eq!(lexer.next().expect("a token").expect("without an error"), Token::Plus(Loc::new(1)));
        assert_eq!(lexer.next().expect("a token").expect("without an error"), Token::Minus(Loc::new(1)));
        assert_eq!(lexer.next().expect("a token").expect("without an error"), Token::Star(Loc::new(1)));
        assert_eq!(lexer.next().expect("a token").expect("without an error"), Token::Slash(Loc::new(1)));
        assert_eq!(lexer.next().expect("a token").expect("without an error"), Token::Percent(Loc::new(1)));
        assert_eq!(lexer.next().expect("a token").expect("without an error"), Token::PlusPlus(Loc::new(1)));
        assert_eq!(lexer.next().expect("a token").expect("without an error"), Token::MinusMinus(Loc::new(1)));
        assert!(lexer.next().is_none(), "no more tokens");
    }

    #[test]
    fn test_basic_symbols() {
        let mut lexer = Scanner::new(r#"
// this is a comment
(( )){}[] // grouping stuff
!*+-/=<> <= == : := // operators
"#);

        let tokens = [
            "(", "(", ")", ")", "{", "}", "[", "]",
            "!", "*", "+", "-", "/", "=", "<", ">", "<=", "==", ":", ":=",
        ];

        for token in tokens {
            assert_eq!(lexer.next().expect("a token").expect("without an error").lexeme(), token);
        }

        assert!(lexer.next().is_none(), "no more tokens");
    }

    #[test]
    fn test_comments() {
        let mut lexer = Scanner::new(r#"
// single line comment
/* multi-line comment on a single line */
/*
* multi-line comment
* on multiple lines
*/
/*/* Nested multi-line comment! */*/
        "#);

        assert!(lexer.next().is_none(), "no more tokens");
    }

    #[test]
    fn test_line_numbers() {
        let mut lexer = Scanner::new("a\n/* two\nlines */ b\n\"x\ny\" c");

        assert_eq!(lexer.next().expect("a token").expect("without an error").location(), Loc::new(1));
        assert_eq!(lexer.next().expect("a token").expect("without an error").location(), Loc::new(3));
        assert_eq!(lexer.next().expect("a token").expect("without an error").location(), Loc::new(4));
        assert_eq!(lexer.next().expect("a token").expect("without an error").location(), Loc::new(5));
    }

    #[test]
    fn test_strings() {
        let mut lexer = Scanner::new(r#" "test" "#);

        if let Token::String(_, lexeme) = lexer.next().expect("a token").expect("without an error") {
            assert_eq!(lexeme, "\"test\"");
        } else {
            panic!("expected a string token");
        }

        assert!(lexer.next().is_none(), "no more tokens");
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Scanner::new(r#" "test "#);
        assert!(lexer.next().expect("a token").is_err());
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Scanner::new(r#" 123 12.34 12. "#);

        let numbers = ["123", "12.34", "12"];
        for number in numbers {
            if let Token::Number(_, lexeme) = lexer.next().expect("a token").expect("without an error") {
                assert_eq!(lexeme, number);
            } else {
                panic!("expected a number token");
            }
        }

        if let Token::Dot(_) = lexer.next().expect("a token").expect("without an error") {} else {
            panic!("expected a dot token");
        }

        assert!(lexer.next().is_none(), "no more tokens");
    }

    #[test]
    fn test_identifiers_and_keywords() {
        let mut lexer = Scanner::new(r#"
identifier _id a_b_c
and as break class continue defer else false for goto if import label namespace nil or return this true while
"#);

        let identifiers = ["identifier", "_id", "a_b_c"];
        for identifier in identifiers {
            if let Token::Identifier(_, lexeme) = lexer.next().expect("a token").expect("without an error") {
                assert_eq!(lexeme, identifier);
            } else {
                panic!("expected an identifier token");
            }
        }

        let keywords = [
            "and", "as", "break", "class", "continue", "defer", "else", "false", "for", "goto",
            "if", "import", "label", "namespace", "nil", "or", "return", "this", "true", "while",
        ];
        for keyword in keywords {
            let token = lexer.next().expect("a token").expect("without an error");
            assert!(!matches!(token, Token::Identifier(..)), "{} should be a keyword", keyword);
            assert_eq!(token.lexeme(), keyword);
        }
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Scanner::new("a # b");
        assert!(lexer.next().expect("a token").is_ok());
        let err = lexer.next().expect("a token").expect_err("an error");
        assert_eq!(err.line(), 1);
    }
}
