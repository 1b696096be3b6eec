mod token;

pub use token::*;

use once_cell::sync::Lazy;
use std::{collections::HashMap, error::Error, fmt::Display, iter::Peekable, str::Chars};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("let", TokenKind::Let),
        ("in", TokenKind::In),
        ("fn", TokenKind::Fn),
        ("where", TokenKind::Where),
        ("aug", TokenKind::Aug),
        ("or", TokenKind::Or),
        ("not", TokenKind::Not),
        ("gr", TokenKind::Gr),
        ("ge", TokenKind::Ge),
        ("ls", TokenKind::Ls),
        ("le", TokenKind::Le),
        ("eq", TokenKind::Eq),
        ("ne", TokenKind::Ne),
        ("true", TokenKind::True),
        ("false", TokenKind::False),
        ("nil", TokenKind::Nil),
        ("dummy", TokenKind::Dummy),
        ("within", TokenKind::Within),
        ("and", TokenKind::And),
        ("rec", TokenKind::Rec),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError(String);

pub type LexResult<T> = Result<T, LexError>;

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for LexError {}

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    tokens: Vec<Token>,
    iterator: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let iterator = input.chars().peekable();

        Self {
            tokens: vec![],
            iterator,
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.iterator.peek().copied()
    }

    /// Advance one character, keeping the (line, col) position current.
    fn next(&mut self) -> Option<char> {
        let next = self.iterator.next();
        match next {
            Some('\n') => {
                self.col = 1;
                self.line += 1;
            }
            Some(_) => self.col += 1,
            None => {}
        }
        next
    }

    fn next_if(&mut self, func: impl FnOnce(&char) -> bool) -> Option<char> {
        let next = self.iterator.peek().copied()?;
        if func(&next) {
            return self.next();
        }

        None
    }

    fn eat_whitespace(&mut self) {
        while self.next_if(|item| item.is_whitespace()).is_some() {}
    }

    fn push(&mut self, kind: TokenKind, position: Position) {
        self.tokens.push(Token::new(kind, position));
    }

    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        loop {
            self.eat_whitespace();

            let Some(next) = self.peek() else {
                return Ok(self.tokens);
            };

            match next {
                'a'..='z' | 'A'..='Z' | '_' => self.lex_alphanumeric(),
                '0'..='9' => self.lex_numeric()?,
                '\'' => self.lex_string()?,
                _ => self.lex_special()?,
            };
        }
    }

    /// Lex a keyword or an identifier.
    fn lex_alphanumeric(&mut self) {
        let mut stack = vec![];

        let position = (self.line, self.col);

        while let Some(next) = self.next_if(|item| item.is_alphanumeric() || *item == '_') {
            stack.push(next);
        }

        let read = stack.iter().collect::<String>();

        if let Some(keyword) = KEYWORDS.get(read.as_str()) {
            self.push(keyword.clone(), position);
        } else {
            self.push(TokenKind::Id(read), position);
        }
    }

    fn lex_numeric(&mut self) -> LexResult<()> {
        let mut stack = vec![];

        let position = (self.line, self.col);

        while let Some(next) = self.next_if(|item| item.is_ascii_digit()) {
            stack.push(next)
        }

        let read = stack.iter().collect::<String>();

        let value = read
            .parse::<i64>()
            .map_err(|_| LexError(format!("failed to parse numeric '{read}'")))?;

        self.push(TokenKind::Int(value), position);

        Ok(())
    }

    /// Lex a `'…'` string literal. Escape sequences (`\'`, `\n`, …) are kept
    /// verbatim in the token content; only the quotes are stripped.
    fn lex_string(&mut self) -> LexResult<()> {
        let position = (self.line, self.col);

        self.next();

        let mut content = vec![];

        loop {
            let Some(next) = self.next() else {
                return Err(LexError(format!(
                    "unterminated string starting at {}:{}",
                    position.0, position.1
                )));
            };

            match next {
                '\'' => break,
                '\\' => {
                    content.push('\\');
                    if let Some(escaped) = self.next() {
                        content.push(escaped);
                    }
                }
                other => content.push(other),
            }
        }

        self.push(TokenKind::Str(content.iter().collect()), position);

        Ok(())
    }

    /// Lex an operator or punctuation character, preferring the longest
    /// match (`->`, `>=`, `<=`, `**`) and skipping `//` comments.
    fn lex_special(&mut self) -> LexResult<()> {
        let position = (self.line, self.col);

        let Some(next) = self.next() else {
            return Ok(());
        };

        let kind = match next {
            '+' => TokenKind::Plus,
            '-' => match self.next_if(|item| *item == '>') {
                Some(_) => TokenKind::Arrow,
                None => TokenKind::Minus,
            },
            '*' => match self.next_if(|item| *item == '*') {
                Some(_) => TokenKind::Power,
                None => TokenKind::Times,
            },
            '/' => match self.next_if(|item| *item == '/') {
                Some(_) => {
                    while self.next_if(|item| *item != '\n').is_some() {}
                    return Ok(());
                }
                None => TokenKind::Divide,
            },
            '>' => match self.next_if(|item| *item == '=') {
                Some(_) => TokenKind::Ge,
                None => TokenKind::Gr,
            },
            '<' => match self.next_if(|item| *item == '=') {
                Some(_) => TokenKind::Le,
                None => TokenKind::Ls,
            },
            '|' => TokenKind::Bar,
            '@' => TokenKind::At,
            '&' => TokenKind::Amp,
            '=' => TokenKind::Assign,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            other => {
                return Err(LexError(format!(
                    "failed to lex '{other}' at {}:{}",
                    position.0, position.1
                )))
            }
        };

        self.push(kind, position);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .lex()
            .expect("should lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_lex_identifier() {
        assert_eq!(kinds("letter"), vec![TokenKind::Id("letter".into())]);
    }

    #[test]
    fn test_lex_numeric() {
        assert_eq!(kinds("1337"), vec![TokenKind::Int(1337)]);
    }

    #[test]
    fn test_lex_let_binding() {
        assert_eq!(
            kinds("let foo = 42 in foo"),
            vec![
                TokenKind::Let,
                TokenKind::Id("foo".into()),
                TokenKind::Assign,
                TokenKind::Int(42),
                TokenKind::In,
                TokenKind::Id("foo".into()),
            ]
        );
    }

    #[test]
    fn test_lex_operator_spellings() {
        assert_eq!(
            kinds("x >= 1 -> x ** 2 | x gr y"),
            vec![
                TokenKind::Id("x".into()),
                TokenKind::Ge,
                TokenKind::Int(1),
                TokenKind::Arrow,
                TokenKind::Id("x".into()),
                TokenKind::Power,
                TokenKind::Int(2),
                TokenKind::Bar,
                TokenKind::Id("x".into()),
                TokenKind::Gr,
                TokenKind::Id("y".into()),
            ]
        );
    }

    #[test]
    fn test_lex_string_with_escape() {
        assert_eq!(
            kinds(r"'it\'s' 'a\nb'"),
            vec![
                TokenKind::Str(r"it\'s".into()),
                TokenKind::Str(r"a\nb".into()),
            ]
        );
    }

    #[test]
    fn test_lex_skips_comments() {
        assert_eq!(
            kinds("1 // a comment\n2"),
            vec![TokenKind::Int(1), TokenKind::Int(2)]
        );
    }

    #[test]
    fn test_lex_positions() {
        let tokens = Lexer::new("let x =\n  5").lex().expect("should lex");
        let positions = tokens
            .iter()
            .map(|token| token.position)
            .collect::<Vec<_>>();

        assert_eq!(positions, vec![(1, 1), (1, 5), (1, 7), (2, 3)]);
    }

    #[test]
    fn test_lex_rejects_unknown_character() {
        assert!(Lexer::new("x # y").lex().is_err());
    }

    #[test]
    fn test_lex_unterminated_string() {
        assert!(Lexer::new("'open").lex().is_err());
    }
}
