use std::{error::Error, fmt::Display};

use crate::{
    ast::{Label, Node},
    lexer::{Position, Token, TokenKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Option<Position>,
}

impl ParseError {
    pub fn eof(item: &str) -> ParseError {
        ParseError {
            message: format!("hit end of input while parsing {item}"),
            position: None,
        }
    }

    fn unexpected(token: &Token, expected: &str) -> ParseError {
        ParseError {
            message: format!(
                "unexpected {}, expected {expected}",
                token.kind.describe()
            ),
            position: Some(token.position),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some((line, col)) = self.position {
            write!(f, "{} ({line}:{col})", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

impl Error for ParseError {}

/// Parse a token stream into the raw tree. The whole input must form a
/// single expression; trailing tokens are an error.
pub fn parse(tokens: Vec<Token>) -> Result<Node, ParseError> {
    let mut parser = Parser::new(tokens);

    let expr = parser.parse_expr()?;

    match parser.current() {
        Some(token) => Err(ParseError {
            message: format!(
                "unexpected {} after end of expression",
                token.kind.describe()
            ),
            position: Some(token.position),
        }),
        None => Ok(expr),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> Option<Token> {
        self.tokens.get(self.pos).cloned()
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|token| token.kind.clone())
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos + 1).map(|token| token.kind.clone())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.tokens
            .get(self.pos)
            .map(|token| &token.kind == kind)
            .unwrap_or(false)
    }

    /// Consume the current token if it matches.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            return true;
        }

        false
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let Some(token) = self.current() else {
            return Err(ParseError::eof(&kind.describe()));
        };

        if token.kind != kind {
            return Err(ParseError::unexpected(&token, &kind.describe()));
        }

        self.pos += 1;
        Ok(token)
    }

    fn expect_id(&mut self) -> Result<String, ParseError> {
        match self.current() {
            Some(Token {
                kind: TokenKind::Id(name),
                ..
            }) => {
                self.pos += 1;
                Ok(name)
            }
            Some(token) => Err(ParseError::unexpected(&token, "identifier")),
            None => Err(ParseError::eof("identifier")),
        }
    }

    /// ```text
    /// E  -> 'let' D 'in' E => 'let'
    ///    -> 'fn' Vb+ '.' E => 'lambda'
    ///    -> Ew;
    /// Ew -> T 'where' Dr => 'where'
    ///    -> T;
    /// ```
    fn parse_expr(&mut self) -> Result<Node, ParseError> {
        match self.current_kind() {
            Some(TokenKind::Let) => {
                self.pos += 1;
                let definition = self.parse_definition()?;
                self.expect(TokenKind::In)?;
                let body = self.parse_expr()?;
                Ok(Node::new(Label::Let, vec![definition, body]))
            }
            Some(TokenKind::Fn) => {
                self.pos += 1;
                let mut children = vec![self.parse_var_binding()?];
                while !self.check(&TokenKind::Dot) {
                    children.push(self.parse_var_binding()?);
                }
                self.expect(TokenKind::Dot)?;
                children.push(self.parse_expr()?);
                Ok(Node::new(Label::Lambda, children))
            }
            _ => {
                let body = self.parse_tuple()?;
                if self.eat(&TokenKind::Where) {
                    let binding = self.parse_def_rec()?;
                    return Ok(Node::new(Label::Where, vec![body, binding]));
                }
                Ok(body)
            }
        }
    }

    /// ```text
    /// T  -> Ta (',' Ta)+ => 'tau'
    ///    -> Ta;
    /// Ta -> Ta 'aug' Tc => 'aug'
    ///    -> Tc;
    /// ```
    fn parse_tuple(&mut self) -> Result<Node, ParseError> {
        let first = self.parse_aug()?;

        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            items.push(self.parse_aug()?);
        }

        Ok(Node::new(Label::Tau, items))
    }

    fn parse_aug(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_cond()?;

        while self.eat(&TokenKind::Aug) {
            let rhs = self.parse_cond()?;
            node = Node::new(Label::Aug, vec![node, rhs]);
        }

        Ok(node)
    }

    /// ```text
    /// Tc -> B '->' Tc '|' Tc => '->'
    ///    -> B;
    /// ```
    fn parse_cond(&mut self) -> Result<Node, ParseError> {
        let condition = self.parse_or()?;

        if self.eat(&TokenKind::Arrow) {
            let then_branch = self.parse_cond()?;
            self.expect(TokenKind::Bar)?;
            let else_branch = self.parse_cond()?;
            return Ok(Node::new(
                Label::Arrow,
                vec![condition, then_branch, else_branch],
            ));
        }

        Ok(condition)
    }

    /// ```text
    /// B  -> B 'or' Bt => 'or'   Bt -> Bt '&' Bs => '&'
    ///    -> Bt;                 Bs -> 'not' Bp => 'not' | Bp;
    /// ```
    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_and_term()?;

        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and_term()?;
            node = Node::new(Label::Or, vec![node, rhs]);
        }

        Ok(node)
    }

    fn parse_and_term(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_not()?;

        while self.eat(&TokenKind::Amp) {
            let rhs = self.parse_not()?;
            node = Node::new(Label::Amp, vec![node, rhs]);
        }

        Ok(node)
    }

    fn parse_not(&mut self) -> Result<Node, ParseError> {
        if self.eat(&TokenKind::Not) {
            let operand = self.parse_relation()?;
            return Ok(Node::new(Label::Not, vec![operand]));
        }

        self.parse_relation()
    }

    /// ```text
    /// Bp -> A ('gr'|'ge'|'ls'|'le'|'eq'|'ne') A | A;
    /// ```
    fn parse_relation(&mut self) -> Result<Node, ParseError> {
        let lhs = self.parse_arithmetic()?;

        let label = match self.current_kind() {
            Some(TokenKind::Gr) => Label::Gr,
            Some(TokenKind::Ge) => Label::Ge,
            Some(TokenKind::Ls) => Label::Ls,
            Some(TokenKind::Le) => Label::Le,
            Some(TokenKind::Eq) => Label::Eq,
            Some(TokenKind::Ne) => Label::Ne,
            _ => return Ok(lhs),
        };

        self.pos += 1;
        let rhs = self.parse_arithmetic()?;

        Ok(Node::new(label, vec![lhs, rhs]))
    }

    /// ```text
    /// A  -> A '+' At | A '-' At | '+' At | '-' At => 'neg' | At;
    /// At -> At '*' Af | At '/' Af | Af;
    /// Af -> Ap '**' Af => '**' | Ap;
    /// ```
    fn parse_arithmetic(&mut self) -> Result<Node, ParseError> {
        let mut node = match self.current_kind() {
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.parse_term()?
            }
            Some(TokenKind::Minus) => {
                self.pos += 1;
                let operand = self.parse_term()?;
                Node::new(Label::Neg, vec![operand])
            }
            _ => self.parse_term()?,
        };

        loop {
            let label = match self.current_kind() {
                Some(TokenKind::Plus) => Label::Plus,
                Some(TokenKind::Minus) => Label::Minus,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            node = Node::new(label, vec![node, rhs]);
        }

        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_factor()?;

        loop {
            let label = match self.current_kind() {
                Some(TokenKind::Times) => Label::Times,
                Some(TokenKind::Divide) => Label::Divide,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_factor()?;
            node = Node::new(label, vec![node, rhs]);
        }

        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<Node, ParseError> {
        let base = self.parse_at()?;

        if self.eat(&TokenKind::Power) {
            let exponent = self.parse_factor()?;
            return Ok(Node::new(Label::Power, vec![base, exponent]));
        }

        Ok(base)
    }

    /// ```text
    /// Ap -> Ap '@' <identifier> R => '@' | R;
    /// ```
    fn parse_at(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_application()?;

        while self.eat(&TokenKind::At) {
            let name = self.expect_id()?;
            let rhs = self.parse_application()?;
            node = Node::new(Label::At, vec![node, Node::leaf(Label::Id(name)), rhs]);
        }

        Ok(node)
    }

    /// ```text
    /// R  -> R Rn => 'gamma'
    ///    -> Rn;
    /// ```
    ///
    /// Application is plain juxtaposition; the chain continues as long as
    /// the next token can start an operand.
    fn parse_application(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_rand()?;

        while self
            .current_kind()
            .map(|kind| starts_rand(&kind))
            .unwrap_or(false)
        {
            let rand = self.parse_rand()?;
            node = Node::new(Label::Gamma, vec![node, rand]);
        }

        Ok(node)
    }

    /// ```text
    /// Rn -> <identifier> | <integer> | <string>
    ///    -> 'true' | 'false' | 'nil' | 'dummy'
    ///    -> '(' E ')';
    /// ```
    fn parse_rand(&mut self) -> Result<Node, ParseError> {
        let Some(token) = self.current() else {
            return Err(ParseError::eof("expression"));
        };

        let node = match token.kind {
            TokenKind::Id(name) => Node::leaf(Label::Id(name)),
            TokenKind::Int(value) => Node::leaf(Label::Int(value)),
            TokenKind::Str(value) => Node::leaf(Label::Str(value)),
            TokenKind::True => Node::leaf(Label::True),
            TokenKind::False => Node::leaf(Label::False),
            TokenKind::Nil => Node::leaf(Label::Nil),
            TokenKind::Dummy => Node::leaf(Label::Dummy),
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            ref other => {
                return Err(ParseError {
                    message: format!("unexpected {} in expression", other.describe()),
                    position: Some(token.position),
                })
            }
        };

        self.pos += 1;
        Ok(node)
    }

    /// ```text
    /// D  -> Da 'within' D => 'within' | Da;
    /// Da -> Dr ('and' Dr)+ => 'and' | Dr;
    /// Dr -> 'rec' Db => 'rec' | Db;
    /// ```
    fn parse_definition(&mut self) -> Result<Node, ParseError> {
        let first = self.parse_def_and()?;

        if self.eat(&TokenKind::Within) {
            let inner = self.parse_definition()?;
            return Ok(Node::new(Label::Within, vec![first, inner]));
        }

        Ok(first)
    }

    fn parse_def_and(&mut self) -> Result<Node, ParseError> {
        let first = self.parse_def_rec()?;

        if !self.check(&TokenKind::And) {
            return Ok(first);
        }

        let mut bindings = vec![first];
        while self.eat(&TokenKind::And) {
            bindings.push(self.parse_def_rec()?);
        }

        Ok(Node::new(Label::And, bindings))
    }

    fn parse_def_rec(&mut self) -> Result<Node, ParseError> {
        if self.eat(&TokenKind::Rec) {
            let binding = self.parse_def_binding()?;
            return Ok(Node::new(Label::Rec, vec![binding]));
        }

        self.parse_def_binding()
    }

    /// ```text
    /// Db -> Vl '=' E => '='
    ///    -> <identifier> Vb+ '=' E => 'function_form'
    ///    -> '(' D ')';
    /// ```
    fn parse_def_binding(&mut self) -> Result<Node, ParseError> {
        if self.eat(&TokenKind::LParen) {
            let definition = self.parse_definition()?;
            self.expect(TokenKind::RParen)?;
            return Ok(definition);
        }

        // An identifier followed by another identifier or '(' opens a
        // function form rather than a plain binding.
        if matches!(self.current_kind(), Some(TokenKind::Id(_)))
            && matches!(
                self.peek_kind(),
                Some(TokenKind::Id(_)) | Some(TokenKind::LParen)
            )
        {
            let name = self.expect_id()?;
            let mut children = vec![Node::leaf(Label::Id(name))];

            while !self.check(&TokenKind::Assign) {
                if self.current().is_none() {
                    return Err(ParseError::eof("function definition"));
                }
                children.push(self.parse_var_binding()?);
            }

            self.expect(TokenKind::Assign)?;
            children.push(self.parse_expr()?);

            return Ok(Node::new(Label::FunctionForm, children));
        }

        let names = self.parse_var_list()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;

        Ok(Node::new(Label::Bind, vec![names, value]))
    }

    /// ```text
    /// Vb -> <identifier> | '(' Vl ')' | '(' ')' => '()';
    /// Vl -> <identifier> (',' <identifier>)* => ','?;
    /// ```
    fn parse_var_binding(&mut self) -> Result<Node, ParseError> {
        match self.current() {
            Some(Token {
                kind: TokenKind::Id(name),
                ..
            }) => {
                self.pos += 1;
                Ok(Node::leaf(Label::Id(name)))
            }
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => {
                self.pos += 1;
                if self.eat(&TokenKind::RParen) {
                    return Ok(Node::leaf(Label::Unit));
                }
                let names = self.parse_var_list()?;
                self.expect(TokenKind::RParen)?;
                Ok(names)
            }
            Some(token) => Err(ParseError::unexpected(&token, "a variable binding")),
            None => Err(ParseError::eof("variable binding")),
        }
    }

    fn parse_var_list(&mut self) -> Result<Node, ParseError> {
        let mut names = vec![Node::leaf(Label::Id(self.expect_id()?))];

        while self.eat(&TokenKind::Comma) {
            names.push(Node::leaf(Label::Id(self.expect_id()?)));
        }

        if names.len() > 1 {
            return Ok(Node::new(Label::Comma, names));
        }

        Ok(names.pop().unwrap())
    }
}

fn starts_rand(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Id(_)
            | TokenKind::Int(_)
            | TokenKind::Str(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil
            | TokenKind::Dummy
            | TokenKind::LParen
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_tree(input: &str) -> String {
        let tokens = Lexer::new(input).lex().expect("should lex");
        parse(tokens).expect("should parse").tree()
    }

    fn parse_err(input: &str) -> ParseError {
        let tokens = Lexer::new(input).lex().expect("should lex");
        parse(tokens).expect_err("should fail to parse")
    }

    #[test]
    fn test_parse_let() {
        assert_eq!(
            parse_tree("let x = 5 in x"),
            "let\n.=\n..<ID:x>\n..<INT:5>\n.<ID:x>\n"
        );
    }

    #[test]
    fn test_parse_lambda_with_two_parameters() {
        assert_eq!(
            parse_tree("fn x y . x"),
            "lambda\n.<ID:x>\n.<ID:y>\n.<ID:x>\n"
        );
    }

    #[test]
    fn test_parse_application_is_left_associative() {
        assert_eq!(
            parse_tree("f 1 2"),
            "gamma\n.gamma\n..<ID:f>\n..<INT:1>\n.<INT:2>\n"
        );
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        assert_eq!(
            parse_tree("2 + 3 * 4"),
            "+\n.<INT:2>\n.*\n..<INT:3>\n..<INT:4>\n"
        );
    }

    #[test]
    fn test_parse_power_is_right_associative() {
        assert_eq!(
            parse_tree("2 ** 3 ** 4"),
            "**\n.<INT:2>\n.**\n..<INT:3>\n..<INT:4>\n"
        );
    }

    #[test]
    fn test_parse_leading_minus() {
        assert_eq!(parse_tree("-3 + 4"), "+\n.neg\n..<INT:3>\n.<INT:4>\n");
    }

    #[test]
    fn test_parse_conditional() {
        assert_eq!(
            parse_tree("b -> 1 | 2"),
            "->\n.<ID:b>\n.<INT:1>\n.<INT:2>\n"
        );
    }

    #[test]
    fn test_parse_tuple() {
        assert_eq!(
            parse_tree("1, 2, 3"),
            "tau\n.<INT:1>\n.<INT:2>\n.<INT:3>\n"
        );
    }

    #[test]
    fn test_parse_where() {
        assert_eq!(
            parse_tree("x where x = 3"),
            "where\n.<ID:x>\n.=\n..<ID:x>\n..<INT:3>\n"
        );
    }

    #[test]
    fn test_parse_function_form() {
        assert_eq!(
            parse_tree("let f x y = x in f"),
            "let\n.function_form\n..<ID:f>\n..<ID:x>\n..<ID:y>\n..<ID:x>\n.<ID:f>\n"
        );
    }

    #[test]
    fn test_parse_rec_binding() {
        assert_eq!(
            parse_tree("let rec f n = n in f"),
            "let\n.rec\n..function_form\n...<ID:f>\n...<ID:n>\n...<ID:n>\n.<ID:f>\n"
        );
    }

    #[test]
    fn test_parse_and_bindings() {
        assert_eq!(
            parse_tree("let x = 1 and y = 2 in x"),
            "let\n.and\n..=\n...<ID:x>\n...<INT:1>\n..=\n...<ID:y>\n...<INT:2>\n.<ID:x>\n"
        );
    }

    #[test]
    fn test_parse_within() {
        assert_eq!(
            parse_tree("let c = 3 within f = c in f"),
            "let\n.within\n..=\n...<ID:c>\n...<INT:3>\n..=\n...<ID:f>\n...<ID:c>\n.<ID:f>\n"
        );
    }

    #[test]
    fn test_parse_at_operator() {
        assert_eq!(
            parse_tree("1 @ add 2"),
            "@\n.<INT:1>\n.<ID:add>\n.<INT:2>\n"
        );
    }

    #[test]
    fn test_parse_tuple_parameter() {
        assert_eq!(
            parse_tree("fn (x, y) . x"),
            "lambda\n.,\n..<ID:x>\n..<ID:y>\n.<ID:x>\n"
        );
    }

    #[test]
    fn test_parse_empty_parameter_list() {
        assert_eq!(parse_tree("fn () . 1"), "lambda\n.()\n.<INT:1>\n");
    }

    #[test]
    fn test_parse_missing_in_is_an_error() {
        let error = parse_err("let x = 5 | x");
        assert!(error.message.contains("expected 'in'"), "{}", error.message);
    }

    #[test]
    fn test_parse_truncated_input_is_an_error() {
        let error = parse_err("let x = 5 in");
        assert!(error.message.contains("end of input"), "{}", error.message);
    }

    #[test]
    fn test_parse_trailing_tokens_are_an_error() {
        let error = parse_err("x )");
        assert!(
            error.message.contains("after end of expression"),
            "{}",
            error.message
        );
    }
}
