use std::{error::Error, fmt::Display};

use crate::ast::{Label, Node};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardizeError {
    pub message: String,
}

impl StandardizeError {
    fn arity(label: &Label, expected: &str) -> Self {
        Self {
            message: format!("malformed '{label}' node: expected {expected}"),
        }
    }
}

impl Display for StandardizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for StandardizeError {}

fn gamma(rator: Node, rand: Node) -> Node {
    Node::new(Label::Gamma, vec![rator, rand])
}

fn lambda(param: Node, body: Node) -> Node {
    Node::new(Label::Lambda, vec![param, body])
}

fn bind(name: Node, value: Node) -> Node {
    Node::new(Label::Bind, vec![name, value])
}

/// Split a standardized `=` node into its name and value parts.
fn binding_parts(node: Node, context: &Label) -> Result<(Node, Node), StandardizeError> {
    if node.label != Label::Bind || node.children.len() != 2 {
        return Err(StandardizeError::arity(context, "a '=' binding child"));
    }

    let mut children = node.children.into_iter();
    let name = children.next().unwrap();
    let value = children.next().unwrap();

    Ok((name, value))
}

/// Rewrite every sugar form of the raw tree into the core label set
/// (`gamma`, `lambda`, `=`, `tau`, the direct operator nodes and leaves).
/// The rewriting is total on well-formed trees and idempotent on its own
/// output; a wrong child arity for a recognized label is an error, never a
/// partial rewrite.
pub fn standardize(node: &Node) -> Result<Node, StandardizeError> {
    let label = &node.label;
    let children = &node.children;

    if children.is_empty() {
        return Ok(Node::leaf(label.clone()));
    }

    let expect_arity = |count: usize, expected: &str| -> Result<(), StandardizeError> {
        if children.len() != count {
            return Err(StandardizeError::arity(label, expected));
        }
        Ok(())
    };

    match label {
        // let X = E1 in E2  =>  gamma(lambda(X, E2), E1)
        Label::Let => {
            expect_arity(2, "a binding and a body")?;
            let (name, value) = binding_parts(standardize(&children[0])?, label)?;
            let body = standardize(&children[1])?;
            Ok(gamma(lambda(name, body), value))
        }

        // E1 where X = E2  =>  gamma(lambda(X, E1), E2)
        Label::Where => {
            expect_arity(2, "a body and a binding")?;
            let body = standardize(&children[0])?;
            let (name, value) = binding_parts(standardize(&children[1])?, label)?;
            Ok(gamma(lambda(name, body), value))
        }

        // P V1 … Vn = E  =>  = P lambda(V1, … lambda(Vn, E))
        Label::FunctionForm => {
            if children.len() < 3 {
                return Err(StandardizeError::arity(
                    label,
                    "a name, parameters and a body",
                ));
            }
            let name = standardize(&children[0])?;
            let mut body = standardize(children.last().unwrap())?;
            for param in children[1..children.len() - 1].iter().rev() {
                body = lambda(standardize(param)?, body);
            }
            Ok(bind(name, body))
        }

        // fn V1 … Vn . E  =>  lambda(V1, … lambda(Vn, E))
        Label::Lambda => {
            if children.len() < 2 {
                return Err(StandardizeError::arity(label, "parameters and a body"));
            }
            let mut body = standardize(children.last().unwrap())?;
            for param in children[..children.len() - 1].iter().rev() {
                body = lambda(standardize(param)?, body);
            }
            Ok(body)
        }

        // rec X = E  =>  = X gamma(<Y*>, lambda(X, E))
        Label::Rec => {
            expect_arity(1, "a binding")?;
            let (name, value) = binding_parts(standardize(&children[0])?, label)?;
            let fixed = gamma(Node::leaf(Label::Ystar), lambda(name.clone(), value));
            Ok(bind(name, fixed))
        }

        // X1 = E1 within X2 = E2  =>  = X2 gamma(lambda(X1, E2), E1)
        Label::Within => {
            expect_arity(2, "two bindings")?;
            let (outer_name, outer_value) = binding_parts(standardize(&children[0])?, label)?;
            let (inner_name, inner_value) = binding_parts(standardize(&children[1])?, label)?;
            Ok(bind(inner_name, gamma(lambda(outer_name, inner_value), outer_value)))
        }

        // X1 = E1 and … and Xn = En  =>  = tau(X1,…,Xn) tau(E1,…,En)
        Label::And => {
            if children.len() < 2 {
                return Err(StandardizeError::arity(label, "at least two bindings"));
            }
            let mut names = vec![];
            let mut values = vec![];
            for child in children {
                let (name, value) = binding_parts(standardize(child)?, label)?;
                names.push(name);
                values.push(value);
            }
            Ok(bind(
                Node::new(Label::Tau, names),
                Node::new(Label::Tau, values),
            ))
        }

        Label::Tau => {
            let items = children
                .iter()
                .map(standardize)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::new(Label::Tau, items))
        }

        // B -> T | E  =>  gamma(gamma(gamma(->, B), T), E)
        Label::Arrow => {
            expect_arity(3, "a condition and two branches")?;
            let condition = standardize(&children[0])?;
            let then_branch = standardize(&children[1])?;
            let else_branch = standardize(&children[2])?;
            Ok(gamma(
                gamma(gamma(Node::leaf(Label::Arrow), condition), then_branch),
                else_branch,
            ))
        }

        // E1 @ N E2  =>  gamma(gamma(N, E1), E2)
        Label::At => {
            expect_arity(3, "two operands and an operator name")?;
            let left = standardize(&children[0])?;
            let name = standardize(&children[1])?;
            let right = standardize(&children[2])?;
            Ok(gamma(gamma(name, left), right))
        }

        // These stay direct binary nodes; the flattener turns them into a
        // single instruction.
        Label::Amp
        | Label::Or
        | Label::Eq
        | Label::Ne
        | Label::Gr
        | Label::Ge
        | Label::Ls
        | Label::Le => {
            expect_arity(2, "two operands")?;
            Ok(Node::new(
                label.clone(),
                vec![standardize(&children[0])?, standardize(&children[1])?],
            ))
        }

        // Curried form: op E1 E2  =>  gamma(gamma(op, E1), E2)
        Label::Plus | Label::Minus | Label::Times | Label::Divide | Label::Power | Label::Aug => {
            expect_arity(2, "two operands")?;
            let left = standardize(&children[0])?;
            let right = standardize(&children[1])?;
            Ok(gamma(gamma(Node::leaf(label.clone()), left), right))
        }

        Label::Not | Label::Neg => {
            expect_arity(1, "one operand")?;
            Ok(gamma(Node::leaf(label.clone()), standardize(&children[0])?))
        }

        Label::Bind => {
            expect_arity(2, "a name and a value")?;
            Ok(bind(standardize(&children[0])?, standardize(&children[1])?))
        }

        Label::Gamma => {
            expect_arity(2, "a rator and a rand")?;
            Ok(gamma(standardize(&children[0])?, standardize(&children[1])?))
        }

        _ => {
            let items = children
                .iter()
                .map(standardize)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::new(label.clone(), items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser};

    fn standardized(input: &str) -> Node {
        let tokens = Lexer::new(input).lex().expect("should lex");
        let ast = parser::parse(tokens).expect("should parse");
        standardize(&ast).expect("should standardize")
    }

    fn standardized_tree(input: &str) -> String {
        standardized(input).tree()
    }

    #[test]
    fn test_standardize_let() {
        assert_eq!(
            standardized_tree("let x = 5 in x"),
            "gamma\n.lambda\n..<ID:x>\n..<ID:x>\n.<INT:5>\n"
        );
    }

    #[test]
    fn test_standardize_where() {
        assert_eq!(
            standardized_tree("x where x = 3"),
            "gamma\n.lambda\n..<ID:x>\n..<ID:x>\n.<INT:3>\n"
        );
    }

    #[test]
    fn test_standardize_function_form() {
        assert_eq!(
            standardized_tree("let f x y = x in f"),
            "gamma\n.lambda\n..<ID:f>\n..<ID:f>\n.lambda\n..<ID:x>\n..lambda\n...<ID:y>\n...<ID:x>\n"
        );
    }

    #[test]
    fn test_standardize_rec() {
        assert_eq!(
            standardized_tree("let rec f n = n in f"),
            "gamma\n.lambda\n..<ID:f>\n..<ID:f>\n.gamma\n..<Y*>\n..lambda\n...<ID:f>\n...lambda\n....<ID:n>\n....<ID:n>\n"
        );
    }

    #[test]
    fn test_standardize_and() {
        assert_eq!(
            standardized_tree("let x = 1 and y = 2 in x"),
            "gamma\n.lambda\n..tau\n...<ID:x>\n...<ID:y>\n..<ID:x>\n.tau\n..<INT:1>\n..<INT:2>\n"
        );
    }

    #[test]
    fn test_standardize_within() {
        assert_eq!(
            standardized_tree("let c = 3 within f = c in f"),
            "gamma\n.lambda\n..<ID:f>\n..<ID:f>\n.gamma\n..lambda\n...<ID:c>\n...<ID:c>\n..<INT:3>\n"
        );
    }

    #[test]
    fn test_standardize_conditional() {
        assert_eq!(
            standardized_tree("b -> 1 | 2"),
            "gamma\n.gamma\n..gamma\n...->\n...<ID:b>\n..<INT:1>\n.<INT:2>\n"
        );
    }

    #[test]
    fn test_standardize_at() {
        assert_eq!(
            standardized_tree("1 @ add 2"),
            "gamma\n.gamma\n..<ID:add>\n..<INT:1>\n.<INT:2>\n"
        );
    }

    #[test]
    fn test_standardize_curried_arithmetic() {
        assert_eq!(
            standardized_tree("2 + 3"),
            "gamma\n.gamma\n..+\n..<INT:2>\n.<INT:3>\n"
        );
    }

    #[test]
    fn test_standardize_keeps_relations_direct() {
        assert_eq!(standardized_tree("1 eq 2"), "eq\n.<INT:1>\n.<INT:2>\n");
        assert_eq!(
            standardized_tree("true & false"),
            "&\n.true\n.false\n"
        );
    }

    #[test]
    fn test_standardize_unary() {
        assert_eq!(standardized_tree("not true"), "gamma\n.not\n.true\n");
        assert_eq!(standardized_tree("-3"), "gamma\n.neg\n.<INT:3>\n");
    }

    const PROGRAMS: &[&str] = &[
        "let x = 5 in x",
        "let rec Sum n = n eq 0 -> 0 | n + Sum (n - 1) in Print (Sum 10)",
        "let x = 3 and y = 4 in Print (x + y)",
        "let t = (1, 2, 3) in Print (t 2)",
        "Print (Conc 'Hello ' 'World')",
        "let c = 3 within f = fn x . x + c in f 1",
        "(fn () . 42) dummy",
        "1 @ add 2 aug nil",
    ];

    #[test]
    fn test_standardize_is_idempotent() {
        for program in PROGRAMS {
            let once = standardized(program);
            let twice = standardize(&once).expect("should standardize again");
            assert_eq!(once, twice, "not idempotent for: {program}");
        }
    }

    /// Internal nodes of a standardized tree only ever carry core labels.
    #[test]
    fn test_standardize_target_label_set() {
        fn check(node: &Node) {
            if !node.is_leaf() {
                assert!(
                    matches!(
                        node.label,
                        Label::Gamma
                            | Label::Lambda
                            | Label::Bind
                            | Label::Tau
                            | Label::Comma
                            | Label::Amp
                            | Label::Or
                            | Label::Eq
                            | Label::Ne
                            | Label::Gr
                            | Label::Ge
                            | Label::Ls
                            | Label::Le
                    ),
                    "unexpected internal label {}",
                    node.label
                );
            }
            for child in &node.children {
                check(child);
            }
        }

        for program in PROGRAMS {
            check(&standardized(program));
        }
    }
}
