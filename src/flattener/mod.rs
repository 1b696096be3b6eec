mod control;

pub use control::*;

use std::collections::BTreeMap;

use crate::ast::{Label, Node};

fn binary_op_of(label: &Label) -> Option<BinaryOp> {
    match label {
        Label::Plus => Some(BinaryOp::Add),
        Label::Minus => Some(BinaryOp::Sub),
        Label::Times => Some(BinaryOp::Mul),
        Label::Divide => Some(BinaryOp::Div),
        Label::Power => Some(BinaryOp::Pow),
        Label::Aug => Some(BinaryOp::Aug),
        Label::Amp => Some(BinaryOp::And),
        Label::Or => Some(BinaryOp::Or),
        Label::Eq => Some(BinaryOp::Eq),
        Label::Ne => Some(BinaryOp::Ne),
        Label::Gr => Some(BinaryOp::Gr),
        Label::Ge => Some(BinaryOp::Ge),
        Label::Ls => Some(BinaryOp::Ls),
        Label::Le => Some(BinaryOp::Le),
        _ => None,
    }
}

fn unary_op_of(label: &Label) -> Option<UnaryOp> {
    match label {
        Label::Neg => Some(UnaryOp::Neg),
        Label::Not => Some(UnaryOp::Not),
        _ => None,
    }
}

fn leaf_item(label: &Label) -> ControlItem {
    if let Some(op) = binary_op_of(label) {
        return ControlItem::Binary(op);
    }
    if let Some(op) = unary_op_of(label) {
        return ControlItem::Unary(op);
    }

    match label {
        Label::Id(name) => ControlItem::Name(name.clone()),
        Label::Int(value) => ControlItem::Int(*value),
        Label::Str(value) => ControlItem::Str(value.clone()),
        Label::True => ControlItem::True,
        Label::False => ControlItem::False,
        Label::Dummy => ControlItem::Dummy,
        Label::Nil => ControlItem::Nil,
        Label::Ystar => ControlItem::Ystar,
        Label::Arrow => ControlItem::Arrow,
        other => ControlItem::Name(other.to_string()),
    }
}

fn leaf_name(node: &Node) -> String {
    match &node.label {
        Label::Id(name) => name.clone(),
        other => other.to_string(),
    }
}

/// Parameter names of a lambda: a single identifier, a `,`/`tau` list of
/// identifiers, or the synthetic `()` parameter of a zero-argument lambda.
fn parameter_names(param: &Node) -> Vec<String> {
    match &param.label {
        Label::Comma | Label::Tau => param.children.iter().map(leaf_name).collect(),
        _ => vec![leaf_name(param)],
    }
}

/// Flattens a standardized tree into control structures by the generic
/// rules only. Curried operator applications and conditionals flow through
/// the plain application rule, so the output still contains operator and
/// `->` leaves; it is meant for display, not execution.
pub struct Flattener {
    counter: usize,
    structures: BTreeMap<usize, Vec<ControlItem>>,
}

impl Flattener {
    pub fn new() -> Self {
        Self {
            counter: 1,
            structures: BTreeMap::new(),
        }
    }

    pub fn flatten(mut self, root: &Node) -> ControlStructures {
        let mut main = vec![];
        self.generate(root, &mut main);
        self.structures.insert(0, main);

        ControlStructures::new(self.structures)
    }

    fn alloc(&mut self) -> usize {
        let id = self.counter;
        self.counter += 1;
        id
    }

    fn generate(&mut self, node: &Node, out: &mut Vec<ControlItem>) {
        if node.is_leaf() {
            out.push(leaf_item(&node.label));
            return;
        }

        let children = &node.children;

        match &node.label {
            Label::Gamma => {
                self.generate(&children[1], out);
                self.generate(&children[0], out);
                out.push(ControlItem::Gamma);
            }
            Label::Lambda => {
                let delta = self.alloc();
                let mut body = vec![];
                self.generate(&children[1], &mut body);
                self.structures.insert(delta, body);

                out.push(ControlItem::Lambda {
                    params: parameter_names(&children[0]),
                    delta,
                });
            }
            Label::Tau => {
                for child in children.iter().rev() {
                    self.generate(child, out);
                }
                out.push(ControlItem::Tau(children.len()));
            }
            // The binding itself is effected by the surrounding lambda;
            // only the value contributes instructions.
            Label::Bind => self.generate(&children[1], out),
            label if binary_op_of(label).is_some() && children.len() == 2 => {
                self.generate(&children[0], out);
                self.generate(&children[1], out);
                out.push(ControlItem::Binary(binary_op_of(label).unwrap()));
            }
            label if unary_op_of(label).is_some() && children.len() == 1 => {
                self.generate(&children[0], out);
                out.push(ControlItem::Unary(unary_op_of(label).unwrap()));
            }
            _ => {
                for child in children {
                    self.generate(child, out);
                }
            }
        }
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new()
    }
}

/// Flattens a standardized tree into executable control structures. On top
/// of the generic rules it recognizes the special application shapes left
/// by standardization: curried binary operators, curried unary operators
/// and conditionals.
pub struct OptimizedFlattener {
    counter: usize,
    structures: BTreeMap<usize, Vec<ControlItem>>,
}

/// Ops recognized in curried position `gamma(gamma(op, X), Y)`.
fn curried_binary_op(node: &Node) -> Option<BinaryOp> {
    if !node.is_leaf() {
        return None;
    }

    match binary_op_of(&node.label)? {
        BinaryOp::And | BinaryOp::Or => None,
        op => Some(op),
    }
}

/// Match `gamma(gamma(->, B), T)`, the rator of a standardized conditional.
fn conditional_parts(rator: &Node) -> Option<(&Node, &Node)> {
    if rator.label != Label::Gamma || rator.children.len() != 2 {
        return None;
    }

    let inner = &rator.children[0];
    if inner.label != Label::Gamma
        || inner.children.len() != 2
        || inner.children[0].label != Label::Arrow
        || !inner.children[0].is_leaf()
    {
        return None;
    }

    Some((&inner.children[1], &rator.children[1]))
}

impl OptimizedFlattener {
    pub fn new() -> Self {
        Self {
            counter: 1,
            structures: BTreeMap::new(),
        }
    }

    pub fn flatten(mut self, root: &Node) -> ControlStructures {
        let mut main = vec![];
        self.generate(root, &mut main);
        self.structures.insert(0, main);

        ControlStructures::new(self.structures)
    }

    fn alloc(&mut self) -> usize {
        let id = self.counter;
        self.counter += 1;
        id
    }

    fn generate(&mut self, node: &Node, out: &mut Vec<ControlItem>) {
        if node.is_leaf() {
            out.push(leaf_item(&node.label));
            return;
        }

        let children = &node.children;

        match &node.label {
            Label::Gamma => {
                let rator = &children[0];
                let rand = &children[1];

                // gamma(gamma(op, X), Y)  =>  X Y op
                if rator.label == Label::Gamma && rator.children.len() == 2 {
                    if let Some(op) = curried_binary_op(&rator.children[0]) {
                        self.generate(&rator.children[1], out);
                        self.generate(rand, out);
                        out.push(ControlItem::Binary(op));
                        return;
                    }
                }

                // gamma(op, X)  =>  X op
                if let Some(op) = unary_op_of(&rator.label).filter(|_| rator.is_leaf()) {
                    self.generate(rand, out);
                    out.push(ControlItem::Unary(op));
                    return;
                }

                // gamma(gamma(gamma(->, B), T), E)  =>  B β δelse δthen
                if let Some((condition, then_branch)) = conditional_parts(rator) {
                    let then_id = self.alloc();
                    let else_id = self.alloc();

                    let mut then_body = vec![];
                    self.generate(then_branch, &mut then_body);
                    self.structures.insert(then_id, then_body);

                    let mut else_body = vec![];
                    self.generate(rand, &mut else_body);
                    self.structures.insert(else_id, else_body);

                    self.generate(condition, out);
                    out.push(ControlItem::Beta);
                    out.push(ControlItem::Delta(else_id));
                    out.push(ControlItem::Delta(then_id));
                    return;
                }

                self.generate(rand, out);
                self.generate(rator, out);
                out.push(ControlItem::Gamma);
            }
            Label::Lambda => {
                let delta = self.alloc();
                let mut body = vec![];
                self.generate(&children[1], &mut body);
                self.structures.insert(delta, body);

                out.push(ControlItem::Lambda {
                    params: parameter_names(&children[0]),
                    delta,
                });
            }
            Label::Tau => {
                for child in children.iter().rev() {
                    self.generate(child, out);
                }
                out.push(ControlItem::Tau(children.len()));
            }
            Label::Bind => self.generate(&children[1], out),
            label if binary_op_of(label).is_some() && children.len() == 2 => {
                self.generate(&children[0], out);
                self.generate(&children[1], out);
                out.push(ControlItem::Binary(binary_op_of(label).unwrap()));
            }
            label if unary_op_of(label).is_some() && children.len() == 1 => {
                self.generate(&children[0], out);
                out.push(ControlItem::Unary(unary_op_of(label).unwrap()));
            }
            _ => {
                for child in children {
                    self.generate(child, out);
                }
            }
        }
    }
}

impl Default for OptimizedFlattener {
    fn default() -> Self {
        Self::new()
    }
}
