mod builtins;
mod environment;
mod ops;
mod value;

pub use builtins::Builtin;
pub use environment::Environment;
pub use value::{Closure, Value};

use std::{error::Error, fmt::Display};

use crate::flattener::{ControlItem, ControlStructures};

/// Safety cap on executed instructions; a runaway program must not hang the
/// host.
pub const MAX_STEPS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    UnboundName(String),
    Type(String),
    Range(String),
    Value(String),
    MissingDelta(usize),
    StepLimit { stack_top: String },
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::UnboundName(name) => write!(f, "unbound identifier: {name}"),
            RuntimeError::Type(message) => f.write_str(message),
            RuntimeError::Range(message) => f.write_str(message),
            RuntimeError::Value(message) => f.write_str(message),
            RuntimeError::MissingDelta(id) => {
                write!(f, "reference to undefined control structure δ{id}")
            }
            RuntimeError::StepLimit { stack_top } => write!(
                f,
                "execution stopped: exceeded maximum steps (possible infinite loop); top of stack: {stack_top}"
            ),
        }
    }
}

impl Error for RuntimeError {}

/// One recorded machine step, pre-rendered for display.
#[derive(Debug, Clone)]
pub struct TraceStep {
    pub instruction: String,
    pub control: String,
    pub stack: String,
    pub env: usize,
    pub active: String,
}

/// The control/stack/environment machine. It executes the entry control
/// structure against a value stack and a tree of environments, splicing
/// other structures onto the control tape on application and on
/// conditional dispatch.
pub struct Machine {
    structures: ControlStructures,
    /// Control tape; the next instruction is the last element.
    control: Vec<ControlItem>,
    stack: Vec<Value>,
    environments: Vec<Environment>,
    current_env: usize,
    tracing: bool,
    trace: Vec<TraceStep>,
}

impl Machine {
    pub fn new(structures: ControlStructures) -> Self {
        Self {
            structures,
            control: vec![],
            stack: vec![],
            environments: vec![Environment::new(0, None)],
            current_env: 0,
            tracing: false,
            trace: vec![],
        }
    }

    /// Record a per-step trace during `run`. Off by default.
    pub fn record_trace(&mut self, tracing: bool) {
        self.tracing = tracing;
    }

    pub fn trace(&self) -> &[TraceStep] {
        &self.trace
    }

    pub fn run(&mut self) -> Result<Value, RuntimeError> {
        self.splice(0)?;

        let mut steps = 0;
        while let Some(instruction) = self.control.pop() {
            steps += 1;
            if steps > MAX_STEPS {
                return Err(RuntimeError::StepLimit {
                    stack_top: self
                        .stack
                        .last()
                        .map(|value| value.to_string())
                        .unwrap_or_else(|| "empty".into()),
                });
            }

            if self.tracing {
                self.record(&instruction);
            }

            self.step(instruction)?;
        }

        self.stack
            .last()
            .cloned()
            .ok_or_else(|| RuntimeError::Range("empty stack at end of execution".into()))
    }

    /// Splice the instructions of a control structure onto the tape so its
    /// first instruction runs next.
    fn splice(&mut self, delta: usize) -> Result<(), RuntimeError> {
        let body = self
            .structures
            .get(delta)
            .ok_or(RuntimeError::MissingDelta(delta))?;
        self.control.extend(body.iter().rev().cloned());
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        let mut current = Some(self.current_env);
        while let Some(id) = current {
            let env = &self.environments[id];
            if let Some(value) = env.get(name) {
                return Ok(value.clone());
            }
            current = env.parent;
        }

        Err(RuntimeError::UnboundName(name.into()))
    }

    fn pop(&mut self, context: &str) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::Range(format!("stack underflow on {context}")))
    }

    fn new_env(&mut self, parent: usize) -> usize {
        let id = self.environments.len();
        self.environments.push(Environment::new(id, Some(parent)));
        id
    }

    fn step(&mut self, instruction: ControlItem) -> Result<(), RuntimeError> {
        match instruction {
            ControlItem::Int(value) => self.stack.push(Value::Int(value)),
            ControlItem::Str(value) => self.stack.push(Value::Str(value)),
            ControlItem::True => self.stack.push(Value::Bool(true)),
            ControlItem::False => self.stack.push(Value::Bool(false)),
            ControlItem::Dummy => self.stack.push(Value::Dummy),
            ControlItem::Nil => self.stack.push(Value::Tuple(vec![])),
            ControlItem::Ystar => self.stack.push(Value::Ystar),

            ControlItem::Name(name) => match Builtin::lookup(&name) {
                Some(builtin) => self.stack.push(Value::Builtin(builtin)),
                None => {
                    let value = self.lookup(&name)?;
                    self.stack.push(value);
                }
            },

            ControlItem::Lambda { params, delta } => self.stack.push(Value::Closure(Closure {
                params,
                delta,
                env: self.current_env,
            })),

            ControlItem::Tau(n) => {
                if self.stack.len() < n {
                    return Err(RuntimeError::Range(format!(
                        "tuple construction expected {n} elements but got {}",
                        self.stack.len()
                    )));
                }
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.stack.pop().unwrap());
                }
                self.stack.push(Value::Tuple(items));
            }

            ControlItem::Gamma => self.apply()?,

            ControlItem::EnvRemove(id) => {
                if let Some(env) = self.environments.get_mut(id) {
                    env.removed = true;
                }
                if let Some(env) = self.environments.iter().rev().find(|env| !env.removed) {
                    self.current_env = env.id;
                }
            }

            ControlItem::Binary(op) => {
                let right = self.pop(op.symbol())?;
                let left = self.pop(op.symbol())?;
                let result = ops::apply_binary(op, left, right)?;
                self.stack.push(result);
            }

            ControlItem::Unary(op) => {
                let operand = self.pop(op.symbol())?;
                let result = ops::apply_unary(op, operand)?;
                self.stack.push(result);
            }

            ControlItem::Beta => self.branch()?,

            ControlItem::Delta(id) => {
                return Err(RuntimeError::Value(format!(
                    "stray δ{id} marker outside a β dispatch"
                )))
            }

            ControlItem::Arrow => {
                return Err(RuntimeError::Type(
                    "the conditional operator is not directly executable".into(),
                ))
            }
        }

        Ok(())
    }

    /// Conditional dispatch: pop the condition, then consume the else and
    /// then markers from the control tape, in that order.
    fn branch(&mut self) -> Result<(), RuntimeError> {
        let condition = self.pop("β")?;

        let mut marker = || {
            self.control
                .pop()
                .ok_or_else(|| RuntimeError::Range("β expects two branch markers".into()))
        };
        let else_marker = marker()?;
        let then_marker = marker()?;

        let (ControlItem::Delta(else_id), ControlItem::Delta(then_id)) =
            (else_marker, then_marker)
        else {
            return Err(RuntimeError::Value("β expects δ markers".into()));
        };

        match condition {
            Value::Bool(true) => self.splice(then_id),
            Value::Bool(false) => self.splice(else_id),
            other => Err(RuntimeError::Value(format!(
                "invalid condition for β: {other}"
            ))),
        }
    }

    /// Apply: pop the rator and the rand and dispatch on the rator's kind.
    fn apply(&mut self) -> Result<(), RuntimeError> {
        let func = self.pop("γ")?;
        let arg = self.pop("γ")?;

        match func {
            Value::Builtin(builtin) => {
                let result = if builtin.is_binary() {
                    let second = self.pop(builtin.name())?;
                    // The partial application left its γ on the tape.
                    self.control.pop().ok_or_else(|| {
                        RuntimeError::Range(format!(
                            "{} requires two applications",
                            builtin.name()
                        ))
                    })?;
                    builtin.apply_binary(arg, second)?
                } else {
                    builtin.apply(arg)?
                };
                self.stack.push(result);
            }

            // A tuple applied to an integer is selection, not application.
            Value::Tuple(items) => match arg {
                Value::Int(index) => {
                    if index < 1 || index as usize > items.len() {
                        return Err(RuntimeError::Range(format!(
                            "index {index} out of bounds for a tuple of {} elements",
                            items.len()
                        )));
                    }
                    self.stack.push(items[index as usize - 1].clone());
                }
                other => {
                    return Err(RuntimeError::Type(format!(
                        "cannot index a tuple with {}",
                        other.type_name()
                    )))
                }
            },

            Value::Ystar => match arg {
                Value::Closure(closure) => self.stack.push(Value::Eta(closure)),
                other => {
                    return Err(RuntimeError::Type(format!(
                        "<Y*> must be applied to a lambda, got {}",
                        other.type_name()
                    )))
                }
            },

            // Fixpoint rule: bind the closure's own name to the eta in a
            // fresh environment, then re-apply the closure body to the
            // argument through the trailing γ.
            Value::Eta(closure) => {
                let id = self.new_env(closure.env);
                self.environments[id]
                    .bind(closure.params[0].clone(), Value::Eta(closure.clone()));

                self.control.push(ControlItem::Gamma);
                self.control.push(ControlItem::EnvRemove(id));
                self.splice(closure.delta)?;

                self.stack.push(arg);
                self.current_env = id;
            }

            Value::Closure(closure) => {
                let id = self.new_env(closure.env);

                if closure.params.len() == 1 {
                    self.environments[id].bind(closure.params[0].clone(), arg);
                } else {
                    let Value::Tuple(items) = arg else {
                        return Err(RuntimeError::Type(format!(
                            "expected a tuple argument for a {}-parameter lambda",
                            closure.params.len()
                        )));
                    };
                    if items.len() != closure.params.len() {
                        return Err(RuntimeError::Type(format!(
                            "expected {} arguments, got {}",
                            closure.params.len(),
                            items.len()
                        )));
                    }
                    for (param, value) in closure.params.iter().zip(items) {
                        self.environments[id].bind(param.clone(), value);
                    }
                }

                self.control.push(ControlItem::EnvRemove(id));
                self.splice(closure.delta)?;
                self.current_env = id;
            }

            other => {
                return Err(RuntimeError::Type(format!(
                    "cannot apply non-function: {other}"
                )))
            }
        }

        Ok(())
    }

    fn record(&mut self, instruction: &ControlItem) {
        let control = self
            .control
            .iter()
            .rev()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let stack = self
            .stack
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let active = self
            .environments
            .iter()
            .filter(|env| !env.removed)
            .map(|env| format!("e{}", env.id))
            .collect::<Vec<_>>()
            .join(", ");

        self.trace.push(TraceStep {
            instruction: instruction.to_string(),
            control: format!("[{control}]"),
            stack: format!("[{stack}]"),
            env: self.current_env,
            active: format!("[{active}]"),
        });
    }

    pub fn render_trace(&self) -> String {
        let mut out = String::new();
        for (index, step) in self.trace.iter().enumerate() {
            out.push_str(&format!(
                "Step {}:\n  Instruction: {}\n  Control: {}\n  Stack: {}\n  Current Env: e{}\n  Active Envs: {}\n",
                index + 1,
                step.instruction,
                step.control,
                step.stack,
                step.env,
                step.active,
            ));
        }
        out
    }
}
