use std::collections::HashMap;

use super::value::Value;

/// One frame of name bindings. Frames form a tree through parent ids and
/// are owned by the machine in an append-only vector; `removed` only
/// influences which frame counts as current, storage is never reclaimed
/// during a run.
#[derive(Debug, Clone)]
pub struct Environment {
    pub id: usize,
    pub parent: Option<usize>,
    bindings: HashMap<String, Value>,
    pub removed: bool,
}

impl Environment {
    pub fn new(id: usize, parent: Option<usize>) -> Self {
        Self {
            id,
            parent,
            bindings: HashMap::new(),
            removed: false,
        }
    }

    pub fn bind(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}
