use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// One scope frame: a name→value map plus an optional enclosing frame.
///
/// Lookups for *resolved* references use `get_at`/`assign_at`, which walk
/// exactly the hop distance the resolver recorded.  The chain-walking
/// `get`/`assign` serve the globals frame (and any unresolved fallback),
/// returning `None`/`false` so the caller can attach its own diagnostic.
#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// Read `name` in the frame exactly `distance` hops out.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        Self::ancestor(env, distance).borrow().values.get(name).cloned()
    }

    /// Overwrite `name` in the frame exactly `distance` hops out.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        let target = Self::ancestor(env, distance);
        let mut target = target.borrow_mut();

        if target.values.contains_key(name) {
            target.values.insert(name.to_string(), value);
            true
        } else {
            false
        }
    }

    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut env = Rc::clone(env);

        for _ in 0..distance {
            let next = env
                .borrow()
                .enclosing
                .clone()
                .expect("resolved scope depth exceeds the environment chain");
            env = next;
        }

        env
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
