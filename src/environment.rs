use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A single lexical frame: name-to-value slots plus an optional link to the
/// enclosing frame.  Frames are shared (`Rc<RefCell<_>>`) because closures
/// keep their defining frame alive after the block that created it exits.
#[derive(Debug, Default)]
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

    /// Bind `name` in this frame, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look up `name`, walking outward through the chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Assign to an existing binding, walking outward through the chain.
    /// Returns `false` when no frame binds `name`.
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

    /// Look up `name` in the frame exactly `distance` links outward.
    ///
    /// Used for resolver-slotted variables; the distance comes from the
    /// static analysis, so a miss means the binding was removed out from
    /// under us and the caller reports it as an undefined variable.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        Self::ancestor(env, distance)
            .and_then(|frame| frame.borrow().values.get(name).cloned())
    }

    /// Assign to `name` in the frame exactly `distance` links outward.
    /// Returns `false` when that frame does not bind `name`.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        match Self::ancestor(env, distance) {
            Some(frame) => {
                frame.borrow_mut().values.insert(name.to_string(), value);
                true
            }

            None => false,
        }
    }

    /// Walk `distance` enclosing links outward from `env`.
    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut frame: Rc<RefCell<Environment>> = env.clone();

        for _ in 0..distance {
            let next: Option<Rc<RefCell<Environment>>> = frame.borrow().enclosing.clone();
            frame = next?;
        }

        Some(frame)
    }
}
