//! Runtime variable scopes.
//!
//! Frames are shared through `Rc<RefCell<_>>`: a closure, a running call and
//! the global root may all hold the same frame, and an assignment through any
//! of them is visible to the rest.  Frames are never copied.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a frame.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// Wrap a fresh frame in a shared handle.
    pub fn new_ref(enclosing: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing,
        }))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Names bound directly in this frame.
    pub fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Bind `name` in this frame, replacing any earlier binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup along the whole chain.  Used for globals, which the
    /// resolver leaves unannotated.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }
}

/// The frame exactly `distance` links outward from `env`, or `None` when the
/// chain is shorter than that.
pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
    let mut frame: EnvRef = Rc::clone(env);

    for _ in 0..distance {
        let parent: EnvRef = frame.borrow().enclosing()?;
        frame = parent;
    }

    Some(frame)
}

/// Read a resolved local: no search, straight to the recorded frame.
pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value, RuntimeError> {
    debug!("get_at '{}' distance {}", name.lexeme, distance);

    let frame: EnvRef = ancestor(env, distance).ok_or_else(|| missing_frame(name, distance))?;
    let value: Option<Value> = frame.borrow().values.get(&name.lexeme).cloned();

    value.ok_or_else(|| undefined(name))
}

/// Same as [`get_at`] for names that are not source tokens (`this`, `super`).
pub fn get_name_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
    let frame: EnvRef = ancestor(env, distance)?;
    let value: Option<Value> = frame.borrow().values.get(name).cloned();
    value
}

pub fn assign_at(
    env: &EnvRef,
    distance: usize,
    name: &Token,
    value: Value,
) -> Result<(), RuntimeError> {
    debug!("assign_at '{}' distance {}", name.lexeme, distance);

    let frame: EnvRef = ancestor(env, distance).ok_or_else(|| missing_frame(name, distance))?;
    let mut frame = frame.borrow_mut();

    match frame.values.get_mut(&name.lexeme) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(undefined(name)),
    }
}

fn missing_frame(name: &Token, distance: usize) -> RuntimeError {
    RuntimeError::new(
        name,
        format!(
            "No scope {} level(s) out for variable '{}'.",
            distance, name.lexeme
        ),
    )
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
}
