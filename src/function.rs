//! Callable values: host‑implemented natives and user functions with closures.

use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::FunctionDecl;
use crate::environment::{self, EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{Interpreter, Unwind};
use crate::value::Value;

/// A function implemented by the host.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl NativeFunction {
    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A user function: its declaration plus the frame that was current where it
/// was defined.
#[derive(Clone)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this method whose closure gains one frame binding
    /// `this` to `instance`.  The original is left untouched.
    pub fn bind(&self, instance: Value) -> LoxFunction {
        let env: EnvRef = Environment::new_ref(Some(Rc::clone(&self.closure)));
        env.borrow_mut().define("this", instance);

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }

    /// Run the body in a fresh frame parented on the closure (never the
    /// caller's frame).  A `return` inside the body ends the call here.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling user-defined function '{}'", self.name());

        let env: EnvRef = Environment::new_ref(Some(Rc::clone(&self.closure)));
        for (param, arg) in self.declaration.params.iter().zip(args) {
            env.borrow_mut().define(&param.lexeme, arg);
        }

        let returned: Option<Value> =
            match interpreter.execute_block(&self.declaration.body, env) {
                Ok(()) => None,
                Err(Unwind::Return { value, .. }) => Some(value),
                Err(Unwind::Error(e)) => return Err(e),
            };

        // An initializer always yields its instance.
        if self.is_initializer {
            let this: Value =
                environment::get_name_at(&self.closure, 0, "this").unwrap_or(Value::Nil);
            return Ok(this);
        }

        let value: Value = returned.unwrap_or(Value::Nil);
        info!("Function '{}' returned: {}", self.name(), value);

        Ok(value)
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// `clock()`: seconds since the Unix epoch.
pub fn clock(_args: &[Value]) -> Result<Value, String> {
    let millis: i64 = chrono::Utc::now().timestamp_millis();

    Ok(Value::Number(millis as f64 / 1000.0))
}

/// Natives installed in every global environment.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        func: clock,
    }]
}
