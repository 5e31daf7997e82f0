//! Tree‑walking evaluator.
//!
//! Statements run against a *current environment* that starts at the global
//! frame.  Variable nodes carry the distance the resolver computed, so reads
//! and writes of locals go straight to the right frame; unresolved names are
//! globals.
//!
//! `execute` returns [`Unwind`], which separates a `return` on its way to the
//! enclosing call from a real [`RuntimeError`].  Only
//! [`LoxFunction::call`](crate::function::LoxFunction::call) consumes the
//! `Return` case; `evaluate` can therefore only fail with a `RuntimeError`.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Depth, Expr, LiteralValue, Stmt};
use crate::class::{LoxClass, LoxInstance, INITIALIZER};
use crate::environment::{self, EnvRef, Environment};
use crate::error::RuntimeError;
use crate::function::{self, LoxFunction};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Why statement execution stopped early.
#[derive(Debug)]
pub enum Unwind {
    /// A `return` travelling to its function‑call boundary.
    Return { value: Value, keyword: Token },

    /// A runtime error travelling to the driver.
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Self {
        Unwind::Error(e)
    }
}

/// Convenient alias for statement execution results.
pub type ExecResult = Result<(), Unwind>;

/// Convenient alias for expression evaluation results.
pub type EvalResult = Result<Value, RuntimeError>;

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates a new Interpreter whose `print` statements write to `output`,
    /// and defines native functions such as `clock`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new_ref(None);

        for native in function::natives() {
            debug!("Defining native function '{}'", native.name);

            globals
                .borrow_mut()
                .define(native.name, Value::NativeFunction(Rc::new(native)));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            output,
        }
    }

    /// Interprets a list of resolved statements (a "program").
    ///
    /// Stops at the first runtime error.  Blocks restore their enclosing frame
    /// on the way out, so a prompt session can carry on afterwards.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                // Only reachable for statements that skipped the resolver.
                Err(Unwind::Return { keyword, .. }) => {
                    debug!("Return signal reached top level");
                    return Err(RuntimeError::new(
                        &keyword,
                        "Can't return from top-level code.",
                    ));
                }

                Err(Unwind::Error(e)) => {
                    debug!("Runtime error: {}", e);
                    return Err(e);
                }
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Names currently bound in the global frame.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print { keyword, value } => {
                let value: Value = self.evaluate(value)?;
                debug!("Printing value: {}", value);

                writeln!(self.output, "{}", value).map_err(|e| {
                    RuntimeError::new(keyword, format!("Failed to write output: {}", e))
                })?;
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let env: EnvRef = Environment::new_ref(Some(Rc::clone(&self.environment)));
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                // Captures the current frame by reference: this is the closure.
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
                Ok(())
            }

            Stmt::Return { keyword, value } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);

                Err(Unwind::Return {
                    value,
                    keyword: keyword.clone(),
                })
            }

            Stmt::Class(decl) => {
                self.execute_class(decl)?;
                Ok(())
            }
        }
    }

    /// Run `statements` in `env`, restoring the previous frame on every exit
    /// path (normal completion, `return`, or error).
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> ExecResult {
        let previous: EnvRef = std::mem::replace(&mut self.environment, env);

        let result: ExecResult = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;
        result
    }

    fn execute_class(&mut self, decl: &ClassDecl) -> Result<(), RuntimeError> {
        debug!("Defining class '{}'", decl.name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match &decl.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => &decl.name,
                    };
                    return Err(RuntimeError::new(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&decl.name.lexeme, Value::Nil);

        // Methods of a subclass close over one extra frame holding `super`.
        let method_env: EnvRef = match &superclass {
            Some(superclass) => {
                let env: EnvRef = Environment::new_ref(Some(Rc::clone(&self.environment)));
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(superclass)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, LoxFunction> = decl
            .methods
            .iter()
            .map(|method| {
                let is_initializer: bool = method.name.lexeme == INITIALIZER;
                let function =
                    LoxFunction::new(Rc::clone(method), Rc::clone(&method_env), is_initializer);
                (method.name.lexeme.clone(), function)
            })
            .collect();

        let class = LoxClass::new(decl.name.lexeme.clone(), superclass, methods);

        self.environment
            .borrow_mut()
            .assign(&decl.name, Value::Class(Rc::new(class)))?;

        info!("Class '{}' defined", decl.name.lexeme);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::string(s.as_str()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::new(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { name, depth } => self.look_up_variable(name, depth),

            Expr::Assign { name, value, depth } => {
                let value: Value = self.evaluate(value)?;

                match depth.get() {
                    Some(distance) => {
                        environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee, paren, args)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(RuntimeError::new(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::new(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::This { keyword, depth } => self.look_up_variable(keyword, depth),

            Expr::Super {
                keyword,
                method,
                depth,
            } => self.evaluate_super(keyword, method, depth),
        }
    }

    fn look_up_variable(&self, name: &Token, depth: &Depth) -> EvalResult {
        match depth.get() {
            Some(distance) => environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: look the method up on the superclass stored next to
    /// the method's closure, then bind it to the current `this`, which lives
    /// one frame closer.
    fn evaluate_super(&self, keyword: &Token, method: &Token, depth: &Depth) -> EvalResult {
        let Some(distance) = depth.get() else {
            return Err(RuntimeError::new(keyword, "Can't use 'super' here."));
        };

        let superclass: Rc<LoxClass> =
            match environment::get_name_at(&self.environment, distance, "super") {
                Some(Value::Class(class)) => class,
                _ => return Err(RuntimeError::new(keyword, "Superclass is not bound.")),
            };

        let instance: Value = distance
            .checked_sub(1)
            .and_then(|d| environment::get_name_at(&self.environment, d, "this"))
            .ok_or_else(|| RuntimeError::new(keyword, "'this' is not bound."))?;

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(RuntimeError::new(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    /// Invokes a callable: native function, user function, or class.
    fn call_value(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> EvalResult {
        let arity: usize = match &callee {
            Value::NativeFunction(native) => native.arity,
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(RuntimeError::new(
                    paren,
                    "Can only call functions and classes.",
                ))
            }
        };

        if args.len() != arity {
            return Err(RuntimeError::new(
                paren,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            ));
        }

        match callee {
            Value::NativeFunction(native) => native
                .call(&args)
                .map_err(|message| RuntimeError::new(paren, message)),
            Value::Function(function) => function.call(self, args),
            Value::Class(class) => LoxClass::instantiate(&class, self, args),
            _ => unreachable!("non-callables rejected above"),
        }
    }
}

/// Arithmetic, comparison and equality.  No implicit conversions: `+` takes
/// two numbers or two strings, everything else numeric takes two numbers.
fn binary(operator: &Token, left: Value, right: Value) -> EvalResult {
    use Value::{Bool, Number};

    match operator.token_type {
        TokenType::EQUAL_EQUAL => return Ok(Bool(left == right)),
        TokenType::BANG_EQUAL => return Ok(Bool(left != right)),
        TokenType::PLUS => {
            return match (left, right) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (Value::String(a), Value::String(b)) => {
                    Ok(Value::string(format!("{}{}", a, b)))
                }
                _ => Err(RuntimeError::new(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            }
        }
        _ => {}
    }

    let (Number(a), Number(b)) = (left, right) else {
        return Err(RuntimeError::new(operator, "Operands must be numbers."));
    };

    match operator.token_type {
        TokenType::MINUS => Ok(Number(a - b)),
        TokenType::STAR => Ok(Number(a * b)),
        TokenType::SLASH => Ok(Number(a / b)),
        TokenType::GREATER => Ok(Bool(a > b)),
        TokenType::GREATER_EQUAL => Ok(Bool(a >= b)),
        TokenType::LESS => Ok(Bool(a < b)),
        TokenType::LESS_EQUAL => Ok(Bool(a <= b)),
        _ => Err(RuntimeError::new(operator, "Invalid binary operator.")),
    }
}
