//! Tree-walking evaluator for the Yellow language.
//!
//! The interpreter executes a resolved statement sequence against a current
//! environment chain.  Variable references that the resolver slotted are
//! looked up by walking exactly `distance` frames outward; everything else
//! resolves by name against the global frame, which is what lets the REPL
//! reference top-level names declared on later lines.
//!
//! `return` is modeled as [`Unwind::Return`], a signal distinct from runtime
//! errors: it is raised by the `return` statement and caught only at the
//! function-call boundary, so genuine errors can never be confused with
//! ordinary control flow.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::environment::Environment;
use crate::error::{Result, YellowError};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::native::{self, NativeError};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::{Value, YellowClass, YellowFunction, YellowInstance};

/// Non-local transfer during statement execution: either a genuine runtime
/// error or the `return` signal carrying its value.
#[derive(Debug)]
pub enum Unwind {
    Err(YellowError),
    Return(Value),
}

impl From<YellowError> for Unwind {
    fn from(e: YellowError) -> Self {
        Unwind::Err(e)
    }
}

impl From<io::Error> for Unwind {
    fn from(e: io::Error) -> Self {
        Unwind::Err(YellowError::Io(e))
    }
}

/// Result alias for evaluation, threading the [`Unwind`] signal.
pub type Exec<T> = std::result::Result<T, Unwind>;

fn runtime(line: usize, msg: impl Into<String>) -> Unwind {
    Unwind::Err(YellowError::runtime(line, msg))
}

fn undefined_variable(name: &Token) -> Unwind {
    runtime(
        name.line,
        format!("Undefined variable '{}'.", name.lexeme),
    )
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,

    /// Resolver-recorded scope distances, keyed by node identity.  Absence
    /// of an entry means "resolve in the global scope by name".
    locals: HashMap<ExprId, usize>,

    /// Sink for `print` statements and the write natives.  Injected so tests
    /// can capture program output.
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create an interpreter printing to standard output, with the native
    /// bridge installed into its global environment.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Create an interpreter printing to the given sink.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));
        native::install(&globals);

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Record a resolver distance for a binding-referencing expression.
    pub fn resolve_local(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local {:?} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Output sink accessor for the native bridge.
    pub(crate) fn out(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(Unwind::Err(e)) => return Err(e),

                // The resolver rejects top-level `return`, so the signal can
                // never reach here.
                Err(Unwind::Return(_)) => {
                    unreachable!("return signal escaped the function boundary")
                }
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ───────────────────────────── statements ───────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Exec<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                debug!("Entering block with {} statements", statements.len());

                let inner = Environment::with_enclosing(self.environment.clone());

                self.execute_block(statements, Rc::new(RefCell::new(inner)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The function closes over the environment active at its
                // declaration point, not at call time.
                let function = YellowFunction {
                    declaration: declaration.clone(),
                    closure: self.environment.clone(),
                    is_initializer: false,
                };

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Executes statements with `environment` installed as current, restoring
    /// the previous frame afterwards.  Restoration happens even when the body
    /// unwinds with a return signal or a runtime error.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Exec<()> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Exec<()> {
        debug!("Defining class '{}'", name.lexeme);

        // 1. Resolve and type-check the optional superclass reference.
        let superclass_value: Option<Rc<YellowClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(runtime(expr_line(expr), "Superclass must be a class"));
                }
            },

            None => None,
        };

        // 2. Declare the class name before building methods, so methods may
        //    reference the class recursively.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // 3. One extra frame binding `super`, used only while building
        //    method closures.
        let method_env: Rc<RefCell<Environment>> = match &superclass_value {
            Some(sc) => {
                let mut env = Environment::with_enclosing(self.environment.clone());
                env.define("super", Value::Class(sc.clone()));

                Rc::new(RefCell::new(env))
            }

            None => self.environment.clone(),
        };

        // 4. Build the method table; `init` gets the initializer flag.
        let mut method_table: HashMap<String, Rc<YellowFunction>> = HashMap::new();

        for method in methods {
            let function = YellowFunction {
                declaration: method.clone(),
                closure: method_env.clone(),
                is_initializer: method.name.lexeme == "init",
            };

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        // 5. Assign the finished class value to the declared name.
        let class = YellowClass {
            name: name.lexeme.clone(),
            methods: method_table,
            superclass: superclass_value,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ───────────────────────────── expressions ──────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(undefined_variable(name));
                        }
                    }

                    None => {
                        if !self.globals.borrow_mut().assign(&name.lexeme, value.clone()) {
                            return Err(undefined_variable(name));
                        }
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                debug!("Evaluating call expression");

                let callee_val = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.invoke_callable(&callee_val, paren, &args)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => self.instance_get(&instance, name),

                    _ => Err(runtime(name.line, "Only instances have properties")),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;

                        instance.borrow_mut().set_field(&name.lexeme, value.clone());

                        Ok(value)
                    }

                    _ => Err(runtime(name.line, "Only instances have fields")),
                }
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Exec<Value> {
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(runtime(operator.line, "Operand must be a number")),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),

            _ => Err(runtime(operator.line, "Invalid unary operator")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Exec<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(runtime(
                    operator.line,
                    "Operands must be two numbers or two strings",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a * b))
            }

            // IEEE-754 semantics: dividing by zero yields an infinity, not an
            // error.
            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left, &right))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left, &right))),

            _ => Err(runtime(operator.line, "Invalid binary operator")),
        }
    }

    /// Short-circuiting `and` / `or`: the right operand is evaluated only
    /// when the left operand's truthiness does not already decide the result.
    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Exec<Value> {
        let left = self.evaluate(left)?;

        match operator.token_type {
            TokenType::OR if is_truthy(&left) => Ok(left),

            TokenType::AND if !is_truthy(&left) => Ok(left),

            _ => self.evaluate(right),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Exec<Value> {
        let distance = match self.locals.get(&id) {
            Some(&distance) => distance,

            None => {
                return Err(runtime(
                    keyword.line,
                    "Can't use 'super' outside of a class",
                ));
            }
        };

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,

            _ => return Err(undefined_variable(keyword)),
        };

        // `this` always lives one frame inside the `super` frame.
        let instance = match Environment::get_at(&self.environment, distance.saturating_sub(1), "this") {
            Some(Value::Instance(instance)) => instance,

            _ => return Err(undefined_variable(keyword)),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),

            None => Err(runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Exec<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| undefined_variable(name)),

            None => self
                .globals
                .borrow()
                .get(&name.lexeme)
                .ok_or_else(|| undefined_variable(name)),
        }
    }

    // ─────────────────────────────── calls ──────────────────────────────────

    /// Invokes a callable (function, class, or native).  Arity mismatches and
    /// non-callable targets are errors raised here, before any body runs.
    fn invoke_callable(&mut self, callee: &Value, paren: &Token, args: &[Value]) -> Exec<Value> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                check_arity(*arity, args.len(), paren)?;

                func(self, args)
                    .map_err(|NativeError(msg)| runtime(paren.line, msg))
            }

            Value::Function(function) => {
                debug!("Calling function '{}'", function.declaration.name.lexeme);

                check_arity(function.arity(), args.len(), paren)?;

                self.call_function(function, args)
            }

            Value::Class(class) => {
                debug!("Constructing instance of '{}'", class.name);

                check_arity(class.arity(), args.len(), paren)?;

                self.construct(class, args)
            }

            _ => Err(runtime(paren.line, "Can only call functions and classes.")),
        }
    }

    /// Calls an interpreted function: one fresh frame per call, parameters
    /// bound positionally, early `return` caught here.
    pub(crate) fn call_function(&mut self, function: &YellowFunction, args: &[Value]) -> Exec<Value> {
        let mut env = Environment::with_enclosing(function.closure.clone());

        for (param, arg) in function.declaration.params.iter().zip(args) {
            env.define(&param.lexeme, arg.clone());
        }

        let result = self.execute_block(&function.declaration.body, Rc::new(RefCell::new(env)));

        match result {
            Ok(()) => {
                if function.is_initializer {
                    self.initializer_receiver(function)
                } else {
                    Ok(Value::Nil)
                }
            }

            // An initializer returns its receiver even on explicit `return;`.
            Err(Unwind::Return(value)) => {
                if function.is_initializer {
                    self.initializer_receiver(function)
                } else {
                    Ok(value)
                }
            }

            Err(e) => Err(e),
        }
    }

    /// The `this` binding a bound initializer closes over.
    fn initializer_receiver(&self, function: &YellowFunction) -> Exec<Value> {
        Environment::get_at(&function.closure, 0, "this")
            .ok_or_else(|| runtime(function.declaration.name.line, "Undefined variable 'this'."))
    }

    /// Calls a class value: allocates an instance, then runs a bound `init`
    /// (found anywhere in the superclass chain) with the call's arguments.
    /// The instance is always the result, regardless of what `init` returns.
    fn construct(&mut self, class: &Rc<YellowClass>, args: &[Value]) -> Exec<Value> {
        let instance = Rc::new(RefCell::new(YellowInstance::new(class.clone())));

        if let Some(init) = class.find_method("init") {
            let bound = init.bind(instance.clone());
            self.call_function(&bound, args)?;
        }

        Ok(Value::Instance(instance))
    }

    /// Property read: own field first, then a resolved-and-bound method.
    fn instance_get(
        &mut self,
        instance: &Rc<RefCell<YellowInstance>>,
        name: &Token,
    ) -> Exec<Value> {
        if let Some(value) = instance.borrow().field(&name.lexeme) {
            return Ok(value);
        }

        let method = instance.borrow().class.find_method(&name.lexeme);
        if let Some(method) = method {
            return Ok(Value::Function(Rc::new(method.bind(instance.clone()))));
        }

        Err(runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }
}

// ─────────────────────────────── helpers ────────────────────────────────────

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Exec<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),

        _ => Err(runtime(operator.line, "Operands must be numbers")),
    }
}

fn check_arity(arity: usize, got: usize, paren: &Token) -> Exec<()> {
    if got != arity {
        return Err(runtime(
            paren.line,
            format!("Expected {} arguments but got {}", arity, got),
        ));
    }

    Ok(())
}

/// Line of the token anchoring an expression, for diagnostics.
fn expr_line(expr: &Expr) -> usize {
    match expr {
        Expr::Literal(_) => 0,
        Expr::Unary { operator, .. } => operator.line,
        Expr::Binary { operator, .. } | Expr::Logical { operator, .. } => operator.line,
        Expr::Grouping(inner) => expr_line(inner),
        Expr::Variable { name, .. } => name.line,
        Expr::Assign { name, .. } => name.line,
        Expr::Call { paren, .. } => paren.line,
        Expr::Get { name, .. } | Expr::Set { name, .. } => name.line,
        Expr::This { keyword, .. } => keyword.line,
        Expr::Super { keyword, .. } => keyword.line,
    }
}

/// `nil` and `false` are falsey; every other value is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Structural equality for numbers/strings/booleans, identity for reference
/// values, `nil` equal only to `nil`.
pub fn is_equal(left: &Value, right: &Value) -> bool {
    left == right
}
