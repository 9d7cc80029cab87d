use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::class::{KloxClass, KloxInstance};
use crate::environment::Environment;
use crate::error::KloxError;
use crate::function::KloxFunction;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local exits threaded through every evaluator `Result`.
///
/// `Return` unwinds to the nearest call frame; `Failure` unwinds to the
/// top-level `interpret` call.  A sentinel `Value` would not do, since any
/// `Value` is a legitimate return value.
#[derive(Debug)]
pub enum Signal {
    Return(Value),
    Failure(KloxError),
}

impl From<KloxError> for Signal {
    fn from(error: KloxError) -> Self {
        Signal::Failure(error)
    }
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Expression id → hop distance, filled in by the resolver.  Absent
    /// means global.
    locals: HashMap<usize, usize>,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock_native,
            },
        );

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Record a resolved local binding distance for an expression node.
    pub fn note_local(&mut self, id: usize, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Record that an expression refers to a global; absence from the side
    /// table already means global, so this only traces.
    pub fn note_global(&mut self, id: usize) {
        debug!("Expression #{} resolves to a global", id);
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), KloxError> {
        for statement in statements {
            if let Err(signal) = self.execute(statement) {
                return match signal {
                    Signal::Failure(e) => Err(e),

                    Signal::Return(_) => {
                        unreachable!("top-level 'return' survived static resolution")
                    }
                };
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value).map_err(KloxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = self.evaluate(initializer)?;

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                let function = KloxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Signal::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` with `environment` as the current frame, restoring
    /// the previous frame on every exit path, including `Return` unwinds.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<(), Signal> {
        let previous = Rc::clone(&self.environment);

        self.environment = environment;

        let mut result = Ok(());
        for statement in statements {
            result = self.execute(statement);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), Signal> {
        let superclass_value = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    // The parser only ever stores a Variable here.
                    let token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };

                    return Err(runtime_error(token, "Superclass must be a class."));
                }
            },

            None => None,
        };

        // Method closures capture a frame holding `super` when there is a
        // superclass; otherwise they capture the surrounding frame directly.
        let previous = Rc::clone(&self.environment);

        if let Some(sc) = &superclass_value {
            let mut environment = Environment::with_enclosing(Rc::clone(&self.environment));
            environment.define("super", Value::Class(Rc::clone(sc)));
            self.environment = Rc::new(RefCell::new(environment));
        }

        let mut method_table: HashMap<String, Rc<KloxFunction>> = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function =
                KloxFunction::new(Rc::clone(method), Rc::clone(&self.environment), is_initializer);

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        self.environment = previous;

        let class = KloxClass::new(name.lexeme.clone(), superclass_value, method_table);

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, Signal> {
        match expr {
            Expr::Literal(token) => Ok(evaluate_literal(token)),

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

            Expr::Variable { id, name } => self.lookup_variable(*id, name),

            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                self.assign_variable(*id, name, value.clone())?;

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => self.evaluate_get(object, name),

            Expr::Set {
                object,
                name,
                value,
            } => self.evaluate_set(object, name, value),

            Expr::Super { id, method, .. } => self.evaluate_super(*id, method),
        }
    }

    fn lookup_variable(&self, id: usize, name: &Token) -> Result<Value, Signal> {
        let value = match self.locals.get(&id) {
            // A recorded distance is guaranteed by the resolver; a miss here
            // is a resolver/evaluator desync, not a user error.
            Some(&distance) => Some(
                Environment::get_at(&self.environment, distance, &name.lexeme)
                    .unwrap_or_else(|| panic!("'{}' missing at resolved depth", name.lexeme)),
            ),

            None => self.globals.borrow().get(&name.lexeme),
        };

        value.ok_or_else(|| {
            runtime_error(name, format!("Undefined variable '{}'.", name.lexeme))
        })
    }

    fn assign_variable(&mut self, id: usize, name: &Token, value: Value) -> Result<(), Signal> {
        let assigned = match self.locals.get(&id) {
            Some(&distance) => {
                let ok = Environment::assign_at(&self.environment, distance, &name.lexeme, value);
                assert!(ok, "'{}' missing at resolved depth", name.lexeme);
                true
            }

            None => self.globals.borrow_mut().assign(&name.lexeme, value),
        };

        if assigned {
            Ok(())
        } else {
            Err(runtime_error(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, Signal> {
        let value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(runtime_error(operator, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => unreachable!("non-unary operator in Unary node"),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, Signal> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(runtime_error(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(runtime_error(operator, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(runtime_error(operator, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(runtime_error(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(runtime_error(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(runtime_error(operator, "Operands must be numbers.")),
            },

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(runtime_error(operator, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(runtime_error(operator, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_val, &right_val))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_val, &right_val))),

            _ => unreachable!("non-binary operator in Binary node"),
        }
    }

    fn evaluate_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, Signal> {
        let left_val = self.evaluate(left)?;

        match operator.token_type {
            TokenType::OR if is_truthy(&left_val) => Ok(left_val),

            TokenType::AND if !is_truthy(&left_val) => Ok(left_val),

            _ => self.evaluate(right),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> Result<Value, Signal> {
        let callee_val = self.evaluate(callee)?;

        let mut arg_values: Vec<Value> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            arg_values.push(self.evaluate(argument)?);
        }

        match callee_val {
            Value::NativeFunction { arity, func, .. } => {
                check_arity(arity, arg_values.len(), paren)?;

                func(&arg_values).map_err(|message| runtime_error(paren, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arg_values.len(), paren)?;

                function.call(self, arg_values)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arg_values.len(), paren)?;

                let instance = Value::Instance(Rc::new(RefCell::new(KloxInstance::new(
                    Rc::clone(&class),
                ))));

                if let Some(initializer) = class.find_method("init") {
                    initializer.bind(instance.clone()).call(self, arg_values)?;
                }

                Ok(instance)
            }

            _ => Err(runtime_error(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    fn evaluate_get(&mut self, object: &Expr, name: &Token) -> Result<Value, Signal> {
        let object_val = self.evaluate(object)?;

        match &object_val {
            Value::Instance(instance) => {
                if let Some(value) = instance.borrow().field(&name.lexeme) {
                    return Ok(value);
                }

                let method = instance.borrow().class().find_method(&name.lexeme);

                match method {
                    Some(method) => Ok(Value::Function(Rc::new(method.bind(object_val.clone())))),

                    None => Err(runtime_error(
                        name,
                        format!("Undefined property '{}'.", name.lexeme),
                    )),
                }
            }

            _ => Err(runtime_error(name, "Only instances have properties.")),
        }
    }

    fn evaluate_set(
        &mut self,
        object: &Expr,
        name: &Token,
        value: &Expr,
    ) -> Result<Value, Signal> {
        let object_val = self.evaluate(object)?;

        match object_val {
            Value::Instance(instance) => {
                let value = self.evaluate(value)?;

                instance.borrow_mut().set(&name.lexeme, value.clone());

                Ok(value)
            }

            _ => Err(runtime_error(name, "Only instances have fields.")),
        }
    }

    fn evaluate_super(&mut self, id: usize, method: &Token) -> Result<Value, Signal> {
        let distance = *self
            .locals
            .get(&id)
            .expect("'super' reached the evaluator unresolved");

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,

            _ => unreachable!("'super' bound to a non-class"),
        };

        // `this` always sits one frame inside the `super` frame.
        let instance = match Environment::get_at(&self.environment, distance - 1, "this") {
            Some(instance @ Value::Instance(_)) => instance,

            _ => unreachable!("'this' missing inside a method body"),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),

            None => Err(runtime_error(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate_literal(token: &Token) -> Value {
    match &token.token_type {
        TokenType::NUMBER(n) => Value::Number(*n),

        TokenType::STRING(s) => Value::String(s.clone()),

        TokenType::TRUE => Value::Bool(true),

        TokenType::FALSE => Value::Bool(false),

        TokenType::NIL => Value::Nil,

        _ => unreachable!("non-literal token in Literal node"),
    }
}

fn check_arity(arity: usize, got: usize, paren: &Token) -> Result<(), Signal> {
    if arity == got {
        Ok(())
    } else {
        Err(runtime_error(
            paren,
            format!("Expected {} arguments but got {}.", arity, got),
        ))
    }
}

fn runtime_error(token: &Token, message: impl Into<String>) -> Signal {
    Signal::Failure(KloxError::runtime(token, message))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn is_equal(left: &Value, right: &Value) -> bool {
    left == right
}

fn clock_native(_args: &[Value]) -> Result<Value, String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
