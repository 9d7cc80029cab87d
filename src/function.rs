use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::interpreter::{Interpreter, Signal};
use crate::value::Value;

/// A user-declared function: its declaration, the environment captured when
/// the declaration executed, and whether it is a class initializer.
pub struct KloxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl KloxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        KloxFunction {
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

    /// Produce the bound-method copy: same declaration, but the closure is a
    /// fresh frame defining `this` around the original closure.
    pub fn bind(&self, instance: Value) -> KloxFunction {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", instance);

        KloxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }

    /// The body runs in a fresh frame inside the captured closure, never
    /// inside the caller's environment.  Initializers yield the bound `this`
    /// on every exit path.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, Signal> {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let result =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(environment)));

        match result {
            Ok(()) => {
                if self.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Signal::Return(value)) => {
                if self.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(value)
                }
            }

            Err(signal) => Err(signal),
        }
    }

    fn bound_this(&self) -> Value {
        Environment::get_at(&self.closure, 0, "this")
            .expect("initializer closure does not bind 'this'")
    }
}

impl Debug for KloxFunction {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
