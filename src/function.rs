use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::error::LoxError;
use crate::interpreter::{Interpreter, Unwind};
use crate::value::Value;

/// A user-declared function or method, paired with the environment that was
/// current at its declaration.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
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

    /// Invokes the function body in a fresh frame under the closure.  A
    /// return unwind is intercepted here and nowhere else; runtime errors
    /// pass through unchanged.  Initializers always yield `this`.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<Value>,
    ) -> Result<Value, LoxError> {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment
                .borrow_mut()
                .define(&param.lexeme, argument)
                .map_err(|message| LoxError::runtime(param.line, message))?;
        }

        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => {}

            Err(Unwind::Return(value)) => {
                if !self.is_initializer {
                    return Ok(value);
                }
            }

            Err(Unwind::Error(e)) => return Err(e),
        }

        if self.is_initializer {
            // `bind` guarantees a `this` slot at depth 0 of the closure.
            return Ok(self
                .closure
                .borrow()
                .get_at(0, "this")
                .unwrap_or(Value::Nil));
        }

        Ok(Value::Nil)
    }

    /// Produces a copy of this function whose closure is a one-slot `this`
    /// scope wrapping the declaration closure.
    pub fn bind(&self, instance: &Rc<RefCell<LoxInstance>>) -> Result<LoxFunction, LoxError> {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        environment
            .borrow_mut()
            .define("this", Value::Instance(instance.clone()))
            .map_err(|message| LoxError::runtime(self.declaration.name.line, message))?;

        Ok(LoxFunction {
            declaration: self.declaration.clone(),
            closure: environment,
            is_initializer: self.is_initializer,
        })
    }
}

// The closure chain can reach back to this function through `this`/`super`
// scopes, so Debug stops at the name.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.declaration.name.lexeme)
            .finish_non_exhaustive()
    }
}
