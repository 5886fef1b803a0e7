use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::LoxError;
use crate::function::LoxFunction;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Control transfer out of statement execution.  `Return` is produced only
/// by return statements and intercepted only at the function-call boundary
/// in [`LoxFunction::call`]; it is never conflated with `Error`.
pub enum Unwind {
    Error(LoxError),
    Return(Value),
}

impl From<LoxError> for Unwind {
    fn from(e: LoxError) -> Self {
        Unwind::Error(e)
    }
}

/// Tree-walking evaluator.  Program output (the `print` statement) goes to
/// the `output` sink, which tests point at a buffer.
pub struct Interpreter<W: Write> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    output: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(output: W) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        // The global frame is empty at this point, so define cannot fail.
        globals
            .borrow_mut()
            .define(
                "clock",
                Value::NativeFunction {
                    name: "clock".to_string(),
                    arity: 0,
                    func: clock_native,
                },
            )
            .ok();

        Interpreter {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Records a binding distance for an expression identity.  Called by the
    /// resolver; absent entries mean "global, resolve by name".
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}

                Err(Unwind::Error(e)) => return Err(e),

                // The resolver rejects top-level returns, so an unwind can
                // only escape here if that pass was skipped.
                Err(Unwind::Return(_)) => {
                    return Err(LoxError::runtime(
                        0,
                        "'return' escaped to top-level code.".to_string(),
                    ))
                }
            }
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.define(name, value)?;

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
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
                let function =
                    LoxFunction::new(declaration.clone(), self.environment.clone(), false);

                self.define(&declaration.name, Value::Function(Rc::new(function)))?;

                Ok(())
            }

            Stmt::Return { keyword: _, value } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.execute_class(name, superclass.as_ref(), methods)?;

                Ok(())
            }
        }
    }

    /// Runs `statements` in `environment`, restoring the previous frame on
    /// every exit path, including errors and return unwinds.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result: Result<(), Unwind> = Ok(());

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
    ) -> Result<(), LoxError> {
        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(LoxError::runtime(
                        name.line,
                        "Superclass must be a class.".to_string(),
                    ))
                }
            },

            None => None,
        };

        // Two-step define/assign so the class name is bound while method
        // closures capture the surrounding environment.
        self.define(name, Value::Nil)?;

        let mut environment = self.environment.clone();

        if let Some(class) = &superclass_value {
            environment = Rc::new(RefCell::new(Environment::with_enclosing(environment)));

            // Fresh frame, cannot collide.
            environment
                .borrow_mut()
                .define("super", Value::Class(class.clone()))
                .ok();
        }

        let mut method_map: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";

            let function = LoxFunction::new(method.clone(), environment.clone(), is_initializer);

            method_map.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_map);

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)))
            .map_err(|message| LoxError::runtime(name.line, message))?;

        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, LoxError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
            }),

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
            } => {
                let left_value: Value = self.evaluate(left)?;

                // Short-circuit: yield the operand that decided the result.
                if operator.token_type == TokenType::OR {
                    if is_truthy(&left_value) {
                        return Ok(left_value);
                    }
                } else if !is_truthy(&left_value) {
                    return Ok(left_value);
                }

                self.evaluate(right)
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => {
                        self.environment
                            .borrow_mut()
                            .assign_at(*distance, &name.lexeme, value.clone());
                    }

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone())
                            .map_err(|message| LoxError::runtime(name.line, message))?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        if let Some(field) = instance.borrow().field(&name.lexeme) {
                            return Ok(field);
                        }

                        let method = instance.borrow().class().find_method(&name.lexeme);

                        match method {
                            Some(method) => {
                                Ok(Value::Function(Rc::new(method.bind(&instance)?)))
                            }

                            // An unset property reads as nil.
                            None => Ok(Value::Nil),
                        }
                    }

                    _ => Err(LoxError::runtime(
                        name.line,
                        "Only instances have properties.".to_string(),
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value)?;

                        instance.borrow_mut().set(&name.lexeme, value.clone());

                        Ok(value)
                    }

                    _ => Err(LoxError::runtime(
                        name.line,
                        "Only instances have fields.".to_string(),
                    )),
                }
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> Result<Value, LoxError> {
        let callee_value: Value = self.evaluate(callee)?;

        match callee_value {
            Value::NativeFunction { arity, func, .. } => {
                let argument_values = self.evaluate_arguments(arguments)?;

                self.check_arity(arity, argument_values.len(), paren)?;

                func(&argument_values).map_err(|message| LoxError::runtime(paren.line, message))
            }

            Value::Function(function) => {
                let argument_values = self.evaluate_arguments(arguments)?;

                self.check_arity(function.arity(), argument_values.len(), paren)?;

                function.call(self, argument_values)
            }

            Value::Class(class) => {
                let argument_values = self.evaluate_arguments(arguments)?;

                self.check_arity(class.arity(), argument_values.len(), paren)?;

                let instance = Rc::new(RefCell::new(LoxInstance::new(class.clone())));

                if let Some(initializer) = class.find_method("init") {
                    initializer.bind(&instance)?.call(self, argument_values)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.".to_string(),
            )),
        }
    }

    fn evaluate_arguments(&mut self, arguments: &[Expr]) -> Result<Vec<Value>, LoxError> {
        let mut values: Vec<Value> = Vec::with_capacity(arguments.len());

        for argument in arguments {
            values.push(self.evaluate(argument)?);
        }

        Ok(values)
    }

    fn check_arity(&self, expected: usize, got: usize, paren: &Token) -> Result<(), LoxError> {
        if expected != got {
            return Err(LoxError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", expected, got),
            ));
        }

        Ok(())
    }

    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token,
        method: &Token,
    ) -> Result<Value, LoxError> {
        let distance: usize = match self.locals.get(&id) {
            Some(distance) => *distance,
            None => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Variable is not found".to_string(),
                ))
            }
        };

        let superclass = match self.environment.borrow().get_at(distance, "super") {
            Some(Value::Class(class)) => class,

            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Variable is not found".to_string(),
                ))
            }
        };

        // The synthetic `this` scope sits directly inside the `super` scope,
        // so `super` can never resolve at depth 0.
        let this_distance: usize = distance.checked_sub(1).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Variable is not found".to_string())
        })?;

        let instance = match self.environment.borrow().get_at(this_distance, "this") {
            Some(Value::Instance(instance)) => instance,

            _ => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Variable is not found".to_string(),
                ))
            }
        };

        let resolved = superclass.find_method(&method.lexeme).ok_or_else(|| {
            LoxError::runtime(
                method.line,
                format!("Undefined property '{}'", method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(resolved.bind(&instance)?)))
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, LoxError> {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.".to_string(),
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(LoxError::runtime(
                operator.line,
                "Unexpected unary expression".to_string(),
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, LoxError> {
        let left_value: Value = self.evaluate(left)?;
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.".to_string(),
                )),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(self.numbers_expected(operator)),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(self.numbers_expected(operator)),
            },

            // Division by zero follows IEEE-754: it yields inf or NaN.
            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(self.numbers_expected(operator)),
            },

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(self.numbers_expected(operator)),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(self.numbers_expected(operator)),
            },

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(self.numbers_expected(operator)),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(self.numbers_expected(operator)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value == right_value)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_value != right_value)),

            _ => Err(LoxError::runtime(
                operator.line,
                "Unexpected binary expression".to_string(),
            )),
        }
    }

    fn numbers_expected(&self, operator: &Token) -> LoxError {
        LoxError::runtime(operator.line, "Operands must be numbers.".to_string())
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value, LoxError> {
        match self.locals.get(&id) {
            Some(distance) => self
                .environment
                .borrow()
                .get_at(*distance, &name.lexeme)
                .ok_or_else(|| LoxError::runtime(name.line, "Variable is not found".to_string())),

            None => self
                .globals
                .borrow()
                .get(&name.lexeme)
                .map_err(|message| LoxError::runtime(name.line, message)),
        }
    }

    fn define(&mut self, name: &Token, value: Value) -> Result<(), LoxError> {
        self.environment
            .borrow_mut()
            .define(&name.lexeme, value)
            .map_err(|message| LoxError::runtime(name.line, message))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn clock_native(_args: &[Value]) -> Result<Value, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?;

    Ok(Value::Number(now.as_millis() as f64))
}
