use std::{cell::RefCell, io::Write, rc::Rc};

use super::{
    ast::{
        Assign, Binary, Block, Call, Expr, ExprVisitor, Function, Grouping, If, Jump, JumpKind,
        Literal, Logical, PrintExpression, PureExpression, Return, Stmt, StmtVisitor, Ternary,
        Unary, Variable, VariableDeclaration, While,
    },
    callable::{self, Callable},
    diagnostics::Diagnostics,
    environment::Environment,
    scanner::tokens::{fmt_number, ParsedValue, Token, TokenType},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Operand must be a number.")]
    InvalidOperand { operator: Token },
    #[error("Operands must be numbers.")]
    InvalidOperands { operator: Token },
    #[error("Operands must be two numbers or two strings.")]
    InvalidAddition { operator: Token },
    #[error("Undefined variable '{}'.", .name.lexeme)]
    UndefinedVariable { name: Token },
    #[error("Can only call functions and classes.")]
    CallNonCallable { paren: Token },
    #[error("Expected {expected} arguments but got {got}.")]
    WrongArgsNum {
        paren: Token,
        expected: usize,
        got: usize,
    },
    #[error("Could not write program output: {0}")]
    Output(#[from] std::io::Error),
}

impl RuntimeError {
    /// the token the error is attributed to, if the error came from the program itself
    pub fn token(&self) -> Option<&Token> {
        match self {
            RuntimeError::InvalidOperand { operator }
            | RuntimeError::InvalidOperands { operator }
            | RuntimeError::InvalidAddition { operator } => Some(operator),
            RuntimeError::UndefinedVariable { name } => Some(name),
            RuntimeError::CallNonCallable { paren } | RuntimeError::WrongArgsNum { paren, .. } => {
                Some(paren)
            }
            RuntimeError::Output(_) => None,
        }
    }
}

/// How a statement finished. Anything other than `Normal` unwinds to the construct that handles
/// it: loops take `Break` and `Continue`, function calls take `Return`.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(RuntimeValue),
    Break,
    Continue,
}

/// Values computed at runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeValue {
    Boolean(bool),
    String(String),
    Number(f64),
    Callable(Callable),
    Nil,
}

impl From<ParsedValue> for RuntimeValue {
    fn from(val: ParsedValue) -> Self {
        match val {
            ParsedValue::Boolean(v) => RuntimeValue::Boolean(v),
            ParsedValue::String(v) => RuntimeValue::String(v),
            ParsedValue::Number(v) => RuntimeValue::Number(v),
            ParsedValue::Nil => RuntimeValue::Nil,
        }
    }
}

impl std::fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeValue::Boolean(val) => write!(f, "{val}"),
            RuntimeValue::String(val) => write!(f, "{val}"),
            RuntimeValue::Number(val) => fmt_number(f, *val),
            RuntimeValue::Callable(callable) => write!(f, "{callable}"),
            RuntimeValue::Nil => write!(f, "nil"),
        }
    }
}

/// Tree-walking evaluator. Program output from `print` goes to `out`.
pub struct Interpreter<W: Write> {
    out: W,
    // scope statements currently execute in, the globals at top level
    environment: Rc<RefCell<Environment>>,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new(None)));

        // define native functions in the global environment
        globals
            .borrow_mut()
            .define("clock".to_owned(), RuntimeValue::Callable(callable::clock()));

        Self {
            out,
            environment: globals,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run top-level statements in order. The first runtime error is reported and stops the run;
    /// globals defined before it stay defined.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        for statement in statements {
            // a stray top-level break, continue or return just ends its statement
            if let Err(e) = self.execute(statement) {
                diagnostics.report_runtime(&e);
                break;
            }
        }
        if let Err(e) = self.out.flush() {
            diagnostics.report_runtime(&RuntimeError::from(e));
        }
    }

    fn execute(&mut self, statement: &Stmt) -> Result<Flow, RuntimeError> {
        self.visit_statement(statement)
    }

    /// Execute `statements` with `env` as the current scope. The previous scope is put back
    /// however the block is left.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> Result<Flow, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<RuntimeValue, RuntimeError> {
        self.visit_expr(expr)
    }
}

fn is_truthy(val: &RuntimeValue) -> bool {
    match val {
        RuntimeValue::Nil => false,
        RuntimeValue::Boolean(val) => *val,
        _ => true,
    }
}

/// both operands as numbers, or the error for `operator`
fn number_operands(
    operator: &Token,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (RuntimeValue::Number(left_num), RuntimeValue::Number(right_num)) => {
            Ok((*left_num, *right_num))
        }
        (_, _) => Err(RuntimeError::InvalidOperands {
            operator: operator.clone(),
        }),
    }
}

/// Visitor pattern that evaluates expressions
impl<W: Write> ExprVisitor<Result<RuntimeValue, RuntimeError>> for Interpreter<W> {
    fn visit_literal(&mut self, literal: &Literal) -> Result<RuntimeValue, RuntimeError> {
        Ok(literal.0.clone().into())
    }

    fn visit_grouping(&mut self, grouping: &Grouping) -> Result<RuntimeValue, RuntimeError> {
        self.evaluate(&grouping.0)
    }

    fn visit_unary(&mut self, unary: &Unary) -> Result<RuntimeValue, RuntimeError> {
        let inner_value = self.evaluate(&unary.right)?;
        match (&unary.operator.token_type, inner_value) {
            (TokenType::Minus, RuntimeValue::Number(num)) => Ok(RuntimeValue::Number(-num)),
            (TokenType::Bang, val) => Ok(RuntimeValue::Boolean(!is_truthy(&val))),
            // "-" operator with non-Number inner_value is invalid
            (_, _) => Err(RuntimeError::InvalidOperand {
                operator: unary.operator.clone(),
            }),
        }
    }

    fn visit_binary(&mut self, binary: &Binary) -> Result<RuntimeValue, RuntimeError> {
        let left_value = self.evaluate(&binary.left)?;
        let right_value = self.evaluate(&binary.right)?;
        let operator = &binary.operator;

        match operator.token_type {
            TokenType::Greater => {
                let (l, r) = number_operands(operator, &left_value, &right_value)?;
                Ok(RuntimeValue::Boolean(l > r))
            }
            TokenType::GreaterEqual => {
                let (l, r) = number_operands(operator, &left_value, &right_value)?;
                Ok(RuntimeValue::Boolean(l >= r))
            }
            TokenType::Less => {
                let (l, r) = number_operands(operator, &left_value, &right_value)?;
                Ok(RuntimeValue::Boolean(l < r))
            }
            TokenType::LessEqual => {
                let (l, r) = number_operands(operator, &left_value, &right_value)?;
                Ok(RuntimeValue::Boolean(l <= r))
            }
            // values of different types are never equal
            TokenType::EqualEqual => Ok(RuntimeValue::Boolean(left_value == right_value)),
            TokenType::BangEqual => Ok(RuntimeValue::Boolean(left_value != right_value)),
            TokenType::Minus => {
                let (l, r) = number_operands(operator, &left_value, &right_value)?;
                Ok(RuntimeValue::Number(l - r))
            }
            TokenType::Slash => {
                let (l, r) = number_operands(operator, &left_value, &right_value)?;
                Ok(RuntimeValue::Number(l / r))
            }
            TokenType::Star => {
                let (l, r) = number_operands(operator, &left_value, &right_value)?;
                Ok(RuntimeValue::Number(l * r))
            }
            // "+" is used for both number addition and string concatenation
            TokenType::Plus => match (left_value, right_value) {
                (RuntimeValue::Number(left_num), RuntimeValue::Number(right_num)) => {
                    Ok(RuntimeValue::Number(left_num + right_num))
                }
                (RuntimeValue::String(left_str), RuntimeValue::String(right_str)) => {
                    Ok(RuntimeValue::String(left_str + &right_str))
                }
                (_, _) => Err(RuntimeError::InvalidAddition {
                    operator: operator.clone(),
                }),
            },
            // comma operator: both sides evaluated, the right one is the result
            TokenType::Comma => Ok(right_value),
            _ => unreachable!("parser never builds a binary {:?}", operator.token_type),
        }
    }

    fn visit_logical(&mut self, logical: &Logical) -> Result<RuntimeValue, RuntimeError> {
        let left = self.evaluate(&logical.left)?;
        // check Or's shortcircuit
        if logical.operator.token_type == TokenType::Or {
            if is_truthy(&left) {
                return Ok(left);
            }
        } else {
            // check And's shortcircuit
            if !is_truthy(&left) {
                return Ok(left);
            }
        }
        self.evaluate(&logical.right)
    }

    fn visit_ternary(&mut self, ternary: &Ternary) -> Result<RuntimeValue, RuntimeError> {
        if is_truthy(&self.evaluate(&ternary.condition)?) {
            self.evaluate(&ternary.then_branch)
        } else {
            self.evaluate(&ternary.else_branch)
        }
    }

    fn visit_variable(&mut self, variable: &Variable) -> Result<RuntimeValue, RuntimeError> {
        self.environment.borrow().get(&variable.name)
    }

    fn visit_assign(&mut self, assign: &Assign) -> Result<RuntimeValue, RuntimeError> {
        let val = self.evaluate(&assign.value)?;
        self.environment
            .borrow_mut()
            .assign(&assign.name, val.clone())?;
        Ok(val)
    }

    fn visit_call(&mut self, call: &Call) -> Result<RuntimeValue, RuntimeError> {
        let callee = self.evaluate(&call.callee)?;
        let arguments = call
            .arguments
            .iter()
            .map(|a| self.evaluate(a))
            .collect::<Result<Vec<_>, RuntimeError>>()?;

        match callee {
            RuntimeValue::Callable(callable) => {
                if arguments.len() != callable.arity() {
                    return Err(RuntimeError::WrongArgsNum {
                        paren: call.paren.clone(),
                        expected: callable.arity(),
                        got: arguments.len(),
                    });
                }
                callable.call(self, arguments)
            }
            _ => Err(RuntimeError::CallNonCallable {
                paren: call.paren.clone(),
            }),
        }
    }
}

impl<W: Write> StmtVisitor<Result<Flow, RuntimeError>> for Interpreter<W> {
    fn visit_expression_statement(
        &mut self,
        expression: &PureExpression,
    ) -> Result<Flow, RuntimeError> {
        self.evaluate(&expression.0)?;
        Ok(Flow::Normal)
    }

    fn visit_print_statement(
        &mut self,
        print_expression: &PrintExpression,
    ) -> Result<Flow, RuntimeError> {
        let value = self.evaluate(&print_expression.0)?;
        writeln!(self.out, "{value}")?;
        Ok(Flow::Normal)
    }

    fn visit_variable_declaration(
        &mut self,
        variable_declaration: &VariableDeclaration,
    ) -> Result<Flow, RuntimeError> {
        let val = match &variable_declaration.initialiser {
            None => RuntimeValue::Nil,
            Some(init) => self.evaluate(init)?,
        };
        self.environment
            .borrow_mut()
            .define(variable_declaration.name.lexeme.clone(), val);
        Ok(Flow::Normal)
    }

    fn visit_block(&mut self, block: &Block) -> Result<Flow, RuntimeError> {
        let block_env = Environment::new_enclosed(&self.environment);
        self.execute_block(&block.inner, block_env)
    }

    fn visit_if(&mut self, if_statement: &If) -> Result<Flow, RuntimeError> {
        let cond = self.evaluate(&if_statement.condition)?;
        // execute the right branch
        if is_truthy(&cond) {
            self.execute(&if_statement.then_branch)
        } else if let Some(else_branch) = &if_statement.else_branch {
            self.execute(else_branch)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn visit_while(&mut self, while_statement: &While) -> Result<Flow, RuntimeError> {
        while is_truthy(&self.evaluate(&while_statement.condition)?) {
            match self.execute(&while_statement.body)? {
                Flow::Break => break,
                Flow::Return(val) => return Ok(Flow::Return(val)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn visit_function(&mut self, function: &Rc<Function>) -> Result<Flow, RuntimeError> {
        let func = Callable::Function {
            decl: Rc::clone(function),
            closure: Rc::clone(&self.environment),
        };
        self.environment
            .borrow_mut()
            .define(function.name.lexeme.clone(), RuntimeValue::Callable(func));
        Ok(Flow::Normal)
    }

    fn visit_return(&mut self, return_statement: &Return) -> Result<Flow, RuntimeError> {
        let val = match &return_statement.val {
            Some(expr) => self.evaluate(expr)?,
            None => RuntimeValue::Nil,
        };
        Ok(Flow::Return(val))
    }

    fn visit_jump(&mut self, jump: &Jump) -> Result<Flow, RuntimeError> {
        Ok(match jump.kind {
            JumpKind::Break => Flow::Break,
            JumpKind::Continue => Flow::Continue,
        })
    }
}
