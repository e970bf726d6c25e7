use std::{cell::RefCell, io::Write, rc::Rc};

use super::{
    ast::Function,
    environment::Environment,
    interpreter::{Flow, Interpreter, RuntimeError, RuntimeValue},
};

pub type NativeFn = Rc<dyn Fn(&[RuntimeValue]) -> RuntimeValue>;

/// User functions and builtins, unified behind one call interface.
#[derive(Clone)]
pub enum Callable {
    Function {
        decl: Rc<Function>,
        // functions "close-over" the environment in which they're declared
        closure: Rc<RefCell<Environment>>,
    },
    Native {
        name: &'static str,
        arity: usize,
        function: NativeFn,
    },
}

impl Callable {
    /// Execute the callable. The caller has already checked the arity.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, RuntimeError> {
        match self {
            Self::Function { decl, closure } => {
                tracing::trace!(name = %decl.name.lexeme, "calling function");
                // construct function environment
                let func_env = Environment::new_enclosed(closure);
                // define each argument under its parameter name
                for (name, arg) in decl.params.iter().zip(arguments) {
                    func_env.borrow_mut().define(name.lexeme.clone(), arg);
                }
                // a stray break or continue just ends the body
                match interpreter.execute_block(&decl.body, func_env)? {
                    Flow::Return(val) => Ok(val),
                    Flow::Normal | Flow::Break | Flow::Continue => Ok(RuntimeValue::Nil),
                }
            }
            Self::Native { function, .. } => Ok(function(&arguments)),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Native { arity, .. } => *arity,
            Self::Function { decl, .. } => decl.params.len(),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Native {
                    function: my_function,
                    ..
                },
                Self::Native {
                    function: their_function,
                    ..
                },
            ) => Rc::ptr_eq(my_function, their_function),
            // the same declaration closed over the same scope is the same function
            (
                Self::Function {
                    decl: my_decl,
                    closure: my_closure,
                },
                Self::Function {
                    decl: their_decl,
                    closure: their_closure,
                },
            ) => Rc::ptr_eq(my_decl, their_decl) && Rc::ptr_eq(my_closure, their_closure),
            (_, _) => false,
        }
    }
}

impl std::fmt::Display for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native { .. } => write!(f, "<native fn>"),
            Self::Function { decl, .. } => write!(f, "<fn {}>", decl.name.lexeme),
        }
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native { name, arity, .. } => write!(f, "<native fn {name}/{arity}>"),
            Self::Function { decl, .. } => write!(f, "<fn {}/{}>", decl.name.lexeme, decl.params.len()),
        }
    }
}

/// `clock()`: seconds since the Unix epoch.
pub fn clock() -> Callable {
    Callable::Native {
        name: "clock",
        arity: 0,
        function: Rc::new(|_: &[RuntimeValue]| {
            let since_epoch = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default();
            RuntimeValue::Number(since_epoch.as_secs_f64())
        }),
    }
}
