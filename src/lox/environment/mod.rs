use std::{cell::RefCell, collections::HashMap, rc::Rc};

use super::{
    interpreter::{RuntimeError, RuntimeValue},
    scanner::tokens::Token,
};

/// Stores the variables and their values present in a scope. Scopes are chained outward to the
/// global one through `enclosing`.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, RuntimeValue>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new(enclosing: Option<Rc<RefCell<Environment>>>) -> Self {
        Self {
            values: HashMap::new(),
            enclosing,
        }
    }

    /// A fresh scope nested inside `enclosing`, ready to be shared.
    pub fn new_enclosed(enclosing: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Self::new(Some(Rc::clone(enclosing)))))
    }

    /// Define a variable in this scope. Defining a variable name multiple times is valid
    pub fn define(&mut self, name: String, val: RuntimeValue) {
        self.values.insert(name, val);
    }

    /// Gets a variable's value, searching enclosing scopes outward.
    pub fn get(&self, name: &Token) -> Result<RuntimeValue, RuntimeError> {
        if let Some(val) = self.values.get(&name.lexeme) {
            return Ok(val.clone());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(RuntimeError::UndefinedVariable { name: name.clone() }),
        }
    }

    /// Overwrites the nearest existing binding of `name`. Never creates a new one.
    pub fn assign(&mut self, name: &Token, val: RuntimeValue) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = val;
            return Ok(());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, val),
            None => Err(RuntimeError::UndefinedVariable { name: name.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lox::scanner::tokens::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::Identifier, name.to_owned(), None, 1)
    }

    #[test]
    fn test_lookup_walks_outward() {
        let globals = Rc::new(RefCell::new(Environment::new(None)));
        globals
            .borrow_mut()
            .define("a".to_owned(), RuntimeValue::Number(1.0));
        let inner = Environment::new_enclosed(&globals);

        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), RuntimeValue::Number(1.0));
    }

    #[test]
    fn test_shadowing_and_redefinition() {
        let globals = Rc::new(RefCell::new(Environment::new(None)));
        globals
            .borrow_mut()
            .define("a".to_owned(), RuntimeValue::Number(1.0));
        let inner = Environment::new_enclosed(&globals);
        inner
            .borrow_mut()
            .define("a".to_owned(), RuntimeValue::Number(2.0));
        inner
            .borrow_mut()
            .define("a".to_owned(), RuntimeValue::Number(3.0));

        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), RuntimeValue::Number(3.0));
        assert_eq!(globals.borrow().get(&ident("a")).unwrap(), RuntimeValue::Number(1.0));
    }

    #[test]
    fn test_assign_mutates_nearest_binding() {
        let globals = Rc::new(RefCell::new(Environment::new(None)));
        globals.borrow_mut().define("a".to_owned(), RuntimeValue::Nil);
        let inner = Environment::new_enclosed(&globals);

        inner
            .borrow_mut()
            .assign(&ident("a"), RuntimeValue::Boolean(true))
            .unwrap();

        assert_eq!(
            globals.borrow().get(&ident("a")).unwrap(),
            RuntimeValue::Boolean(true)
        );
        assert!(inner.borrow().values.is_empty());
    }

    #[test]
    fn test_undefined_variable() {
        let globals = Rc::new(RefCell::new(Environment::new(None)));
        let inner = Environment::new_enclosed(&globals);

        let err = inner.borrow().get(&ident("missing")).unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.");

        let err = inner
            .borrow_mut()
            .assign(&ident("missing"), RuntimeValue::Nil)
            .unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.");
        assert!(globals.borrow().values.is_empty());
    }
}
