use std::rc::Rc;

use thiserror::Error;

use super::{
    ast::{
        Assign, Binary, Block, Call, Expr, Function, Grouping, If, Jump, JumpKind, Literal,
        Logical, PrintExpression, PureExpression, Return, Stmt, Ternary, Unary, Variable,
        VariableDeclaration, While,
    },
    diagnostics::Diagnostics,
    scanner::tokens::{ParsedValue, Token, TokenType},
};

/// Most parameters or arguments a single function or call can have.
const MAX_ARITY: usize = 255;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{message}")]
    UnexpectedToken { token: Token, message: String },
    #[error("Expect expression.")]
    ExpectedExpression { token: Token },
    #[error("Invalid assignment target.")]
    InvalidAssignmentTarget { token: Token },
    #[error("Can't have more than 255 parameters.")]
    TooManyParameters { token: Token },
    #[error("Can't have more than 255 arguments.")]
    TooManyArguments { token: Token },
}

impl ParseError {
    /// the token the error should be reported at
    pub fn token(&self) -> &Token {
        match self {
            ParseError::UnexpectedToken { token, .. }
            | ParseError::ExpectedExpression { token }
            | ParseError::InvalidAssignmentTarget { token }
            | ParseError::TooManyParameters { token }
            | ParseError::TooManyArguments { token } => token,
        }
    }
}

pub struct Parser<'t, 'd> {
    current: usize,
    tokens: &'t [Token],
    diagnostics: &'d mut Diagnostics,
}

impl<'t, 'd> Parser<'t, 'd> {
    /// `tokens` must end with an Eof token, as produced by the scanner
    pub fn new(tokens: &'t [Token], diagnostics: &'d mut Diagnostics) -> Self {
        Parser {
            current: 0,
            tokens,
            diagnostics,
        }
    }

    /// Parse every declaration in the token stream. Declarations containing a syntax error are
    /// reported and left out of the result.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = vec![];
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        tracing::debug!(count = statements.len(), "parsed statements");
        statements
    }

    /// get the next token without advancing
    fn peek(&self) -> &'t Token {
        let tokens: &'t [Token] = self.tokens;
        // the Eof token is never consumed, so clamp to it
        &tokens[self.current.min(tokens.len() - 1)]
    }

    fn previous(&self) -> &'t Token {
        let tokens: &'t [Token] = self.tokens;
        &tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    /// advance our current position in the token stream by 1 and return the consumed token
    fn advance(&mut self) -> &'t Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, token_type: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == token_type
    }

    /// if the next token is in targets, advance and return true otherwise return false
    fn match_token(&mut self, targets: &[TokenType]) -> bool {
        if targets.iter().any(|t| self.check(*t)) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&'t Token, ParseError> {
        if self.check(token_type) {
            return Ok(self.advance());
        }
        Err(self.error(ParseError::UnexpectedToken {
            token: self.peek().clone(),
            message: message.to_owned(),
        }))
    }

    /// Every syntax error goes through here so that it is recorded exactly once.
    fn error(&mut self, err: ParseError) -> ParseError {
        self.diagnostics.report_parse(&err);
        err
    }

    /// discard tokens until we are probably at the start of the next statement
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }
            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// parse a declaration, recovering from any syntax error inside it
    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_token(&[TokenType::Fun]) {
            self.function("function")
        } else if self.match_token(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    fn function(&mut self, kind: &str) -> Result<Stmt, ParseError> {
        let name = self
            .consume(TokenType::Identifier, &format!("Expect {kind} name."))?
            .clone();
        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {kind} name."),
        )?;

        let mut params = vec![];
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    // reported but not fatal, parsing carries on
                    self.error(ParseError::TooManyParameters {
                        token: self.peek().clone(),
                    });
                }
                params.push(
                    self.consume(TokenType::Identifier, "Expect parameter name.")?
                        .clone(),
                );
                if !self.match_token(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {kind} body."),
        )?;
        let body = self.block()?;
        Ok(Stmt::Function(Rc::new(Function { name, params, body })))
    }

    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self
            .consume(TokenType::Identifier, "Expect variable name.")?
            .clone();
        let initialiser = if self.match_token(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::VariableDeclaration(VariableDeclaration {
            name,
            initialiser,
        }))
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(&[TokenType::For]) {
            return self.for_statement();
        }
        if self.match_token(&[TokenType::If]) {
            return self.if_statement();
        }
        if self.match_token(&[TokenType::Print]) {
            return self.print_statement();
        }
        if self.match_token(&[TokenType::Return]) {
            return self.return_statement();
        }
        if self.match_token(&[TokenType::While]) {
            return self.while_statement();
        }
        if self.match_token(&[TokenType::Break, TokenType::Continue]) {
            return self.jump_statement();
        }
        if self.match_token(&[TokenType::LeftBrace]) {
            return Ok(Stmt::Block(Block {
                inner: self.block()?,
            }));
        }
        self.expression_statement()
    }

    /// `for` is desugared into a while loop wrapped in blocks
    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initialiser = if self.match_token(&[TokenType::Semicolon]) {
            None
        } else if self.match_token(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(Block {
                inner: vec![body, Stmt::Expression(PureExpression(increment))],
            });
        }

        // a missing condition loops forever
        let condition =
            condition.unwrap_or(Expr::Literal(Literal(ParsedValue::Boolean(true))));
        body = Stmt::While(While {
            condition,
            body: Box::new(body),
        });

        if let Some(initialiser) = initialiser {
            body = Stmt::Block(Block {
                inner: vec![initialiser, body],
            });
        }
        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        // an else always binds to the nearest if
        let else_branch = if self.match_token(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(If {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(PrintExpression(value)))
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        let val = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return(Return { keyword, val }))
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(While { condition, body }))
    }

    fn jump_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.previous().clone();
        let kind = match keyword.token_type {
            TokenType::Break => JumpKind::Break,
            _ => JumpKind::Continue,
        };
        self.consume(
            TokenType::Semicolon,
            &format!("Expect ';' after '{}'.", keyword.lexeme),
        )?;
        Ok(Stmt::Jump(Jump { keyword, kind }))
    }

    /// collect declarations until the closing brace
    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = vec![];
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(PureExpression(expr)))
    }

    /// parse an expression; the comma operator binds loosest
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.assignment()?;
        while self.match_token(&[TokenType::Comma]) {
            let operator = self.previous().clone();
            let other = self.assignment()?;
            expr = Expr::Binary(Binary::new(operator, Box::new(expr), Box::new(other)));
        }
        Ok(expr)
    }

    /// parse an assignment (right-associative) or anything of higher precedence
    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.ternary()?;

        if self.match_token(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            if let Expr::Variable(Variable { name }) = expr {
                return Ok(Expr::Assign(Assign {
                    name,
                    value: Box::new(value),
                }));
            }
            // reported but not fatal, the left-hand side is kept as is
            self.error(ParseError::InvalidAssignmentTarget { token: equals });
        }
        Ok(expr)
    }

    /// parse a conditional expression or anything of higher precedence
    fn ternary(&mut self) -> Result<Expr, ParseError> {
        let expr = self.or()?;

        if self.match_token(&[TokenType::QuestionMark]) {
            let then_branch = self.expression()?;
            self.consume(
                TokenType::Colon,
                "Expect ':' after then branch of ternary expression.",
            )?;
            let else_branch = self.ternary()?;
            return Ok(Expr::Ternary(Ternary {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }));
        }
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.and()?;
        while self.match_token(&[TokenType::Or]) {
            let operator = self.previous().clone();
            let other = self.and()?;
            expr = Expr::Logical(Logical::new(operator, Box::new(expr), Box::new(other)));
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;
        while self.match_token(&[TokenType::And]) {
            let operator = self.previous().clone();
            let other = self.equality()?;
            expr = Expr::Logical(Logical::new(operator, Box::new(expr), Box::new(other)));
        }
        Ok(expr)
    }

    /// parse an equality or anything of higher precedence
    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;
        while self.match_token(&[TokenType::EqualEqual, TokenType::BangEqual]) {
            let operator = self.previous().clone();
            let other = self.comparison()?;
            expr = Expr::Binary(Binary::new(operator, Box::new(expr), Box::new(other)));
        }
        Ok(expr)
    }

    /// parse a comparison or anything of higher precedence
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.term()?;

        while self.match_token(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let other = self.term()?;
            expr = Expr::Binary(Binary::new(operator, Box::new(expr), Box::new(other)));
        }
        Ok(expr)
    }

    /// parse a term or anything of higher precedence
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.factor()?;

        while self.match_token(&[TokenType::Plus, TokenType::Minus]) {
            let operator = self.previous().clone();
            let other = self.factor()?;
            expr = Expr::Binary(Binary::new(operator, Box::new(expr), Box::new(other)));
        }
        Ok(expr)
    }

    /// parse a factor or anything of higher precedence
    fn factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;

        while self.match_token(&[TokenType::Slash, TokenType::Star]) {
            let operator = self.previous().clone();
            let other = self.unary()?;
            expr = Expr::Binary(Binary::new(operator, Box::new(expr), Box::new(other)));
        }
        Ok(expr)
    }

    /// parse a unary expression or anything of higher precedence
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&[TokenType::Minus, TokenType::Bang]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary(Unary::new(operator, Box::new(right))));
        }
        self.call()
    }

    /// parse a call chain such as `f(1)(2)`
    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while self.match_token(&[TokenType::LeftParen]) {
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut arguments = vec![];
        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    self.error(ParseError::TooManyArguments {
                        token: self.peek().clone(),
                    });
                }
                // arguments sit above the comma operator so commas separate them
                arguments.push(self.assignment()?);
                if !self.match_token(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        let paren = self
            .consume(TokenType::RightParen, "Expect ')' after arguments.")?
            .clone();
        Ok(Expr::Call(Call {
            callee: Box::new(callee),
            paren,
            arguments,
        }))
    }

    /// parse a primary expression
    fn primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek();
        match tok.token_type {
            TokenType::String
            | TokenType::Number
            | TokenType::True
            | TokenType::False
            | TokenType::Nil => {
                self.advance();
                let value = tok.literal.clone().unwrap_or(ParsedValue::Nil);
                Ok(Expr::Literal(Literal(value)))
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Expr::Variable(Variable { name: tok.clone() }))
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                Ok(Expr::Grouping(Grouping(Box::new(expr))))
            }
            _ => Err(self.error(ParseError::ExpectedExpression { token: tok.clone() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::lox::{ast::printer::Printer, scanner::Scanner};

    use super::*;

    fn parse(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
        let statements = Parser::new(&tokens, &mut diagnostics).parse();
        (statements, diagnostics)
    }

    fn print(source: &str) -> Vec<String> {
        let (statements, diagnostics) = parse(source);
        let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
        assert!(diagnostics.is_empty(), "unexpected errors: {messages:?}");
        let mut printer = Printer;
        statements
            .iter()
            .map(|s| printer.print_statement(s))
            .collect()
    }

    fn errors(source: &str) -> Vec<String> {
        let (_, diagnostics) = parse(source);
        diagnostics.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_parser() {
        let toks = vec![
            Token::new(
                TokenType::Number,
                "3".to_string(),
                Some(ParsedValue::Number(3.0)),
                1,
            ),
            Token::new(TokenType::Minus, "-".to_string(), None, 1),
            Token::new(
                TokenType::Number,
                "2".to_string(),
                Some(ParsedValue::Number(2.0)),
                1,
            ),
            Token::new(TokenType::Semicolon, ";".to_string(), None, 1),
            Token::new(TokenType::Eof, String::new(), None, 1),
        ];

        let mut diagnostics = Diagnostics::new();
        let ast = Parser::new(&toks, &mut diagnostics).parse();
        let out = Printer.print_statement(&ast[0]);
        assert_eq!(out, "(; (- 3 2))");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            print("1 + 2 * 3 - -4 / 2;"),
            vec!["(; (- (+ 1 (* 2 3)) (/ (- 4) 2)))"]
        );
        assert_eq!(
            print("a == b < c or d and !e;"),
            vec!["(; (or (== a (< b c)) (and d (! e))))"]
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(print("a = b = 1;"), vec!["(; (= a (= b 1)))"]);
    }

    #[test]
    fn test_ternary_and_comma() {
        assert_eq!(
            print("a ? b : c ? d : e;"),
            vec!["(; (?: a b (?: c d e)))"]
        );
        assert_eq!(print("x = 1, y = 2;"), vec!["(; (, (= x 1) (= y 2)))"]);
        assert_eq!(print("f(1, 2)(3);"), vec!["(; (call (call f 1 2) 3))"]);
    }

    #[test]
    fn test_for_desugaring() {
        assert_eq!(
            print("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0) (while (< i 3) (block (print i) (; (= i (+ i 1))))))"]
        );
        assert_eq!(print("for (;;) break;"), vec!["(while true (break))"]);
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            print("fun add(a, b) { return a + b; } var x; var y = add(1, 2);"),
            vec![
                "(fun add (a b) (return (+ a b)))",
                "(var x)",
                "(var y (call add 1 2))",
            ]
        );
    }

    #[test]
    fn test_dangling_else() {
        assert_eq!(
            print("if (a) if (b) print 1; else print 2;"),
            vec!["(if a (if b (print 1) (print 2)))"]
        );
    }

    #[test]
    fn test_jumps() {
        assert_eq!(
            print("while (true) { continue; break; }"),
            vec!["(while true (block (continue) (break)))"]
        );
    }

    #[test]
    fn test_recovers_after_errors() {
        let (statements, diagnostics) = parse("var = 1; print 2; print (3; print 4;");
        assert_eq!(statements.len(), 2);
        let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "[line 1] Error at '=' : Expect variable name.",
                "[line 1] Error at ';' : Expect ')' after expression.",
            ]
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(
            errors("1 + 2 = 3;"),
            vec!["[line 1] Error at '=' : Invalid assignment target."]
        );
    }

    #[test]
    fn test_error_at_end() {
        assert_eq!(
            errors("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (statements, diagnostics) = parse(&source);
        // the error is reported but the call still parses
        assert_eq!(statements.len(), 1);
        let messages: Vec<String> = diagnostics.iter().map(|d| d.message.clone()).collect();
        assert_eq!(messages, vec!["Can't have more than 255 arguments."]);
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{i}")).collect();
        let source = format!("fun f({}) {{}} print 1;", params.join(", "));
        let (statements, diagnostics) = parse(&source);
        // the declaration is kept and the following statement still parses
        assert_eq!(statements.len(), 2);
        let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            vec!["[line 1] Error at 'p255' : Can't have more than 255 parameters."]
        );
    }
}
