use std::rc::Rc;

use super::scanner::tokens::{ParsedValue, Token};

pub mod printer;

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Binary(Binary),
    Unary(Unary),
    Grouping(Grouping),
    Literal(Literal),
    Logical(Logical),
    Ternary(Ternary),
    Variable(Variable),
    Assign(Assign),
    Call(Call),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binary {
    pub operator: Token,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl Binary {
    pub fn new(operator: Token, left: Box<Expr>, right: Box<Expr>) -> Self {
        Binary {
            operator,
            left,
            right,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Unary {
    pub operator: Token,
    pub right: Box<Expr>,
}

impl Unary {
    pub fn new(operator: Token, right: Box<Expr>) -> Self {
        Self { operator, right }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Grouping(pub Box<Expr>);

#[derive(Clone, Debug, PartialEq)]
pub struct Literal(pub ParsedValue);

/// Short-circuiting `and` / `or`
#[derive(Clone, Debug, PartialEq)]
pub struct Logical {
    pub operator: Token,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl Logical {
    pub fn new(operator: Token, left: Box<Expr>, right: Box<Expr>) -> Self {
        Self {
            operator,
            left,
            right,
        }
    }
}

/// `condition ? then_branch : else_branch`
#[derive(Clone, Debug, PartialEq)]
pub struct Ternary {
    pub condition: Box<Expr>,
    pub then_branch: Box<Expr>,
    pub else_branch: Box<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: Token,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assign {
    pub name: Token,
    pub value: Box<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub callee: Box<Expr>,
    // closing paren, kept for error reporting
    pub paren: Token,
    pub arguments: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Expression(PureExpression),
    Print(PrintExpression),
    VariableDeclaration(VariableDeclaration),
    Block(Block),
    If(If),
    While(While),
    Function(Rc<Function>),
    Return(Return),
    Jump(Jump),
}

/// An expression evaluated only for its side effects
#[derive(Clone, Debug, PartialEq)]
pub struct PureExpression(pub Expr);

#[derive(Clone, Debug, PartialEq)]
pub struct PrintExpression(pub Expr);

#[derive(Clone, Debug, PartialEq)]
pub struct VariableDeclaration {
    pub name: Token,
    pub initialiser: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub inner: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct If {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct While {
    pub condition: Expr,
    pub body: Box<Stmt>,
}

/// A function declaration. Shared between the declaring statement and every closure made from it.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Return {
    pub keyword: Token,
    pub val: Option<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Jump {
    pub keyword: Token,
    pub kind: JumpKind,
}

pub trait ExprVisitor<T> {
    fn visit_expr(&mut self, expr: &Expr) -> T {
        match expr {
            Expr::Binary(binary) => self.visit_binary(binary),
            Expr::Unary(unary) => self.visit_unary(unary),
            Expr::Grouping(grouping) => self.visit_grouping(grouping),
            Expr::Literal(literal) => self.visit_literal(literal),
            Expr::Logical(logical) => self.visit_logical(logical),
            Expr::Ternary(ternary) => self.visit_ternary(ternary),
            Expr::Variable(variable) => self.visit_variable(variable),
            Expr::Assign(assign) => self.visit_assign(assign),
            Expr::Call(call) => self.visit_call(call),
        }
    }
    fn visit_binary(&mut self, binary: &Binary) -> T;
    fn visit_unary(&mut self, unary: &Unary) -> T;
    fn visit_grouping(&mut self, grouping: &Grouping) -> T;
    fn visit_literal(&mut self, literal: &Literal) -> T;
    fn visit_logical(&mut self, logical: &Logical) -> T;
    fn visit_ternary(&mut self, ternary: &Ternary) -> T;
    fn visit_variable(&mut self, variable: &Variable) -> T;
    fn visit_assign(&mut self, assign: &Assign) -> T;
    fn visit_call(&mut self, call: &Call) -> T;
}

pub trait StmtVisitor<T> {
    fn visit_statement(&mut self, statement: &Stmt) -> T {
        match statement {
            Stmt::Expression(expr) => self.visit_expression_statement(expr),
            Stmt::Print(print) => self.visit_print_statement(print),
            Stmt::VariableDeclaration(decl) => self.visit_variable_declaration(decl),
            Stmt::Block(block) => self.visit_block(block),
            Stmt::If(if_statement) => self.visit_if(if_statement),
            Stmt::While(while_statement) => self.visit_while(while_statement),
            Stmt::Function(function) => self.visit_function(function),
            Stmt::Return(return_statement) => self.visit_return(return_statement),
            Stmt::Jump(jump) => self.visit_jump(jump),
        }
    }
    fn visit_expression_statement(&mut self, expression: &PureExpression) -> T;
    fn visit_print_statement(&mut self, print_expression: &PrintExpression) -> T;
    fn visit_variable_declaration(&mut self, variable_declaration: &VariableDeclaration) -> T;
    fn visit_block(&mut self, block: &Block) -> T;
    fn visit_if(&mut self, if_statement: &If) -> T;
    fn visit_while(&mut self, while_statement: &While) -> T;
    // takes the Rc so closures can share the declaration
    fn visit_function(&mut self, function: &Rc<Function>) -> T;
    fn visit_return(&mut self, return_statement: &Return) -> T;
    fn visit_jump(&mut self, jump: &Jump) -> T;
}
