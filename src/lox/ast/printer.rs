use std::rc::Rc;

use super::{
    Assign, Binary, Block, Call, Expr, ExprVisitor, Function, Grouping, If, Jump, JumpKind,
    Literal, Logical, PrintExpression, PureExpression, Return, Stmt, StmtVisitor, Ternary, Unary,
    Variable, VariableDeclaration, While,
};

/// Renders the AST in a parenthesized prefix form, e.g. `(* (- 123) (group 45.67))`.
pub struct Printer;

impl Printer {
    pub fn print(&mut self, expr: &Expr) -> String {
        self.visit_expr(expr)
    }

    pub fn print_statement(&mut self, statement: &Stmt) -> String {
        self.visit_statement(statement)
    }

    fn parenthesize(&mut self, name: &str, expressions: Vec<&Expr>) -> String {
        let mut s = format!("({}", name);
        for expr in expressions {
            s.push_str(&format!(" {}", &self.visit_expr(expr)));
        }
        s + ")"
    }

    fn parenthesize_statements(&mut self, name: &str, statements: &[Stmt]) -> String {
        let mut s = format!("({}", name);
        for statement in statements {
            s.push_str(&format!(" {}", &self.visit_statement(statement)));
        }
        s + ")"
    }
}

impl ExprVisitor<String> for Printer {
    fn visit_binary(&mut self, binary: &Binary) -> String {
        self.parenthesize(&binary.operator.lexeme, vec![&*binary.left, &*binary.right])
    }

    fn visit_unary(&mut self, unary: &Unary) -> String {
        self.parenthesize(&unary.operator.lexeme, vec![&*unary.right])
    }

    fn visit_grouping(&mut self, grouping: &Grouping) -> String {
        self.parenthesize("group", vec![&*grouping.0])
    }

    fn visit_literal(&mut self, literal: &Literal) -> String {
        literal.0.to_string()
    }

    fn visit_logical(&mut self, logical: &Logical) -> String {
        self.parenthesize(&logical.operator.lexeme, vec![&*logical.left, &*logical.right])
    }

    fn visit_ternary(&mut self, ternary: &Ternary) -> String {
        self.parenthesize(
            "?:",
            vec![&*ternary.condition, &*ternary.then_branch, &*ternary.else_branch],
        )
    }

    fn visit_variable(&mut self, variable: &Variable) -> String {
        variable.name.lexeme.clone()
    }

    fn visit_assign(&mut self, assign: &Assign) -> String {
        self.parenthesize(&format!("= {}", assign.name.lexeme), vec![&*assign.value])
    }

    fn visit_call(&mut self, call: &Call) -> String {
        let mut operands = vec![call.callee.as_ref()];
        operands.extend(call.arguments.iter());
        self.parenthesize("call", operands)
    }
}

impl StmtVisitor<String> for Printer {
    fn visit_expression_statement(&mut self, expression: &PureExpression) -> String {
        self.parenthesize(";", vec![&expression.0])
    }

    fn visit_print_statement(&mut self, print_expression: &PrintExpression) -> String {
        self.parenthesize("print", vec![&print_expression.0])
    }

    fn visit_variable_declaration(&mut self, variable_declaration: &VariableDeclaration) -> String {
        let name = format!("var {}", variable_declaration.name.lexeme);
        match &variable_declaration.initialiser {
            Some(init) => self.parenthesize(&name, vec![init]),
            None => format!("({name})"),
        }
    }

    fn visit_block(&mut self, block: &Block) -> String {
        self.parenthesize_statements("block", &block.inner)
    }

    fn visit_if(&mut self, if_statement: &If) -> String {
        let mut s = format!(
            "(if {} {}",
            self.visit_expr(&if_statement.condition),
            self.visit_statement(&if_statement.then_branch)
        );
        if let Some(else_branch) = &if_statement.else_branch {
            s.push_str(&format!(" {}", self.visit_statement(else_branch)));
        }
        s + ")"
    }

    fn visit_while(&mut self, while_statement: &While) -> String {
        format!(
            "(while {} {})",
            self.visit_expr(&while_statement.condition),
            self.visit_statement(&while_statement.body)
        )
    }

    fn visit_function(&mut self, function: &Rc<Function>) -> String {
        let params: Vec<&str> = function.params.iter().map(|p| p.lexeme.as_str()).collect();
        let name = format!("fun {} ({})", function.name.lexeme, params.join(" "));
        self.parenthesize_statements(&name, &function.body)
    }

    fn visit_return(&mut self, return_statement: &Return) -> String {
        match &return_statement.val {
            Some(val) => self.parenthesize("return", vec![val]),
            None => "(return)".to_owned(),
        }
    }

    fn visit_jump(&mut self, jump: &Jump) -> String {
        match jump.kind {
            JumpKind::Break => "(break)".to_owned(),
            JumpKind::Continue => "(continue)".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::lox::{
        ast::{Binary, Expr, Grouping, Literal, Unary},
        scanner::tokens::{ParsedValue, Token, TokenType},
    };

    use super::Printer;

    #[test]
    fn test_ast_printer() {
        let operator = Token::new(TokenType::Star, "*".to_owned(), None, 1);
        let inner_operator = Token::new(TokenType::Minus, "-".to_owned(), None, 1);
        let expr = Expr::Binary(Binary::new(
            operator,
            Box::new(Expr::Unary(Unary::new(
                inner_operator,
                Box::new(Expr::Literal(Literal(ParsedValue::Number(123.)))),
            ))),
            Box::new(Expr::Grouping(Grouping(Box::new(Expr::Literal(Literal(
                ParsedValue::Number(45.67),
            )))))),
        ));
        let mut printer = Printer;
        let out = printer.print(&expr);
        assert_eq!(out, "(* (- 123) (group 45.67))")
    }
}
