use thiserror::Error;
use tokens::{ParsedValue, Token, TokenType, KEYWORDS};

use super::diagnostics::Diagnostics;

pub mod tokens;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("Unexpected character.")]
    UnexpectedCharacter { line: usize, character: char },
    #[error("Unterminated string.")]
    UnterminatedString { line: usize },
    #[error("Unterminated block comment.")]
    UnterminatedComment { line: usize },
}

impl ScanError {
    pub fn line(&self) -> usize {
        match self {
            ScanError::UnexpectedCharacter { line, .. }
            | ScanError::UnterminatedString { line }
            | ScanError::UnterminatedComment { line } => *line,
        }
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alphanumeric(c: char) -> bool {
    is_alpha(c) || is_digit(c)
}

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    // first character in current lexeme
    start: usize,
    // current character
    current: usize,
    // current line
    line: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: vec![],
            start: 0,
            current: 0,
            line: 1,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            return '\0';
        }
        self.source[self.current]
    }

    fn peek_next(&self) -> char {
        let next = self.current + 1;
        if next >= self.source.len() {
            return '\0';
        }
        self.source[next]
    }

    /// consume the next character only if it is `target`
    fn match_next(&mut self, target: char) -> bool {
        if self.is_at_end() || self.source[self.current] != target {
            return false;
        }
        self.current += 1;
        true
    }

    // converts current lexeme from slice of chars to String
    fn current_to_string(&self) -> String {
        String::from_iter(&self.source[self.start..self.current])
    }

    fn add_token(&mut self, token_type: TokenType, literal: Option<ParsedValue>) {
        let lexeme = self.current_to_string();
        self.tokens
            .push(Token::new(token_type, lexeme, literal, self.line));
    }

    /// picks the two-character token type if the next char is '=', otherwise the single one
    fn add_with_equal(&mut self, with_equal: TokenType, without: TokenType) {
        let token_type = if self.match_next('=') {
            with_equal
        } else {
            without
        };
        self.add_token(token_type, None);
    }

    fn scan_token(&mut self) -> Result<(), ScanError> {
        let c = self.advance();
        match c {
            // single-character tokens
            '(' => self.add_token(TokenType::LeftParen, None),
            ')' => self.add_token(TokenType::RightParen, None),
            '{' => self.add_token(TokenType::LeftBrace, None),
            '}' => self.add_token(TokenType::RightBrace, None),
            ',' => self.add_token(TokenType::Comma, None),
            '.' => self.add_token(TokenType::Dot, None),
            '-' => self.add_token(TokenType::Minus, None),
            '+' => self.add_token(TokenType::Plus, None),
            ';' => self.add_token(TokenType::Semicolon, None),
            '*' => self.add_token(TokenType::Star, None),
            '?' => self.add_token(TokenType::QuestionMark, None),
            ':' => self.add_token(TokenType::Colon, None),

            // one-or-two character tokens
            '!' => self.add_with_equal(TokenType::BangEqual, TokenType::Bang),
            '=' => self.add_with_equal(TokenType::EqualEqual, TokenType::Equal),
            '>' => self.add_with_equal(TokenType::GreaterEqual, TokenType::Greater),
            '<' => self.add_with_equal(TokenType::LessEqual, TokenType::Less),

            '/' => {
                if self.match_next('/') {
                    // line comment runs to the end of the line
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_next('*') {
                    self.block_comment()?;
                } else {
                    self.add_token(TokenType::Slash, None)
                }
            }

            '"' => self.string()?,

            // increment line number on new-line
            '\n' => self.line += 1,
            // ignore irrelevant chars
            '\r' | ' ' | '\t' => {}

            c if is_digit(c) => self.number(),
            c if is_alpha(c) => self.identifier(),

            // any other character is invalid
            character => {
                return Err(ScanError::UnexpectedCharacter {
                    line: self.line,
                    character,
                })
            }
        }
        Ok(())
    }

    fn block_comment(&mut self) -> Result<(), ScanError> {
        loop {
            if self.is_at_end() {
                return Err(ScanError::UnterminatedComment { line: self.line });
            }
            if self.peek() == '*' && self.peek_next() == '/' {
                self.current += 2;
                return Ok(());
            }
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
    }

    fn string(&mut self) -> Result<(), ScanError> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(ScanError::UnterminatedString { line: self.line });
        }
        // account for closing quote mark
        self.advance();
        let val = String::from_iter(&self.source[self.start + 1..self.current - 1]);
        self.add_token(TokenType::String, Some(ParsedValue::String(val)));
        Ok(())
    }

    fn number(&mut self) {
        while is_digit(self.peek()) {
            self.advance();
        }

        // a '.' only belongs to the number if a digit follows it
        if self.peek() == '.' && is_digit(self.peek_next()) {
            self.advance();
            while is_digit(self.peek()) {
                self.advance();
            }
        }
        // digits with at most one interior '.' always parse
        let val = self.current_to_string().parse::<f64>().unwrap_or_default();
        self.add_token(TokenType::Number, Some(ParsedValue::Number(val)))
    }

    fn identifier(&mut self) {
        while is_alphanumeric(self.peek()) {
            self.advance();
        }
        let text = self.current_to_string();
        match KEYWORDS.get(text.as_str()) {
            Some(TokenType::True) => self.add_token(TokenType::True, Some(ParsedValue::Boolean(true))),
            Some(TokenType::False) => {
                self.add_token(TokenType::False, Some(ParsedValue::Boolean(false)))
            }
            Some(TokenType::Nil) => self.add_token(TokenType::Nil, Some(ParsedValue::Nil)),
            Some(keyword) => self.add_token(*keyword, None),
            None => self.add_token(TokenType::Identifier, None),
        }
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn scan_tokens(mut self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        // iterate through source until we've scanned all tokens
        while !self.is_at_end() {
            self.start = self.current;
            if let Err(e) = self.scan_token() {
                // record the error but carry on scanning so we catch as many errors as
                // possible in 1 pass
                diagnostics.report_scan(&e);
            }
        }

        self.tokens
            .push(Token::new(TokenType::Eof, String::new(), None, self.line));
        tracing::debug!(count = self.tokens.len(), "scanned tokens");
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scan(source: &str) -> (Vec<Token>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
        (tokens, diagnostics)
    }

    fn types(tokens: &[Token]) -> Vec<TokenType> {
        tokens.iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_punctuation() {
        let (tokens, diagnostics) = scan("(){},.-+;*?:");
        assert!(diagnostics.is_empty());
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::LeftBrace,
                TokenType::RightBrace,
                TokenType::Comma,
                TokenType::Dot,
                TokenType::Minus,
                TokenType::Plus,
                TokenType::Semicolon,
                TokenType::Star,
                TokenType::QuestionMark,
                TokenType::Colon,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_maximal_munch() {
        let (tokens, _) = scan("! != = == > >= < <= /");
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Bang,
                TokenType::BangEqual,
                TokenType::Equal,
                TokenType::EqualEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Slash,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_lines() {
        let (tokens, diagnostics) = scan("// line comment\n/* block\ncomment */ var\n");
        assert!(diagnostics.is_empty());
        assert_eq!(types(&tokens), vec![TokenType::Var, TokenType::Eof]);
        assert_eq!(tokens[0].line, 3);
        assert_eq!(tokens[1].line, 4);
    }

    #[test]
    fn test_unterminated_comment() {
        let (tokens, diagnostics) = scan("1 /* never closed\n");
        assert_eq!(types(&tokens), vec![TokenType::Number, TokenType::Eof]);
        let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
        assert_eq!(messages, vec!["[line 2] Error: Unterminated block comment."]);
    }

    #[test]
    fn test_strings() {
        let (tokens, diagnostics) = scan("\"multi\nline\" \"open");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "\"multi\nline\"");
        assert_eq!(
            tokens[0].literal,
            Some(ParsedValue::String("multi\nline".to_owned()))
        );
        assert_eq!(tokens[0].line, 2);
        let messages: Vec<String> = diagnostics.iter().map(|d| d.message.clone()).collect();
        assert_eq!(messages, vec!["Unterminated string."]);
    }

    #[test]
    fn test_numbers() {
        let (tokens, _) = scan("123 4.5 6.");
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Number,
                TokenType::Number,
                TokenType::Number,
                TokenType::Dot,
                TokenType::Eof,
            ]
        );
        assert_eq!(tokens[0].literal, Some(ParsedValue::Number(123.0)));
        assert_eq!(tokens[1].literal, Some(ParsedValue::Number(4.5)));
        assert_eq!(tokens[2].lexeme, "6");
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let (tokens, _) = scan("var _under score1 while whilex nil break continue");
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Var,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::While,
                TokenType::Identifier,
                TokenType::Nil,
                TokenType::Break,
                TokenType::Continue,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_characters_keep_scanning() {
        let (tokens, diagnostics) = scan("1 @ 2 # 3");
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Number,
                TokenType::Number,
                TokenType::Number,
                TokenType::Eof
            ]
        );
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.had_error());
    }

    #[test]
    fn test_rescanning_lexemes() {
        let source = "fun f(a, b) { return a >= b ? \"yes\" : 1.25; } // done";
        let (tokens, _) = scan(source);
        for token in tokens.iter().filter(|t| t.token_type != TokenType::Eof) {
            let (rescanned, diagnostics) = scan(&token.lexeme);
            assert!(diagnostics.is_empty());
            assert_eq!(rescanned.len(), 2);
            assert_eq!(rescanned[0].token_type, token.token_type);
            assert_eq!(rescanned[0].literal, token.literal);
        }
    }
}
