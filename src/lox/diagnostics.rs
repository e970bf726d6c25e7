//! Error accumulation for a single run through the scan / parse / interpret pipeline.
//!
//! Each phase reports into a [`Diagnostics`] it is handed by the caller; the session returns it
//! so the front end can print the messages and decide on an exit status.

use super::{
    interpreter::RuntimeError,
    parser::ParseError,
    scanner::{
        tokens::{Token, TokenType},
        ScanError,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Runtime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: usize,
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    /// Builds a diagnostic located at `token`.
    pub fn at_token(kind: DiagnosticKind, token: &Token, message: String) -> Self {
        let location = match token.token_type {
            TokenType::Eof => " at end".to_owned(),
            _ => format!(" at '{}' ", token.lexeme),
        };
        Self {
            kind,
            line: token.line,
            location,
            message,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[line {}] Error{}: {}",
            self.line, self.location, self.message
        )
    }
}

impl From<&ScanError> for Diagnostic {
    fn from(err: &ScanError) -> Self {
        Self {
            kind: DiagnosticKind::Lexical,
            line: err.line(),
            location: String::new(),
            message: err.to_string(),
        }
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(err: &ParseError) -> Self {
        Diagnostic::at_token(DiagnosticKind::Syntax, err.token(), err.to_string())
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(err: &RuntimeError) -> Self {
        match err.token() {
            Some(token) => Diagnostic::at_token(DiagnosticKind::Runtime, token, err.to_string()),
            // output failures don't belong to any line of the program
            None => Self {
                kind: DiagnosticKind::Runtime,
                line: 0,
                location: String::new(),
                message: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(kind = ?diagnostic.kind, line = diagnostic.line, "{}", diagnostic.message);
        self.entries.push(diagnostic);
    }

    pub fn report_scan(&mut self, err: &ScanError) {
        self.push(err.into());
    }

    pub fn report_parse(&mut self, err: &ParseError) {
        self.push(err.into());
    }

    pub fn report_runtime(&mut self, err: &RuntimeError) {
        self.push(err.into());
    }

    /// True if a lexical or syntax error was recorded; such a run must not be interpreted.
    pub fn had_error(&self) -> bool {
        self.entries
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::Lexical | DiagnosticKind::Syntax))
    }

    pub fn had_runtime_error(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.kind == DiagnosticKind::Runtime)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_location_formatting() {
        let ident = Token::new(TokenType::Identifier, "foo".to_owned(), None, 3);
        let eof = Token::new(TokenType::Eof, String::new(), None, 7);

        let at_ident = Diagnostic::at_token(DiagnosticKind::Syntax, &ident, "Oops.".to_owned());
        let at_eof = Diagnostic::at_token(DiagnosticKind::Syntax, &eof, "Oops.".to_owned());

        assert_eq!(at_ident.to_string(), "[line 3] Error at 'foo' : Oops.");
        assert_eq!(at_eof.to_string(), "[line 7] Error at end: Oops.");
    }

    #[test]
    fn test_lexical_errors_have_no_location() {
        let diag: Diagnostic = (&ScanError::UnexpectedCharacter { line: 2, character: '@' }).into();
        assert_eq!(diag.to_string(), "[line 2] Error: Unexpected character.");
    }

    #[test]
    fn test_error_flags() {
        let mut diagnostics = Diagnostics::new();
        assert!(!diagnostics.had_error());

        let token = Token::new(TokenType::Minus, "-".to_owned(), None, 1);
        diagnostics.report_runtime(&RuntimeError::InvalidOperand { operator: token });
        assert!(!diagnostics.had_error());
        assert!(diagnostics.had_runtime_error());

        diagnostics.report_scan(&ScanError::UnterminatedString { line: 1 });
        assert!(diagnostics.had_error());
        assert_eq!(diagnostics.len(), 2);

        diagnostics.clear();
        assert!(diagnostics.is_empty());
    }
}
