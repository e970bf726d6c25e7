use anyhow::{Context, Result};
use std::fs::read_to_string;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use ast::printer::Printer;
use config::{Config, RunMode};
use diagnostics::Diagnostics;
use interpreter::{Interpreter, RuntimeError};
use parser::Parser;
use scanner::Scanner;

pub mod ast;
pub mod callable;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod interpreter;
pub mod parser;
pub mod scanner;

/// Exit status for a lexical or syntax error in a script.
pub const EXIT_COMPILE_ERROR: u8 = 65;
/// Exit status for a runtime error in a script.
pub const EXIT_RUNTIME_ERROR: u8 = 70;

/// One interpreter session. Globals persist between calls to [`Lox::run`], which is what lets
/// the prompt build a program up line by line.
pub struct Lox<W: Write> {
    config: Config,
    interpreter: Interpreter<W>,
}

impl<W: Write> Lox<W> {
    pub fn new(config: Config, out: W) -> Self {
        Self {
            config,
            interpreter: Interpreter::new(out),
        }
    }

    pub fn output(&self) -> &W {
        self.interpreter.output()
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }

    /// Push `source` through the pipeline, returning everything that went wrong along the way.
    /// Nothing is executed if scanning or parsing reported an error.
    pub fn run(&mut self, source: &str) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);

        if self.config.mode == RunMode::Tokens {
            let listing = tokens.iter().map(|t| format!("{t}\n")).collect::<String>();
            self.write_listing(&listing, &mut diagnostics);
            return diagnostics;
        }

        let statements = Parser::new(&tokens, &mut diagnostics).parse();

        match self.config.mode {
            RunMode::Ast => {
                let mut printer = Printer;
                let listing = statements
                    .iter()
                    .map(|s| format!("{}\n", printer.print_statement(s)))
                    .collect::<String>();
                self.write_listing(&listing, &mut diagnostics);
            }
            _ if diagnostics.had_error() => {
                tracing::debug!(errors = diagnostics.len(), "skipping execution");
            }
            _ => self.interpreter.interpret(&statements, &mut diagnostics),
        }
        diagnostics
    }

    fn write_listing(&mut self, listing: &str, diagnostics: &mut Diagnostics) {
        let out = self.interpreter.output_mut();
        if let Err(e) = out.write_all(listing.as_bytes()).and_then(|_| out.flush()) {
            diagnostics.report_runtime(&RuntimeError::from(e));
        }
    }
}

fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{diagnostic}");
    }
}

pub fn run_file(path: &Path) -> Result<ExitCode> {
    let source =
        read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
    let mut lox = Lox::new(Config::from_env(), io::stdout());
    let diagnostics = lox.run(&source);
    report(&diagnostics);

    if diagnostics.had_error() {
        Ok(ExitCode::from(EXIT_COMPILE_ERROR))
    } else if diagnostics.had_runtime_error() {
        Ok(ExitCode::from(EXIT_RUNTIME_ERROR))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

pub fn run_prompt() -> Result<()> {
    let mut lox = Lox::new(Config::from_env(), io::stdout());
    let mut stdin = io::stdin().lock();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush().context("could not write prompt")?;

        line.clear();
        let read = stdin.read_line(&mut line).context("could not read from stdin")?;
        // end of input
        if read == 0 {
            println!();
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }
        // each line gets a fresh error state, the globals stay
        report(&lox.run(&line));
    }
}
