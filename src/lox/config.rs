//! Run configuration read from the process environment.
//!
//! `TREELOX_MODE` picks what a session does with source text:
//! `run` (the default) executes it, `tokens` prints the scanned tokens and `ast` prints the
//! parsed statements.

use std::str::FromStr;

pub const MODE_VAR: &str = "TREELOX_MODE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Run,
    Tokens,
    Ast,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" | "" => Ok(RunMode::Run),
            "tokens" => Ok(RunMode::Tokens),
            "ast" => Ok(RunMode::Ast),
            other => Err(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub mode: RunMode,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_mode_var(std::env::var(MODE_VAR).ok().as_deref())
    }

    fn from_mode_var(value: Option<&str>) -> Self {
        let mode = match value.map(RunMode::from_str) {
            None => RunMode::default(),
            Some(Ok(mode)) => mode,
            Some(Err(unknown)) => {
                tracing::warn!(value = %unknown, "unknown {MODE_VAR}, falling back to run");
                RunMode::default()
            }
        };
        Self { mode }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(Config::from_mode_var(None).mode, RunMode::Run);
        assert_eq!(Config::from_mode_var(Some("tokens")).mode, RunMode::Tokens);
        assert_eq!(Config::from_mode_var(Some(" AST ")).mode, RunMode::Ast);
        assert_eq!(Config::from_mode_var(Some("bytecode")).mode, RunMode::Run);
    }
}
