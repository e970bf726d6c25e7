use anyhow::Result;
use std::{env, path::Path, process::ExitCode};
use treelox::lox::{run_file, run_prompt};

const EXIT_USAGE: u8 = 64;

/// Logging goes to stderr and is off unless RUST_LOG is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [] => {
            run_prompt()?;
            Ok(ExitCode::SUCCESS)
        }
        [script] => run_file(Path::new(script)),
        _ => {
            eprintln!("Usage: treelox [script]");
            Ok(ExitCode::from(EXIT_USAGE))
        }
    }
}
