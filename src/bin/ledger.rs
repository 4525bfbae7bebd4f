//! Command-line front end for a workledger directory.
//!
//! Usage:
//!
//! ```text
//! ledger [--config <path>] [--root <dir>] [--actor <name>] <command> ...
//! ```
//!
//! Without `--config`, `ledger.toml` in the working directory is read when
//! present. Diagnostics go to stderr and are filtered by `RUST_LOG`
//! (default `warn`). Failures exit with the code of their error kind; usage
//! errors exit with 64.

#[path = "ledger/cli.rs"]
mod cli;
#[path = "ledger/commands.rs"]
mod commands;


use clap::Parser;
use cli::Cli;
use std::io::{self, Write};
use std::process::ExitCode;
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;
use workledger::error::{Classify, ErrorKind, LedgerError};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            let code = if err.use_stderr() {
                ErrorKind::Usage.exit_code()
            } else {
                0
            };
            drop(err.print());
            return ExitCode::from(code);
        }
    };
    init_tracing();

    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => return fail(&LedgerError::Io(err)),
    };
    let stdout = io::stdout();
    match runtime.block_on(commands::run(cli, &mut stdout.lock())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn fail(err: &LedgerError) -> ExitCode {
    let kind = err.kind();
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    if writeln!(handle, "error[{kind}]: {err}").is_err() {
        return ExitCode::from(kind.exit_code());
    }
    for line in commands::error_details(err) {
        if writeln!(handle, "  {line}").is_err() {
            break;
        }
    }
    ExitCode::from(kind.exit_code())
}
