//! dupsweep - single-directory duplicate file finder
//!
//! Entry point for the dupsweep CLI application.

use clap::Parser;
use dupsweep::{cli::Cli, error::ExitCode};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    match dupsweep::run_app(cli) {
        Ok(code) => code.into(),
        Err(err) => {
            let exit_code = ExitCode::from_error(&err);
            if exit_code == ExitCode::Interrupted {
                log::warn!("Interrupted before completion; hashed files were saved to the cache");
            }
            eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            exit_code.into()
        }
    }
}
