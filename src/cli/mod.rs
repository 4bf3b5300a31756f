//! CLI module for ballotdb
//!
//! Provides the command-line interface:
//! - init: create the data directory layout
//! - election administration: create, update, delete, transition, list
//! - ballot structure: add/remove positions and candidates
//! - ballots: cast, can-vote, verify, purge-voter
//! - reads: tally, metrics

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{cast, init, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_response};
