//! CLI command implementations
//!
//! Each command loads the configuration, opens the engine (replaying the
//! WAL), performs one operation and prints one JSON response.

use std::fs;
use std::net::IpAddr;
use std::path::Path;

use serde_json::json;

use crate::ballot::BallotSelections;
use crate::engine::{EngineConfig, VotingEngine};
use crate::lifecycle::{ElectionUpdate, NewCandidate, NewElection, NewPosition};
use crate::schema::{ElectionId, VoterId};
use crate::wal::WAL_DIR;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),

        Command::CreateElection {
            config,
            title,
            description,
            start,
            end,
            phase,
        } => {
            let engine = open(&config)?;
            let created = engine
                .create_election(NewElection {
                    title,
                    description,
                    start,
                    end,
                    phase,
                })
                .map_err(CliError::rejected)?;
            write_response(&created.value)
        }

        Command::UpdateElection {
            config,
            election,
            title,
            description,
            start,
            end,
        } => {
            let engine = open(&config)?;
            let updated = engine
                .update_election(
                    &election,
                    ElectionUpdate {
                        title,
                        description,
                        start,
                        end,
                    },
                )
                .map_err(CliError::rejected)?;
            write_response(&updated.value)
        }

        Command::DeleteElection { config, election } => {
            let engine = open(&config)?;
            let deleted = engine
                .delete_election(&election)
                .map_err(CliError::rejected)?;
            write_response(&json!({ "deleted": deleted.value.id }))
        }

        Command::AddPosition {
            config,
            election,
            title,
            description,
            display_order,
            max_selections,
        } => {
            let engine = open(&config)?;
            let position = engine
                .add_position(NewPosition {
                    election_id: election,
                    title,
                    description,
                    display_order,
                    max_selections,
                })
                .map_err(CliError::rejected)?;
            write_response(&position.value)
        }

        Command::RemovePosition { config, position } => {
            let engine = open(&config)?;
            let removed = engine
                .remove_position(&position)
                .map_err(CliError::rejected)?;
            write_response(&json!({ "removed": removed.value.id }))
        }

        Command::AddCandidate {
            config,
            position,
            full_name,
            identity,
            department,
            level,
            manifesto,
        } => {
            let engine = open(&config)?;
            let candidate = engine
                .add_candidate(NewCandidate {
                    position_id: position,
                    identity: identity.unwrap_or_default(),
                    full_name,
                    department,
                    level,
                    manifesto,
                })
                .map_err(CliError::rejected)?;
            write_response(&candidate.value)
        }

        Command::RemoveCandidate { config, candidate } => {
            let engine = open(&config)?;
            let removed = engine
                .remove_candidate(&candidate)
                .map_err(CliError::rejected)?;
            write_response(&json!({ "removed": removed.value.id }))
        }

        Command::Transition {
            config,
            election,
            to,
        } => {
            let engine = open(&config)?;
            let change = engine
                .transition_election(&election, to)
                .map_err(CliError::rejected)?;
            write_response(&change.value)
        }

        Command::ListElections { config } => {
            let engine = open(&config)?;
            write_response(&engine.list_elections())
        }

        Command::Cast {
            config,
            voter,
            election,
            origin,
        } => cast(&config, voter, election, origin),

        Command::CanVote {
            config,
            voter,
            election,
        } => {
            let engine = open(&config)?;
            let status = engine.can_vote(&voter, &election);
            write_response(&json!({ "status": status }))
        }

        Command::Tally { config, election } => {
            let engine = open(&config)?;
            let tally = engine.tally(&election).map_err(CliError::rejected)?;
            write_response(&tally)
        }

        Command::Verify { config, code } => {
            let engine = open(&config)?;
            match engine.verify_participation(&code) {
                Some(proof) => write_response(&json!({ "found": true, "proof": proof })),
                None => write_response(&json!({ "found": false })),
            }
        }

        Command::PurgeVoter { config, voter } => {
            let engine = open(&config)?;
            let purged = engine.purge_voter(&voter).map_err(CliError::rejected)?;
            write_response(&json!({ "records_removed": purged.value }))
        }

        Command::Metrics { config } => {
            let engine = open(&config)?;
            write_response(&engine.stats())
        }
    }
}

/// Initialize a new data directory
///
/// Creates the WAL and audit directories. Writes no WAL records.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let data_dir = config.data_dir.as_path();

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    let audit_dir = config
        .audit_path()
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.to_path_buf());
    for dir in [data_dir.join(WAL_DIR), audit_dir] {
        fs::create_dir_all(&dir).map_err(|e| {
            CliError::config_error(format!("Failed to create directory {:?}: {}", dir, e))
        })?;
    }

    write_response(&json!({ "initialized": true, "data_dir": data_dir }))
}

/// Cast one ballot read from stdin
pub fn cast(
    config_path: &Path,
    voter: VoterId,
    election: ElectionId,
    origin: Option<IpAddr>,
) -> CliResult<()> {
    let engine = open(config_path)?;
    let selections: BallotSelections = read_request()?;
    let receipt = engine
        .cast_ballots_with_retry(&voter, &election, &selections, origin)
        .map_err(CliError::rejected)?;
    write_response(&receipt.value)
}

fn load_config(path: &Path) -> CliResult<EngineConfig> {
    EngineConfig::load(path).map_err(CliError::boot_failed)
}

fn open(config_path: &Path) -> CliResult<VotingEngine> {
    let config = load_config(config_path)?;
    if !is_initialized(&config.data_dir) {
        return Err(CliError::not_initialized());
    }
    VotingEngine::open(&config).map_err(CliError::boot_failed)
}

fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join(WAL_DIR).is_dir()
}
