//! CLI argument definitions using clap
//!
//! Every command takes `--config <path>` and prints one JSON response on
//! stdout.

use std::net::IpAddr;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::schema::{CandidateId, CandidateIdentity, ElectionId, ElectionPhase, PositionId, VoterId};

/// ballotdb - ballot admission and tallying engine
#[derive(Parser, Debug)]
#[command(name = "ballotdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
    },

    /// Create an election
    CreateElection {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Window start, RFC 3339
        #[arg(long)]
        start: DateTime<Utc>,
        /// Window end, RFC 3339
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long, default_value = "draft")]
        phase: ElectionPhase,
    },

    /// Change an election's title, description or window
    UpdateElection {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        election: ElectionId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },

    /// Delete an election and everything it owns
    DeleteElection {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        election: ElectionId,
    },

    /// Add a position to an election
    AddPosition {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        election: ElectionId,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = 0)]
        display_order: i32,
        #[arg(long, default_value_t = 1)]
        max_selections: u32,
    },

    /// Remove a position with its candidates
    RemovePosition {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        position: PositionId,
    },

    /// Add a candidate to a position
    AddCandidate {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        position: PositionId,
        #[arg(long)]
        full_name: String,
        /// Stable candidate identity; generated when omitted
        #[arg(long)]
        identity: Option<CandidateIdentity>,
        #[arg(long, default_value = "")]
        department: String,
        #[arg(long, default_value = "")]
        level: String,
        #[arg(long, default_value = "")]
        manifesto: String,
    },

    /// Remove a candidate
    RemoveCandidate {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        candidate: CandidateId,
    },

    /// Move an election to another phase
    Transition {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        election: ElectionId,
        #[arg(long)]
        to: ElectionPhase,
    },

    /// List elections, newest first
    ListElections {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
    },

    /// Cast a ballot read from stdin: {"<position id>": ["<candidate id>", ...]}
    Cast {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        voter: VoterId,
        #[arg(long)]
        election: ElectionId,
        /// Client address; stored only as its /24 or /48 network
        #[arg(long)]
        origin: Option<IpAddr>,
    },

    /// Check whether a voter may vote now
    CanVote {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        voter: VoterId,
        #[arg(long)]
        election: ElectionId,
    },

    /// Print the live tally of an election
    Tally {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        election: ElectionId,
    },

    /// Look up a verification code
    Verify {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        code: String,
    },

    /// Remove a departing voter's participation records
    PurgeVoter {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
        #[arg(long)]
        voter: VoterId,
    },

    /// Print store statistics rebuilt from the data directory
    Metrics {
        #[arg(long, default_value = "./ballotdb.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
