//! CLI-level errors: argument parsing and the demo pipeline's own failure
//! modes. Planner/executor/synthesizer errors are reported, not wrapped —
//! the executor and synthesizer already degrade non-fatally by contract.

use thiserror::Error;

/// Errors surfaced by the `qe` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// A flag was given without its required value, or an unknown flag/
    /// subcommand was passed.
    #[error("{0}")]
    Usage(String),

    /// The query could not be planned.
    #[error("planning failed: {0}")]
    Planning(#[from] qe_planner::PlannerError),

    /// Reading the query from stdin failed.
    #[error("failed to read query from stdin: {0}")]
    Io(#[from] std::io::Error),

    /// A config file was given but couldn't be read or parsed.
    #[error("{0}")]
    Config(String),
}
